//! Gemini `generateContent` provider

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::conversation::{Message, Role};

use super::{ChatProvider, ProviderError};

pub struct GeminiProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

impl<'a> From<&'a Message> for Content<'a> {
    fn from(msg: &'a Message) -> Self {
        Self {
            role: match msg.role {
                Role::User => "user",
                Role::Model => "model",
            },
            parts: [Part { text: &msg.text }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate, if there is one.
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

/// Pull the reply text out of a raw payload. Anything that does not match
/// the expected shape yields `None`.
fn extract_text(payload: &Value) -> Option<String> {
    GenerateContentResponse::deserialize(payload)
        .ok()?
        .into_text()
}

impl GeminiProvider {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        let api_key = config
            .gemini_api_key
            .clone()
            .ok_or_else(|| ProviderError::NotConfigured("GEMINI_API_KEY".into()))?;

        Ok(Self::new(
            config.gemini_api_url.clone(),
            config.gemini_model.clone(),
            api_key,
        ))
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    async fn generate(&self, messages: &[Message]) -> Result<Option<String>, ProviderError> {
        let request = GenerateContentRequest {
            contents: messages.iter().map(Content::from).collect(),
        };

        // The request URL carries the API key, so errors are stripped of it.
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| e.without_url())?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let payload: Value = response.json().await.map_err(|e| e.without_url())?;
        let text = extract_text(&payload);
        if text.is_none() {
            tracing::warn!(%payload, "Empty or malformed response from Gemini API");
        }

        Ok(text)
    }
}

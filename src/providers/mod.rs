//! Generative language provider integrations

mod gemini;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::conversation::Message;

pub use gemini::GeminiProvider;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// A text generation backend that continues a conversation.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send the whole conversation and return the first generated text.
    ///
    /// `Ok(None)` means the upstream answered successfully but the payload
    /// carried no usable text.
    async fn generate(&self, messages: &[Message]) -> Result<Option<String>, ProviderError>;
}

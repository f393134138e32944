//! Relay between game clients and the generative language API
//!
//! For every chat turn the relay:
//! 1. Validates the prompt and checks the upstream is configured
//! 2. Records the user's message in their conversation log
//! 3. Sends the whole log to the upstream provider
//! 4. Records and returns the model's reply, or a fallback line when the
//!    upstream answered with nothing usable

use std::sync::Arc;

use serde::Serialize;

use crate::conversation::{ConversationStore, Message};
use crate::providers::{ChatProvider, ProviderError};

/// Reply used when the upstream succeeds but returns no text.
pub const FALLBACK_REPLY: &str = "I'm not quite sure what to say.";

/// Result of a chat turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Errors from the relay
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Prompt is required")]
    InvalidRequest,

    #[error("Gemini API key is not configured")]
    Configuration,

    #[error("Upstream error: {0}")]
    Upstream(#[from] ProviderError),
}

pub struct RelayService {
    provider: Option<Arc<dyn ChatProvider>>,
    conversations: Arc<ConversationStore>,
}

impl RelayService {
    /// Create a relay. A `None` provider means the credential is missing and
    /// every chat turn fails with [`RelayError::Configuration`].
    pub fn new(
        provider: Option<Arc<dyn ChatProvider>>,
        conversations: Arc<ConversationStore>,
    ) -> Self {
        Self {
            provider,
            conversations,
        }
    }

    /// Run one chat turn for `user`.
    ///
    /// The prompt is appended to the user's log before the upstream call and
    /// stays there even if the call fails.
    pub async fn handle_chat(
        &self,
        prompt: Option<&str>,
        user: &str,
    ) -> Result<ChatResponse, RelayError> {
        let prompt = match prompt {
            Some(p) if !p.is_empty() => p,
            _ => return Err(RelayError::InvalidRequest),
        };

        let Some(provider) = &self.provider else {
            tracing::error!("Gemini API key is not configured");
            return Err(RelayError::Configuration);
        };

        let context = self.conversations.append(user, Message::user(prompt));

        let reply = match provider.generate(&context).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, "Error calling Gemini API");
                return Err(e.into());
            }
        };

        let Some(text) = reply else {
            return Ok(ChatResponse {
                response: FALLBACK_REPLY.to_string(),
            });
        };

        let log = self.conversations.append(user, Message::model(text.clone()));
        tracing::debug!(
            history = log.len(),
            users = self.conversations.user_count(),
            "Recorded model reply"
        );

        Ok(ChatResponse { response: text })
    }

    /// Snapshot of a user's conversation log
    pub fn history(&self, user: &str) -> Vec<Message> {
        self.conversations.history(user)
    }
}

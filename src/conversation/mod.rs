//! Conversation types and per-user history

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// In-memory conversation logs keyed by user id.
///
/// Logs are created on first contact and live until the process exits.
/// There is no eviction and no size cap. The lock is taken per operation,
/// so two in-flight requests for the same user interleave their appends in
/// whatever order they reach the store.
#[derive(Debug, Default)]
pub struct ConversationStore {
    logs: Mutex<HashMap<String, Vec<Message>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the user's log and return a snapshot of the
    /// whole log, including the new message.
    pub fn append(&self, user: &str, message: Message) -> Vec<Message> {
        let mut logs = self.lock();
        let log = logs.entry(user.to_string()).or_default();
        log.push(message);
        log.clone()
    }

    /// Snapshot of a user's log. Unknown users get an empty log.
    pub fn history(&self, user: &str) -> Vec<Message> {
        self.lock().get(user).cloned().unwrap_or_default()
    }

    pub fn user_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Message>>> {
        // Every critical section is a single push or clone; poison is harmless.
        self.logs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

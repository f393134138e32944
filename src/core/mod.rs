//! Core relay components
//!
//! This module contains the request path between a game client and the
//! generative language API.

mod relay;

pub use relay::{ChatResponse, RelayError, RelayService, FALLBACK_REPLY};

#[cfg(test)]
pub(crate) use relay::tests::{ScriptedProvider, Step};

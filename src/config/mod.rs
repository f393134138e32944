//! Application configuration

use std::env;

use serde::{Deserialize, Serialize};

pub const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Checked on every chat request rather than at startup
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::from_lookup(|name| env::var(name).ok()))
    }

    /// Build the config from any variable source
    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            gemini_api_key: var("GEMINI_API_KEY").filter(|k| !k.is_empty()),
            gemini_model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into()),
            gemini_api_url: var("GEMINI_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_GEMINI_API_URL.into()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.into(),
            gemini_api_url: DEFAULT_GEMINI_API_URL.into(),
        }
    }
}

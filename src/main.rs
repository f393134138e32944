//! Roblox AI Proxy
//!
//! Relays chat prompts from Roblox game clients to the Gemini API and keeps a
//! running conversation per player for the lifetime of the process.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod conversation;
mod core;
mod providers;
mod routes;

use crate::config::Config;
use crate::conversation::ConversationStore;
use crate::core::RelayService;
use crate::providers::{ChatProvider, GeminiProvider};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<RelayService>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roblox_ai_proxy=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let provider: Option<Arc<dyn ChatProvider>> = match GeminiProvider::from_config(&config) {
        Ok(provider) => {
            tracing::info!("Using Gemini model {}", config.gemini_model);
            Some(Arc::new(provider))
        }
        Err(e) => {
            tracing::warn!("{}; chat requests will fail until it is set", e);
            None
        }
    };

    let relay = Arc::new(RelayService::new(
        provider,
        Arc::new(ConversationStore::new()),
    ));

    let state = AppState { relay };

    let app = Router::new()
        .merge(routes::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Your app is listening on port {}", listener.local_addr()?.port());

    axum::serve(listener, app).await?;

    Ok(())
}

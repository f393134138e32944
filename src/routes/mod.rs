//! API routes

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::core::{ChatResponse, RelayError};
use crate::AppState;

pub const LIVENESS_TEXT: &str = "Roblox AI Proxy is running!";

/// Fields of a chat body, read one by one so a bad field never hides a
/// good one.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ChatRequest {
    pub prompt: Option<String>,
    pub user: String,
}

impl From<&Value> for ChatRequest {
    fn from(body: &Value) -> Self {
        let prompt = body
            .get("prompt")
            .and_then(Value::as_str)
            .map(str::to_string);

        // Game clients often send numeric player ids.
        let user = match body.get("user") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(user)) => user.clone(),
            Some(other) => other.to_string(),
        };

        Self { prompt, user }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            RelayError::InvalidRequest => (StatusCode::BAD_REQUEST, "Prompt is required"),
            RelayError::Configuration => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server configuration error.",
            ),
            RelayError::Upstream(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to get a response from the AI.",
            ),
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}

async fn liveness() -> &'static str {
    LIVENESS_TEXT
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ChatResponse>, RelayError> {
    // A body that is not JSON carries no prompt.
    let request = match payload {
        Ok(Json(body)) => ChatRequest::from(&body),
        Err(rejection) => {
            tracing::debug!(%rejection, "Unreadable chat body");
            ChatRequest::default()
        }
    };

    let user = request.user;
    let span = tracing::info_span!("chat", request_id = %Uuid::new_v4(), user = %user);

    let response = state
        .relay
        .handle_chat(request.prompt.as_deref(), &user)
        .instrument(span)
        .await?;

    Ok(Json(response))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(liveness))
        .route("/chat", post(chat))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::conversation::{ConversationStore, Message};
    use crate::core::{RelayService, ScriptedProvider, Step, FALLBACK_REPLY};
    use crate::providers::ChatProvider;

    fn app(provider: Option<Arc<ScriptedProvider>>) -> (Router, Arc<RelayService>) {
        let relay = Arc::new(RelayService::new(
            provider.map(|p| p as Arc<dyn ChatProvider>),
            Arc::new(ConversationStore::new()),
        ));
        let state = AppState {
            relay: relay.clone(),
        };
        (router().with_state(state), relay)
    }

    fn post_chat(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_liveness() {
        let (app, _) = app(None);
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], LIVENESS_TEXT.as_bytes());
    }

    #[tokio::test]
    async fn test_chat_success() {
        let provider = ScriptedProvider::new([Step::Reply("hello!")]);
        let (app, relay) = app(Some(provider));

        let (status, body) = send(app, post_chat(json!({"prompt": "hi", "user": "alice"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"response": "hello!"}));
        assert_eq!(
            relay.history("alice"),
            vec![Message::user("hi"), Message::model("hello!")]
        );
    }

    #[tokio::test]
    async fn test_chat_empty_candidates() {
        let provider = ScriptedProvider::new([Step::Empty]);
        let (app, relay) = app(Some(provider));

        let (status, body) = send(app, post_chat(json!({"prompt": "hi", "user": "alice"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"response": FALLBACK_REPLY}));
        assert_eq!(relay.history("alice"), vec![Message::user("hi")]);
    }

    #[tokio::test]
    async fn test_chat_missing_prompt() {
        let provider = ScriptedProvider::new([]);
        let (app, relay) = app(Some(provider.clone()));

        let (status, body) = send(app.clone(), post_chat(json!({"user": "alice"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Prompt is required"}));

        let (status, _) = send(app, post_chat(json!({"prompt": "", "user": "alice"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(relay.history("alice").is_empty());
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn test_chat_request_fields() {
        assert_eq!(
            ChatRequest::from(&json!({"prompt": "hi", "user": 12345})),
            ChatRequest {
                prompt: Some("hi".into()),
                user: "12345".into(),
            }
        );
        assert_eq!(
            ChatRequest::from(&json!({"prompt": "hi", "user": null})).user,
            ""
        );
        assert_eq!(ChatRequest::from(&json!({"prompt": 7})).prompt, None);
        assert_eq!(ChatRequest::from(&json!(["hi"])), ChatRequest::default());
    }

    #[tokio::test]
    async fn test_chat_numeric_user() {
        let provider = ScriptedProvider::new([Step::Reply("hello!")]);
        let (app, relay) = app(Some(provider.clone()));

        let (status, body) = send(app, post_chat(json!({"prompt": "hi", "user": 12345}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"response": "hello!"}));
        assert_eq!(provider.calls(), 1);
        assert_eq!(
            relay.history("12345"),
            vec![Message::user("hi"), Message::model("hello!")]
        );
    }

    #[tokio::test]
    async fn test_chat_missing_user_shares_log() {
        let provider = ScriptedProvider::new([Step::Reply("one"), Step::Reply("two")]);
        let (app, relay) = app(Some(provider.clone()));

        send(app.clone(), post_chat(json!({"prompt": "first"}))).await;
        send(app, post_chat(json!({"prompt": "second", "user": null}))).await;

        assert_eq!(relay.history("").len(), 4);
        let contexts = provider.contexts.lock().unwrap();
        assert_eq!(contexts[1].len(), 3);
    }

    #[tokio::test]
    async fn test_chat_unreadable_body() {
        let (app, _) = app(Some(ScriptedProvider::new([])));
        let request = Request::builder()
            .method("POST")
            .uri("/chat")
            .body(Body::from("prompt=hi"))
            .unwrap();

        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Prompt is required"}));
    }

    #[tokio::test]
    async fn test_chat_without_credential() {
        let (app, relay) = app(None);

        let (status, body) = send(app, post_chat(json!({"prompt": "hi", "user": "alice"}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Server configuration error."}));
        assert!(relay.history("alice").is_empty());
    }

    #[tokio::test]
    async fn test_chat_upstream_failure() {
        let provider = ScriptedProvider::new([Step::Fail]);
        let (app, relay) = app(Some(provider));

        let (status, body) = send(app, post_chat(json!({"prompt": "hi", "user": "alice"}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Failed to get a response from the AI."}));
        assert!(!body.to_string().contains("backend exploded"));
        assert_eq!(relay.history("alice"), vec![Message::user("hi")]);
    }
}

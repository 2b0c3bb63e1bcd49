use crate::history::ConversationStore;
use crate::llm::chat::{ with_system_prompt, ChatClient };
use crate::models::api::{ ChatResponse, ClearResponse };
use crate::models::chat::ChatMessage;
use super::error::ApiError;
use std::sync::Arc;
use axum::{
    body::Bytes,
    routing::{ get, post },
    Router,
    Json,
    extract::{ Request, State, Query },
    middleware::{ self, Next },
    response::{ Html, IntoResponse, Response },
    http::{ header::CONTENT_TYPE, Method, StatusCode },
};
use serde_json::Value;
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, error };

const INDEX_HTML: &str = include_str!("../../static/index.html");

pub const EMPTY_MESSAGE_ERROR: &str = "Missing or empty \"message\" in request body";

/// Handles injected at startup. `store` is `None` when no storage backend
/// was configured; every route then answers 503.
#[derive(Clone)]
pub struct AppState {
    store: Option<Arc<ConversationStore>>,
    chat_client: Arc<dyn ChatClient>,
    system_prompt: Arc<str>,
    default_user_id: Arc<str>,
}

impl AppState {
    pub fn new(
        store: Option<Arc<ConversationStore>>,
        chat_client: Arc<dyn ChatClient>,
        system_prompt: &str,
        default_user_id: &str,
    ) -> Self {
        Self {
            store,
            chat_client,
            system_prompt: Arc::from(system_prompt),
            default_user_id: Arc::from(default_user_id),
        }
    }

    fn store(&self) -> Result<&ConversationStore, ApiError> {
        self.store.as_deref().ok_or(ApiError::StorageUnavailable)
    }

    // Absent, non-string and blank ids all fall back to the default key.
    fn resolve_user(&self, user_id: Option<&str>) -> String {
        match user_id {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => self.default_user_id.to_string(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/", get(index_handler).fallback(unmatched_handler))
        .route("/index.html", get(index_handler).fallback(unmatched_handler))
        .route("/api/chat", post(chat_handler).fallback(unmatched_handler))
        .route("/api/history", get(history_handler).fallback(unmatched_handler))
        .route("/api/clear", post(clear_handler).fallback(unmatched_handler))
        .fallback(unmatched_handler)
        .layer(middleware::from_fn_with_state(state.clone(), require_store))
        .layer(cors)
        .with_state(state)
}

async fn require_store(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.store.is_none() {
        return ApiError::StorageUnavailable.into_response();
    }
    next.run(request).await
}

async fn unmatched_handler(method: Method) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Empty bodies read as `{}`; anything else must be valid JSON.
fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))
}

async fn chat_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ChatResponse>, ApiError> {
    let payload = parse_body(&body)?;
    let message = payload
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::BadRequest(EMPTY_MESSAGE_ERROR.into()))?;
    let user_id = state.resolve_user(payload.get("userId").and_then(Value::as_str));
    let store = state.store()?;

    store.append(&user_id, ChatMessage::user(message)).await?;
    let history = store.read(&user_id).await?;
    info!("Chat request for '{}' ({} message(s) in conversation)", user_id, history.len());

    let request = with_system_prompt(&state.system_prompt, history);
    let reply = state.chat_client
        .complete(&request).await
        .map_err(|e| {
            error!("Chat completion failed for '{}' (model {}): {}", user_id, state.chat_client.get_model(), e);
            ApiError::Internal(e.to_string())
        })?;

    store.append(&user_id, ChatMessage::assistant(reply.response.clone())).await?;
    Ok(Json(ChatResponse { response: reply.response }))
}

/// Repeated `userId` parameters resolve to the first occurrence.
fn first_user_id(params: &[(String, String)]) -> Option<&str> {
    params
        .iter()
        .find(|(name, _)| name == "userId")
        .map(|(_, value)| value.as_str())
}

async fn history_handler(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let user_id = state.resolve_user(first_user_id(&params));
    let messages = state.store()?.read(&user_id).await?;
    Ok(Json(messages))
}

async fn clear_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ClearResponse>, ApiError> {
    let payload = parse_body(&body)?;
    let user_id = state.resolve_user(payload.get("userId").and_then(Value::as_str));
    state.store()?.clear(&user_id).await?;
    info!("Cleared conversation for '{}'", user_id);
    Ok(Json(ClearResponse { success: true }))
}

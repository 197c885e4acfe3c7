//! Single-Turn Chat REST API Route
//!
//! POST /api/chat is the stateless chatbot endpoint. Unlike the meal
//! planner it keeps no thread state and returns ad-hoc error bodies of the
//! form `{"error": <message>}`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use mealgraph_core::Error;
use mealgraph_core::chat::ChatService;
use mealgraph_core::llm::Message;

/// Role of one wire-level chat message
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireMessage {
    pub role: WireRole,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Option<Vec<WireMessage>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// POST /api/chat - produce one assistant reply
pub async fn chat(
    State(service): State<Arc<ChatService>>,
    Json(req): Json<ChatRequest>,
) -> Response {
    let messages: Vec<Message> = req
        .messages
        .unwrap_or_default()
        .into_iter()
        .map(|message| match message.role {
            WireRole::User => Message::user(message.content),
            WireRole::Assistant => Message::assistant(message.content),
        })
        .collect();

    match service.respond(messages).await {
        Ok(response) => Json(ChatResponse { response }).into_response(),
        Err(Error::ConfigError(message)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": message }))).into_response()
        }
        Err(Error::InvalidInput(message)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("Invalid request format: {}", message) })),
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "Chat request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to process chat request" })),
            )
                .into_response()
        }
    }
}

/// Build the chat router
pub fn create_router(service: Arc<ChatService>) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .with_state(service)
}

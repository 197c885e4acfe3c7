//! Meal Planner REST API Route
//!
//! POST /api/meal-planner drives one conversation turn through the agent
//! graph. The turn runs on its own task so that a client disconnect stops
//! it cooperatively (committed messages stay in the thread) instead of
//! tearing it down mid-append.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use mealgraph_core::service::MealPlannerService;

use crate::error::{ApiError, ApiResult};

/// Request body for both new conversations and follow-ups
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlannerRequest {
    /// Present on follow-up requests only
    pub thread_id: Option<String>,
    pub message: Option<String>,
}

/// POST /api/meal-planner - run one conversation turn
pub async fn run_turn(
    State(service): State<Arc<MealPlannerService>>,
    Json(req): Json<MealPlannerRequest>,
) -> ApiResult<impl IntoResponse> {
    let thread_id = req
        .thread_id
        .as_deref()
        .map(Uuid::parse_str)
        .transpose()
        .map_err(|_| {
            ApiError::validation("Invalid request format: threadId must be a UUID".to_string())
        })?;

    let message = req.message.unwrap_or_default();

    info!(
        thread_id = ?thread_id,
        message_chars = message.len(),
        "Meal planner request"
    );

    // The drop guard fires the token when this handler future is dropped,
    // which is how a client disconnect reaches the turn.
    let token = CancellationToken::new();
    let guard = token.clone().drop_guard();

    let turn = tokio::spawn(async move { service.run_turn(thread_id, &message, &token).await });

    let result = turn
        .await
        .map_err(|err| ApiError::server(format!("Turn task failed: {}", err)))?;
    guard.disarm();

    let outcome = result?;
    Ok(Json(outcome))
}

/// Build the meal planner router
pub fn create_router(service: Arc<MealPlannerService>) -> Router {
    Router::new()
        .route("/api/meal-planner", post(run_turn))
        .with_state(service)
}

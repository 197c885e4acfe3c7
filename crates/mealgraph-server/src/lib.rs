//! Mealgraph HTTP Server
//!
//! Axum REST API in front of the meal-planning agent graph:
//!
//! - `POST /api/meal-planner` - run one conversation turn through the graph
//! - `POST /api/chat` - stateless single-turn chat
//! - `GET /health` - liveness probe

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult, ErrorCode};
pub use state::AppState;

use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Build the full application router from shared state
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::health::create_router())
        .merge(routes::meal_planner::create_router(state.meal_planner))
        .merge(routes::chat::create_router(state.chat))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

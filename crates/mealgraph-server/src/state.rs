//! Shared application state for Axum routers

use std::sync::Arc;

use mealgraph_core::chat::ChatService;
use mealgraph_core::service::MealPlannerService;

/// Application-wide state shared across all routes
#[derive(Clone)]
pub struct AppState {
    pub meal_planner: Arc<MealPlannerService>,
    pub chat: Arc<ChatService>,
}

impl AppState {
    pub fn new(meal_planner: Arc<MealPlannerService>, chat: Arc<ChatService>) -> Self {
        Self { meal_planner, chat }
    }
}

//! Mealgraph API Server Entry Point
//!
//! Loads configuration, wires the agent graph to a real LLM backend when
//! an API key is available (scripted mock otherwise), and starts the Axum
//! HTTP server.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mealgraph_core::chat::ChatService;
use mealgraph_core::config::Config;
use mealgraph_core::llm::{DecisionClient, DecisionPort, LlmClient, MockDecisionPort};
use mealgraph_core::service::MealPlannerService;
use mealgraph_core::store::InMemoryConversationStore;
use mealgraph_server::{AppState, build_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load().context("Failed to load configuration")?;

    let (decision_port, chat): (Arc<dyn DecisionPort>, ChatService) =
        match config.llm.resolved_api_key()? {
            Some(api_key) => {
                let llm = LlmClient::new(config.llm.clone(), api_key)?;
                let chat = ChatService::new(Some(Arc::new(llm.clone())));
                (Arc::new(DecisionClient::new(llm)), chat)
            }
            None => {
                warn!("No API key configured; agents run against the scripted mock backend");
                (Arc::new(MockDecisionPort::new()), ChatService::new(None))
            }
        };

    let store = Arc::new(InMemoryConversationStore::new());
    let meal_planner = Arc::new(MealPlannerService::new(store, decision_port));
    let app = build_router(AppState::new(meal_planner, Arc::new(chat)));

    let addr = config.server.resolved_bind_addr();
    info!(%addr, "Starting meal planner API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tokio::select! {
        result = axum::serve(listener, app) => {
            result.context("Server error")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    Ok(())
}

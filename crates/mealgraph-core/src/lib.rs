//! Mealgraph Core Library
//!
//! This crate provides the core functionality for Mealgraph, including:
//! - Agent system (recipe suggester, dietary advisor, grocery list builder, food inventory)
//! - Conversation graph (entry keyword routing, resume-to-last-agent routing)
//! - Turn executor (hop ceiling, topic tracking, cooperative cancellation)
//! - Thread registry (in-memory conversation store, turn supersession)
//! - LLM integration (OpenRouter API, structured routing decisions)
//! - Single-turn chat service

pub mod agents;
pub mod chat;
pub mod config;
pub mod error;
pub mod executor;
pub mod graph;
pub mod llm;
pub mod message;
pub mod service;
pub mod store;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::agents::AgentKind;
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::message::{AgentUpdate, ConversationMessage, ConversationRole};
    pub use crate::service::{MealPlannerService, TurnOutcome};
    pub use crate::store::{ConversationStore, InMemoryConversationStore};
}

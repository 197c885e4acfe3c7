//! LLM integration - decision port and OpenRouter-compatible client
//!
//! This module provides:
//! - The `DecisionPort` seam agent nodes route through
//! - The `CompletionPort` seam for plain single-shot completions
//! - An HTTP client for an OpenAI-compatible chat completions API
//! - A scripted mock port for tests and offline runs

mod client;
mod mock;
mod types;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::agents::AgentKind;
use crate::error::Result;

pub use client::{DecisionClient, LlmClient, LlmClientBuilder};
pub use mock::MockDecisionPort;
pub use types::{
    ChatRequest, ChatResponse, Choice, FinishReason, JsonSchemaFormat, LlmResponse, Message,
    MessageRole, ResponseFormat, Usage,
};

/// Where a routing decision sends control next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAgent {
    /// Hand off to another specialist
    Agent(AgentKind),
    /// Return control to the user, staying resident on the current agent
    Finish,
}

/// Structured output of one agent invocation
///
/// Lives only for one step of the executor loop; immediately translated
/// into a conversation message plus a graph transition.
#[derive(Debug, Clone)]
pub struct RoutingDecision {
    /// The agent's reply to the user
    pub response_text: String,
    /// Transition chosen by the model
    pub next_agent: NextAgent,
    /// Optional topic label for the current subject
    pub topic: Option<String>,
}

/// Produces one reply plus a routing decision for the active agent
///
/// Implementations must honor `cancel` by aborting the in-flight call
/// promptly and returning `Error::Cancelled`.
#[async_trait]
pub trait DecisionPort: Send + Sync {
    async fn decide(
        &self,
        agent: AgentKind,
        prompt: Vec<Message>,
        cancel: &CancellationToken,
    ) -> Result<RoutingDecision>;
}

/// Produces one plain completion for a message list
#[async_trait]
pub trait CompletionPort: Send + Sync {
    async fn complete_text(&self, messages: Vec<Message>) -> Result<String>;
}

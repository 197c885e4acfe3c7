//! Conversation messages and the per-turn update shape returned to clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agents::AgentKind;

/// Author label used for synthetic messages (loop fallback, degraded errors)
pub const SYSTEM_AUTHOR: &str = "System";

/// Who produced a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationRole {
    /// Human input
    User,
    /// A specialist agent's reply
    Agent,
    /// Synthetic message produced by the executor itself
    System,
}

/// One entry in a thread's append-only history
///
/// Messages are never mutated after creation; threads only grow by appending.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub role: ConversationRole,
    pub content: String,
    /// Set when `role == Agent`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_agent: Option<AgentKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ConversationMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ConversationRole::User,
            content: content.into(),
            author_agent: None,
            topic: None,
            timestamp: Utc::now(),
        }
    }

    /// Create an agent message
    pub fn agent(author: AgentKind, content: impl Into<String>, topic: Option<String>) -> Self {
        Self {
            role: ConversationRole::Agent,
            content: content.into(),
            author_agent: Some(author),
            topic,
            timestamp: Utc::now(),
        }
    }

    /// Create a synthetic system message
    pub fn system(content: impl Into<String>, topic: Option<String>) -> Self {
        Self {
            role: ConversationRole::System,
            content: content.into(),
            author_agent: None,
            topic,
            timestamp: Utc::now(),
        }
    }

    /// Wire-level update for this message, if it is client-visible
    ///
    /// User messages produce no update; they came from the client.
    pub fn to_update(&self) -> Option<AgentUpdate> {
        let agent = match self.role {
            ConversationRole::User => return None,
            ConversationRole::Agent => self
                .author_agent
                .map(|a| a.wire_name().to_string())
                .unwrap_or_else(|| SYSTEM_AUTHOR.to_string()),
            ConversationRole::System => SYSTEM_AUTHOR.to_string(),
        };

        Some(AgentUpdate {
            agent,
            content: self.content.clone(),
            topic: self.topic.clone(),
        })
    }
}

/// One client-visible update produced during a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentUpdate {
    /// Wire name of the authoring agent, or `System` for synthetic messages
    pub agent: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

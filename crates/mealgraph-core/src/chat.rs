//! Single-turn chat service - plain request/response with no thread state

use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::llm::{CompletionPort, Message, MessageRole};

/// Stateless chat over the completion port
///
/// Built without a port when no API key is configured; calls then fail
/// with a configuration error instead of reaching for the network.
pub struct ChatService {
    port: Option<Arc<dyn CompletionPort>>,
}

impl ChatService {
    pub fn new(port: Option<Arc<dyn CompletionPort>>) -> Self {
        Self { port }
    }

    /// Whether a completion backend is wired up
    pub fn is_configured(&self) -> bool {
        self.port.is_some()
    }

    /// Produce one assistant reply for the given conversation
    pub async fn respond(&self, messages: Vec<Message>) -> Result<String> {
        let port = self
            .port
            .as_ref()
            .ok_or_else(|| Error::ConfigError("LLM API key is not configured".to_string()))?;

        if messages.is_empty() {
            return Err(Error::InvalidInput(
                "messages must not be empty".to_string(),
            ));
        }
        if !messages
            .iter()
            .any(|message| message.role == MessageRole::User)
        {
            return Err(Error::InvalidInput(
                "at least one user message is required".to_string(),
            ));
        }

        debug!(messages = messages.len(), "Running single-turn chat");
        port.complete_text(messages).await
    }
}

//! Agent node - one specialist step in the conversation graph

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::agents::{AgentKind, prompts};
use crate::error::Result;
use crate::graph::NextNode;
use crate::llm::{DecisionPort, NextAgent};
use crate::message::ConversationMessage;

/// Output of one agent node step: the message produced plus where control
/// goes next
#[derive(Debug, Clone)]
pub struct AgentStep {
    pub message: ConversationMessage,
    pub next: NextNode,
}

/// One specialist agent wired to the decision port
///
/// Wraps the port with the agent's role prompt and fixed legal handoff
/// targets, and normalizes "finish" into a transition to the human node.
pub struct AgentNode {
    kind: AgentKind,
    port: Arc<dyn DecisionPort>,
}

impl AgentNode {
    /// Create a node for one agent kind
    pub fn new(kind: AgentKind, port: Arc<dyn DecisionPort>) -> Self {
        Self { kind, port }
    }

    /// The agent this node speaks as
    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    /// Run one step: consult the decision port and produce a message plus
    /// the next transition
    ///
    /// Port failures surface to the caller; the executor decides recovery.
    pub async fn invoke(
        &self,
        history: &[ConversationMessage],
        current_topic: &str,
        cancel: &CancellationToken,
    ) -> Result<AgentStep> {
        let prompt = prompts::build_prompt(self.kind, history, current_topic);

        debug!(
            agent = %self.kind,
            prompt_messages = prompt.len(),
            "Invoking decision port"
        );

        let decision = self.port.decide(self.kind, prompt, cancel).await?;

        let next = match decision.next_agent {
            NextAgent::Agent(target) => NextNode::Agent(target),
            NextAgent::Finish => NextNode::Human,
        };

        // A blank topic counts as missing, same as no topic at all.
        let topic = decision
            .topic
            .filter(|topic| !topic.trim().is_empty())
            .unwrap_or_else(|| self.kind.fallback_topic().to_string());

        info!(
            agent = %self.kind,
            next = ?next,
            topic = %topic,
            "Agent step complete"
        );

        Ok(AgentStep {
            message: ConversationMessage::agent(self.kind, decision.response_text, Some(topic)),
            next,
        })
    }
}

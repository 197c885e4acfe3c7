//! Scripted decision port for tests and offline runs
//!
//! The server falls back to this port when no API key is configured, so the
//! demo endpoints stay usable without network access.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::agents::AgentKind;
use crate::error::{Error, Result};

use super::types::{Message, MessageRole};
use super::{CompletionPort, DecisionPort, NextAgent, RoutingDecision};

/// What the mock does once its script runs dry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmptyBehavior {
    /// Canned specialty reply, finish (return control to the user)
    Finish,
    /// Always hand off to the agent's first legal target
    HandOff,
    /// Fail with an upstream error
    Fail,
}

/// Deterministic decision port driven by an optional script
///
/// Scripted decisions are returned in order; when the script is empty the
/// port falls back to its configured behavior. Every invocation is recorded
/// so tests can assert which agents actually ran.
pub struct MockDecisionPort {
    script: Mutex<VecDeque<RoutingDecision>>,
    when_empty: EmptyBehavior,
    delay: Option<Duration>,
    calls: Mutex<Vec<AgentKind>>,
}

impl MockDecisionPort {
    /// Port that answers in-specialty and finishes every turn
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            when_empty: EmptyBehavior::Finish,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Port that never returns control to the user
    pub fn always_handing_off() -> Self {
        Self {
            when_empty: EmptyBehavior::HandOff,
            ..Self::new()
        }
    }

    /// Port whose every unscripted call fails upstream
    pub fn failing() -> Self {
        Self {
            when_empty: EmptyBehavior::Fail,
            ..Self::new()
        }
    }

    /// Queue a decision to be returned before the fallback behavior kicks in
    pub fn push_decision(&self, decision: RoutingDecision) {
        self.script
            .lock()
            .expect("mock script lock poisoned")
            .push_back(decision);
    }

    /// Delay every call, checkpointing cancellation while waiting
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Agents that have invoked this port, in call order
    pub fn invoked_agents(&self) -> Vec<AgentKind> {
        self.calls.lock().expect("mock calls lock poisoned").clone()
    }

    fn canned_reply(agent: AgentKind) -> &'static str {
        match agent {
            AgentKind::RecipeSuggester => {
                "Recipe Suggester here. For a healthy dinner, try baked salmon with roasted vegetables and quinoa."
            }
            AgentKind::DietaryAdvisor => {
                "Dietary Advisor here. Aim for balanced plates with lean protein, whole grains, and plenty of vegetables."
            }
            AgentKind::GroceryListBuilder => {
                "Grocery List Builder here. Your list: salmon fillets, quinoa, mixed vegetables, olive oil."
            }
            AgentKind::FoodInventory => {
                "Food Inventory here. Pantry staples look stocked; check the fridge for fresh produce."
            }
        }
    }
}

impl Default for MockDecisionPort {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DecisionPort for MockDecisionPort {
    async fn decide(
        &self,
        agent: AgentKind,
        _prompt: Vec<Message>,
        cancel: &CancellationToken,
    ) -> Result<RoutingDecision> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        if let Some(delay) = self.delay {
            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.calls
            .lock()
            .expect("mock calls lock poisoned")
            .push(agent);

        let scripted = self
            .script
            .lock()
            .expect("mock script lock poisoned")
            .pop_front();
        if let Some(decision) = scripted {
            return Ok(decision);
        }

        match self.when_empty {
            EmptyBehavior::Finish => Ok(RoutingDecision {
                response_text: Self::canned_reply(agent).to_string(),
                next_agent: NextAgent::Finish,
                topic: Some(agent.fallback_topic().to_string()),
            }),
            EmptyBehavior::HandOff => {
                let target = agent.handoff_targets()[0];
                Ok(RoutingDecision {
                    response_text: format!("Passing this along to the {}.", target.display_name()),
                    next_agent: NextAgent::Agent(target),
                    topic: None,
                })
            }
            EmptyBehavior::Fail => Err(Error::LLMError("mock upstream failure".to_string())),
        }
    }
}

#[async_trait]
impl CompletionPort for MockDecisionPort {
    async fn complete_text(&self, messages: Vec<Message>) -> Result<String> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();

        Ok(format!("You said: {}", last_user))
    }
}

//! Turn executor - drives the agent ring for one user turn
//!
//! Starting from an entry agent, runs one agent step at a time, committing
//! each produced message to the store before the next step sees the
//! history. A hop ceiling stops agents that keep handing off to each other,
//! and a cooperative cancellation token is checked between hops.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agents::{AgentKind, AgentNode};
use crate::error::{Error, Result};
use crate::graph::NextNode;
use crate::llm::DecisionPort;
use crate::message::ConversationMessage;
use crate::store::ConversationStore;

/// Maximum agent-to-agent hops in one turn before the safety valve trips
pub const MAX_HOPS: usize = 10;

/// Canned reply appended when the hop ceiling trips
pub const LOOP_FALLBACK_NOTICE: &str = "I'll provide some general healthy dinner recipes:\n\n\
    1. Mediterranean Baked Salmon with roasted vegetables and quinoa\n\
    2. Grilled Chicken with steamed broccoli and sweet potatoes\n\
    3. Vegetable Stir-Fry with tofu and brown rice\n\
    4. Turkey and Vegetable Chili\n\
    5. Zucchini Noodles with lean protein and tomato sauce\n\n\
    Would you like more specific details about any of these recipes?";

/// Notice appended when a decision step fails and the turn degrades
pub const UPSTREAM_ERROR_NOTICE: &str =
    "Sorry, there was an error processing your request. Please try again.";

/// Runs one user turn through the agent ring
pub struct TurnExecutor {
    store: Arc<dyn ConversationStore>,
    port: Arc<dyn DecisionPort>,
}

impl TurnExecutor {
    pub fn new(store: Arc<dyn ConversationStore>, port: Arc<dyn DecisionPort>) -> Self {
        Self { store, port }
    }

    /// Drive the graph from `entry` until it reaches the human node, the
    /// hop ceiling trips, or the token fires
    ///
    /// Every produced message is committed to the thread before the next
    /// hop starts, so a cancelled turn leaves exactly its completed hops
    /// behind. Decision failures degrade to a synthetic system notice
    /// instead of erroring the turn; cancellation surfaces as
    /// [`Error::Cancelled`].
    pub async fn run(
        &self,
        thread_id: Uuid,
        entry: AgentKind,
        cancel: &CancellationToken,
    ) -> Result<Vec<ConversationMessage>> {
        let mut produced = Vec::new();
        let mut current = entry;

        for hop in 0..MAX_HOPS {
            if cancel.is_cancelled() {
                info!(thread_id = %thread_id, hops = hop, "Turn cancelled between hops");
                return Err(Error::Cancelled);
            }

            let state = self.store.get(thread_id).await?;
            let node = AgentNode::new(current, Arc::clone(&self.port));

            let step = match node.invoke(&state.messages, &state.current_topic, cancel).await {
                Ok(step) => step,
                Err(Error::Cancelled) => {
                    info!(thread_id = %thread_id, hops = hop, "Turn cancelled mid-step");
                    return Err(Error::Cancelled);
                }
                Err(err) => {
                    warn!(
                        thread_id = %thread_id,
                        agent = %current,
                        error = %err,
                        "Decision step failed, degrading to system notice"
                    );
                    let notice = ConversationMessage::system(
                        UPSTREAM_ERROR_NOTICE,
                        Some(state.current_topic.clone()),
                    );
                    self.store.append(thread_id, notice.clone()).await?;
                    produced.push(notice);
                    return Ok(produced);
                }
            };

            self.store.append(thread_id, step.message.clone()).await?;
            produced.push(step.message);

            match step.next {
                NextNode::Human => {
                    debug!(thread_id = %thread_id, hops = hop + 1, "Turn reached human node");
                    return Ok(produced);
                }
                NextNode::Agent(next) => {
                    debug!(thread_id = %thread_id, from = %current, to = %next, "Agent handoff");
                    current = next;
                }
            }
        }

        warn!(
            thread_id = %thread_id,
            max_hops = MAX_HOPS,
            "Hop ceiling tripped, appending fallback reply"
        );
        let fallback = ConversationMessage::system(LOOP_FALLBACK_NOTICE, None);
        self.store.append(thread_id, fallback.clone()).await?;
        produced.push(fallback);
        Ok(produced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockDecisionPort, NextAgent, RoutingDecision};
    use crate::message::{ConversationRole, SYSTEM_AUTHOR};
    use crate::store::InMemoryConversationStore;

    async fn seeded_thread(store: &InMemoryConversationStore, text: &str) -> Uuid {
        let thread_id = store.create().await.unwrap();
        store
            .append(thread_id, ConversationMessage::user(text))
            .await
            .unwrap();
        thread_id
    }

    #[tokio::test]
    async fn test_single_step_turn() {
        let store = Arc::new(InMemoryConversationStore::new());
        let port = Arc::new(MockDecisionPort::new());
        let executor = TurnExecutor::new(store.clone(), port);
        let thread_id = seeded_thread(&store, "dinner ideas?").await;
        let token = CancellationToken::new();

        let produced = executor
            .run(thread_id, AgentKind::RecipeSuggester, &token)
            .await
            .unwrap();

        assert_eq!(produced.len(), 1);
        assert_eq!(produced[0].role, ConversationRole::Agent);
        let state = store.get(thread_id).await.unwrap();
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.active_agent, Some(AgentKind::RecipeSuggester));
    }

    #[tokio::test]
    async fn test_handoff_then_finish() {
        let store = Arc::new(InMemoryConversationStore::new());
        let port = Arc::new(MockDecisionPort::new());
        port.push_decision(RoutingDecision {
            response_text: "Let me pull in the grocery builder.".to_string(),
            next_agent: NextAgent::Agent(AgentKind::GroceryListBuilder),
            topic: Some("weekly shop".to_string()),
        });
        port.push_decision(RoutingDecision {
            response_text: "Here is your list.".to_string(),
            next_agent: NextAgent::Finish,
            topic: Some("grocery list".to_string()),
        });
        let executor = TurnExecutor::new(store.clone(), port.clone());
        let thread_id = seeded_thread(&store, "plan my shopping").await;
        let token = CancellationToken::new();

        let produced = executor
            .run(thread_id, AgentKind::RecipeSuggester, &token)
            .await
            .unwrap();

        assert_eq!(produced.len(), 2);
        assert_eq!(
            port.invoked_agents(),
            vec![AgentKind::RecipeSuggester, AgentKind::GroceryListBuilder]
        );
        let state = store.get(thread_id).await.unwrap();
        assert_eq!(state.current_topic, "grocery list");
        assert_eq!(state.active_agent, Some(AgentKind::GroceryListBuilder));
    }

    #[tokio::test]
    async fn test_hop_ceiling_appends_fallback() {
        let store = Arc::new(InMemoryConversationStore::new());
        let port = Arc::new(MockDecisionPort::always_handing_off());
        let executor = TurnExecutor::new(store.clone(), port);
        let thread_id = seeded_thread(&store, "keep going").await;
        let token = CancellationToken::new();

        let produced = executor
            .run(thread_id, AgentKind::RecipeSuggester, &token)
            .await
            .unwrap();

        assert_eq!(produced.len(), MAX_HOPS + 1);
        let last = produced.last().unwrap();
        assert_eq!(last.role, ConversationRole::System);
        assert_eq!(last.content, LOOP_FALLBACK_NOTICE);
        assert_eq!(last.topic, None);
        assert_eq!(
            produced
                .iter()
                .filter(|message| message.role == ConversationRole::Agent)
                .count(),
            MAX_HOPS
        );
    }

    #[tokio::test]
    async fn test_decision_failure_degrades() {
        let store = Arc::new(InMemoryConversationStore::new());
        let port = Arc::new(MockDecisionPort::failing());
        let executor = TurnExecutor::new(store.clone(), port);
        let thread_id = seeded_thread(&store, "dinner?").await;
        let token = CancellationToken::new();

        let produced = executor
            .run(thread_id, AgentKind::RecipeSuggester, &token)
            .await
            .unwrap();

        assert_eq!(produced.len(), 1);
        assert_eq!(produced[0].role, ConversationRole::System);
        assert_eq!(produced[0].content, UPSTREAM_ERROR_NOTICE);
        assert_eq!(produced[0].topic.as_deref(), Some("meal planning"));
        assert_eq!(produced[0].to_update().unwrap().agent, SYSTEM_AUTHOR);

        // The thread survives for the next turn.
        let state = store.get(thread_id).await.unwrap();
        assert_eq!(state.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_failure_after_handoff_keeps_topic() {
        let store = Arc::new(InMemoryConversationStore::new());
        let port = Arc::new(MockDecisionPort::failing());
        port.push_decision(RoutingDecision {
            response_text: "Checking with the dietary advisor.".to_string(),
            next_agent: NextAgent::Agent(AgentKind::DietaryAdvisor),
            topic: Some("healthy eating".to_string()),
        });
        let executor = TurnExecutor::new(store.clone(), port);
        let thread_id = seeded_thread(&store, "is pasta healthy?").await;
        let token = CancellationToken::new();

        let produced = executor
            .run(thread_id, AgentKind::RecipeSuggester, &token)
            .await
            .unwrap();

        assert_eq!(produced.len(), 2);
        assert_eq!(produced[1].content, UPSTREAM_ERROR_NOTICE);
        assert_eq!(produced[1].topic.as_deref(), Some("healthy eating"));
    }

    #[tokio::test]
    async fn test_pre_cancelled_turn_produces_nothing() {
        let store = Arc::new(InMemoryConversationStore::new());
        let port = Arc::new(MockDecisionPort::new());
        let executor = TurnExecutor::new(store.clone(), port);
        let thread_id = seeded_thread(&store, "dinner?").await;
        let token = CancellationToken::new();
        token.cancel();

        let err = executor
            .run(thread_id, AgentKind::RecipeSuggester, &token)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        let state = store.get(thread_id).await.unwrap();
        assert_eq!(state.messages.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_step_keeps_committed_hops() {
        let store = Arc::new(InMemoryConversationStore::new());
        let port = Arc::new(
            MockDecisionPort::always_handing_off()
                .with_delay(std::time::Duration::from_millis(50)),
        );
        let executor = TurnExecutor::new(store.clone(), port);
        let thread_id = seeded_thread(&store, "keep going").await;
        let token = CancellationToken::new();

        let cancel_after = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(75)).await;
            cancel_after.cancel();
        });

        let err = executor
            .run(thread_id, AgentKind::RecipeSuggester, &token)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        // The first hop committed before the token fired; the second was
        // aborted in flight and left nothing behind.
        let state = store.get(thread_id).await.unwrap();
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[1].role, ConversationRole::Agent);
    }
}

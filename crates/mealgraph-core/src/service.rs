//! Meal planner service - the single entry point for running user turns
//!
//! Ties thread resolution, turn registration, and the executor together.
//! Callers hand in an optional thread id and the raw user message; the
//! service decides between entry classification (new thread) and resume
//! routing (existing thread) and never mixes the two.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::executor::TurnExecutor;
use crate::graph;
use crate::llm::DecisionPort;
use crate::message::{AgentUpdate, ConversationMessage};
use crate::store::{ConversationStore, TurnRegistry, TurnTicket};

/// Result of one completed turn, shaped for the wire
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    pub thread_id: Uuid,
    pub updates: Vec<AgentUpdate>,
}

/// Multi-agent meal planning conversation service
pub struct MealPlannerService {
    store: Arc<dyn ConversationStore>,
    registry: TurnRegistry,
    executor: TurnExecutor,
}

impl MealPlannerService {
    pub fn new(store: Arc<dyn ConversationStore>, port: Arc<dyn DecisionPort>) -> Self {
        let executor = TurnExecutor::new(Arc::clone(&store), port);
        Self {
            store,
            registry: TurnRegistry::new(),
            executor,
        }
    }

    /// Run one user turn, creating a new thread when no id is given
    ///
    /// An unknown thread id is an error, never an implicit new thread.
    /// Starting a turn on a thread with one already in flight supersedes
    /// the old turn. Cancellation (of `cancel` or by supersession)
    /// surfaces as [`Error::Cancelled`]; messages committed before that
    /// point stay in the thread.
    pub async fn run_turn(
        &self,
        thread_id: Option<Uuid>,
        message: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome> {
        let text = message.trim();
        if text.is_empty() {
            return Err(Error::InvalidInput("message must not be empty".to_string()));
        }

        let new_thread = thread_id.is_none();
        let thread_id = match thread_id {
            Some(id) => {
                // Existence check up front so an unknown id fails before
                // any turn bookkeeping happens.
                self.store.get(id).await?;
                id
            }
            None => self.store.create().await?,
        };

        let ticket = self.registry.begin(thread_id, cancel).await;
        let result = self.execute(&ticket, new_thread, text).await;
        self.registry.finish(&ticket);
        result
    }

    async fn execute(
        &self,
        ticket: &TurnTicket,
        new_thread: bool,
        text: &str,
    ) -> Result<TurnOutcome> {
        if ticket.token().is_cancelled() {
            return Err(Error::Cancelled);
        }

        let thread_id = ticket.thread_id();

        // Entry routing reads only the first message; resume routing reads
        // only the thread state. Resolved under the turn lock so a resumed
        // turn sees everything its superseded predecessor committed.
        let entry = if new_thread {
            graph::route_entry(text)
        } else {
            let state = self.store.get(thread_id).await?;
            graph::route_resume(&state)
        };

        info!(
            thread_id = %thread_id,
            entry = %entry,
            new_thread,
            "Starting meal planner turn"
        );

        self.store
            .append(thread_id, ConversationMessage::user(text))
            .await?;

        let produced = self.executor.run(thread_id, entry, ticket.token()).await?;

        let updates: Vec<AgentUpdate> = produced
            .iter()
            .filter_map(ConversationMessage::to_update)
            .collect();

        info!(
            thread_id = %thread_id,
            updates = updates.len(),
            "Meal planner turn complete"
        );

        Ok(TurnOutcome { thread_id, updates })
    }
}

//! Thread registry - conversation state storage and in-flight turn handles
//!
//! Threads live in process memory for the process lifetime. Non-durability
//! is intentional: a restart starts everyone over with fresh threads.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::agents::AgentKind;
use crate::error::{Error, Result};
use crate::message::{ConversationMessage, ConversationRole};

/// Topic label every thread starts with before any agent has spoken
pub const INITIAL_TOPIC: &str = "meal planning";

/// Accumulated state of one conversation thread
///
/// Messages are append-only. `current_topic` and `active_agent` are folded
/// from appended messages, never set directly.
#[derive(Debug, Clone)]
pub struct ConversationState {
    pub messages: Vec<ConversationMessage>,
    pub current_topic: String,
    pub active_agent: Option<AgentKind>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            current_topic: INITIAL_TOPIC.to_string(),
            active_agent: None,
        }
    }

    /// Append a message and fold its routing metadata into the state
    ///
    /// Agent-authored messages become the resume target for the next turn.
    /// A non-empty topic on any message becomes the current topic.
    pub fn apply(&mut self, message: ConversationMessage) {
        if message.role == ConversationRole::Agent {
            if let Some(agent) = message.author_agent {
                self.active_agent = Some(agent);
            }
        }
        if let Some(topic) = &message.topic {
            if !topic.trim().is_empty() {
                self.current_topic = topic.clone();
            }
        }
        self.messages.push(message);
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

/// Storage seam for conversation threads
///
/// The executor and service only see this trait, so a durable backend can
/// be swapped in without touching the turn pipeline.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create a fresh empty thread and return its id
    async fn create(&self) -> Result<Uuid>;

    /// Snapshot a thread's state
    async fn get(&self, thread_id: Uuid) -> Result<ConversationState>;

    /// Append one message to a thread
    async fn append(&self, thread_id: Uuid, message: ConversationMessage) -> Result<()>;
}

/// Process-local store backed by a map behind an async lock
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    threads: tokio::sync::RwLock<HashMap<Uuid, ConversationState>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn create(&self) -> Result<Uuid> {
        let thread_id = Uuid::new_v4();
        let mut threads = self.threads.write().await;
        threads.insert(thread_id, ConversationState::new());
        debug!(thread_id = %thread_id, "Created conversation thread");
        Ok(thread_id)
    }

    async fn get(&self, thread_id: Uuid) -> Result<ConversationState> {
        let threads = self.threads.read().await;
        threads
            .get(&thread_id)
            .cloned()
            .ok_or(Error::ThreadNotFound(thread_id))
    }

    async fn append(&self, thread_id: Uuid, message: ConversationMessage) -> Result<()> {
        let mut threads = self.threads.write().await;
        let state = threads
            .get_mut(&thread_id)
            .ok_or(Error::ThreadNotFound(thread_id))?;
        state.apply(message);
        Ok(())
    }
}

/// Ticket for one running turn on one thread
///
/// Holds the thread's turn lock for as long as it is alive, so two turns
/// on the same thread can never interleave their appends.
pub struct TurnTicket {
    thread_id: Uuid,
    token: CancellationToken,
    generation: u64,
    _permit: tokio::sync::OwnedMutexGuard<()>,
}

impl TurnTicket {
    /// Token cancelled when this turn is superseded or its caller goes away
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn thread_id(&self) -> Uuid {
        self.thread_id
    }
}

impl std::fmt::Debug for TurnTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnTicket")
            .field("thread_id", &self.thread_id)
            .field("generation", &self.generation)
            .finish()
    }
}

struct ActiveTurn {
    token: CancellationToken,
    generation: u64,
}

struct ThreadSlot {
    turn_lock: Arc<tokio::sync::Mutex<()>>,
    active: Option<ActiveTurn>,
    next_generation: u64,
}

impl ThreadSlot {
    fn new() -> Self {
        Self {
            turn_lock: Arc::new(tokio::sync::Mutex::new(())),
            active: None,
            next_generation: 0,
        }
    }
}

/// Tracks the in-flight turn per thread and enforces cancel-and-replace
///
/// `begin` cancels whatever turn currently owns the thread, then waits for
/// it to actually release the thread before handing the ticket out. A
/// superseded turn therefore finishes (cooperatively) before its
/// replacement touches the history.
#[derive(Default)]
pub struct TurnRegistry {
    slots: Mutex<HashMap<Uuid, ThreadSlot>>,
}

impl TurnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new turn on a thread, superseding any in-flight one
    ///
    /// The returned ticket's token is a child of `parent`, so cancelling
    /// `parent` (caller gone) or being superseded both stop the turn.
    pub async fn begin(&self, thread_id: Uuid, parent: &CancellationToken) -> TurnTicket {
        let (turn_lock, token, generation) = {
            let mut slots = self.slots.lock().unwrap();
            let slot = slots.entry(thread_id).or_insert_with(ThreadSlot::new);
            if let Some(active) = &slot.active {
                debug!(
                    thread_id = %thread_id,
                    superseded_generation = active.generation,
                    "Superseding in-flight turn"
                );
                active.token.cancel();
            }
            let token = parent.child_token();
            let generation = slot.next_generation;
            slot.next_generation += 1;
            slot.active = Some(ActiveTurn {
                token: token.clone(),
                generation,
            });
            (Arc::clone(&slot.turn_lock), token, generation)
        };

        let permit = turn_lock.lock_owned().await;

        TurnTicket {
            thread_id,
            token,
            generation,
            _permit: permit,
        }
    }

    /// Clear the in-flight handle if it still belongs to this ticket
    ///
    /// A superseded turn calling this is a no-op, so it never clobbers the
    /// handle of the turn that replaced it.
    pub fn finish(&self, ticket: &TurnTicket) {
        let mut slots = self.slots.lock().unwrap();
        if let Some(slot) = slots.get_mut(&ticket.thread_id) {
            let owned = slot
                .active
                .as_ref()
                .map(|active| active.generation == ticket.generation)
                .unwrap_or(false);
            if owned {
                slot.active = None;
            }
        }
    }
}

impl std::fmt::Debug for TurnRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_defaults() {
        let state = ConversationState::new();
        assert!(state.messages.is_empty());
        assert_eq!(state.current_topic, INITIAL_TOPIC);
        assert_eq!(state.active_agent, None);
    }

    #[test]
    fn test_apply_folds_agent_and_topic() {
        let mut state = ConversationState::new();
        state.apply(ConversationMessage::user("dinner ideas"));
        assert_eq!(state.active_agent, None);
        assert_eq!(state.current_topic, INITIAL_TOPIC);

        state.apply(ConversationMessage::agent(
            AgentKind::DietaryAdvisor,
            "Try more fiber.",
            Some("dietary advice".to_string()),
        ));
        assert_eq!(state.active_agent, Some(AgentKind::DietaryAdvisor));
        assert_eq!(state.current_topic, "dietary advice");
        assert_eq!(state.messages.len(), 2);
    }

    #[test]
    fn test_apply_system_message_keeps_active_agent() {
        let mut state = ConversationState::new();
        state.apply(ConversationMessage::agent(
            AgentKind::FoodInventory,
            "Pantry looks empty.",
            Some("food inventory".to_string()),
        ));
        state.apply(ConversationMessage::system("Something went wrong.", None));
        assert_eq!(state.active_agent, Some(AgentKind::FoodInventory));
        assert_eq!(state.current_topic, "food inventory");
    }

    #[test]
    fn test_apply_ignores_blank_topic() {
        let mut state = ConversationState::new();
        state.apply(ConversationMessage::agent(
            AgentKind::RecipeSuggester,
            "Salmon tonight.",
            Some("   ".to_string()),
        ));
        assert_eq!(state.current_topic, INITIAL_TOPIC);
    }

    #[tokio::test]
    async fn test_store_create_and_get() {
        let store = InMemoryConversationStore::new();
        let thread_id = store.create().await.unwrap();
        let state = store.get(thread_id).await.unwrap();
        assert!(state.messages.is_empty());
        assert_eq!(state.current_topic, INITIAL_TOPIC);
    }

    #[tokio::test]
    async fn test_store_unknown_thread() {
        let store = InMemoryConversationStore::new();
        let missing = Uuid::new_v4();
        let err = store.get(missing).await.unwrap_err();
        assert!(matches!(err, Error::ThreadNotFound(id) if id == missing));

        let err = store
            .append(missing, ConversationMessage::user("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ThreadNotFound(_)));
    }

    #[tokio::test]
    async fn test_store_append_is_ordered() {
        let store = InMemoryConversationStore::new();
        let thread_id = store.create().await.unwrap();
        store
            .append(thread_id, ConversationMessage::user("first"))
            .await
            .unwrap();
        store
            .append(
                thread_id,
                ConversationMessage::agent(
                    AgentKind::RecipeSuggester,
                    "second",
                    Some("recipe suggestions".to_string()),
                ),
            )
            .await
            .unwrap();
        let state = store.get(thread_id).await.unwrap();
        assert_eq!(state.messages[0].content, "first");
        assert_eq!(state.messages[1].content, "second");
        assert_eq!(state.active_agent, Some(AgentKind::RecipeSuggester));
    }

    #[tokio::test]
    async fn test_registry_supersession_cancels_previous() {
        let registry = TurnRegistry::new();
        let thread_id = Uuid::new_v4();
        let parent = CancellationToken::new();

        let first = registry.begin(thread_id, &parent).await;
        assert!(!first.token().is_cancelled());

        let first_token = first.token().clone();
        // The second begin blocks on the turn lock until the first ticket
        // drops, but it cancels the first turn immediately.
        let begin_second = tokio::spawn({
            let parent = parent.clone();
            async move {
                let registry = registry;
                let second = registry.begin(thread_id, &parent).await;
                registry.finish(&second);
                second.token().is_cancelled()
            }
        });

        tokio::task::yield_now().await;
        assert!(first_token.is_cancelled());

        drop(first);
        let second_cancelled = begin_second.await.unwrap();
        assert!(!second_cancelled);
    }

    #[tokio::test]
    async fn test_registry_finish_ignores_stale_ticket() {
        let registry = TurnRegistry::new();
        let thread_id = Uuid::new_v4();
        let parent = CancellationToken::new();

        let first = registry.begin(thread_id, &parent).await;
        let first_token = first.token().clone();
        drop(first);

        let second = registry.begin(thread_id, &parent).await;
        assert!(first_token.is_cancelled());
        assert!(!second.token().is_cancelled());
        registry.finish(&second);
    }

    #[tokio::test]
    async fn test_registry_parent_cancellation_propagates() {
        let registry = TurnRegistry::new();
        let thread_id = Uuid::new_v4();
        let parent = CancellationToken::new();

        let ticket = registry.begin(thread_id, &parent).await;
        parent.cancel();
        assert!(ticket.token().is_cancelled());
    }
}

//! Conversation graph wiring - entry classification and resume routing
//!
//! Two distinct ways into the agent ring that are never mixed: a brand-new
//! thread is classified by keywords in its first message, while an existing
//! thread always resumes at the agent that spoke last, no matter what the
//! follow-up message says.

use tracing::debug;

use crate::agents::AgentKind;
use crate::store::ConversationState;

/// Where control flows after one agent step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextNode {
    /// Hand off to another specialist
    Agent(AgentKind),
    /// Return control to the user
    Human,
}

/// Pick the entry agent for a brand-new thread from its first message
///
/// Coarse keyword pre-filter only. Agents are tried in declaration order
/// and the first keyword hit wins; no hit falls through to the default
/// recipe suggester.
pub fn route_entry(first_message: &str) -> AgentKind {
    let haystack = first_message.to_lowercase();

    for agent in AgentKind::ALL {
        for keyword in agent.entry_keywords() {
            if haystack.contains(keyword) {
                debug!(agent = %agent, keyword, "Entry routing matched keyword");
                return agent;
            }
        }
    }

    debug!(agent = %AgentKind::DEFAULT, "Entry routing fell through to default");
    AgentKind::DEFAULT
}

/// Pick the agent to resume an existing thread
///
/// Always the agent that authored the most recent agent message, so a
/// specialist keeps its conversation even when the follow-up mentions
/// another agent's territory. Threads with no agent reply yet resume at
/// the default.
pub fn route_resume(state: &ConversationState) -> AgentKind {
    let agent = state.active_agent.unwrap_or(AgentKind::DEFAULT);
    debug!(agent = %agent, "Resume routing to last active agent");
    agent
}

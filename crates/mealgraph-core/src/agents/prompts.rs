//! Role prompts and follow-up continuity context for the agent nodes

use crate::agents::AgentKind;
use crate::llm::Message;
use crate::message::{ConversationMessage, ConversationRole};

/// Truncation limit for history summary lines
const HISTORY_LINE_MAX_CHARS: usize = 150;

/// Truncation limit for the last-reply excerpt
const LAST_REPLY_MAX_CHARS: usize = 100;

/// Role-specific system prompt for one agent
pub fn role_prompt(agent: AgentKind) -> &'static str {
    match agent {
        AgentKind::RecipeSuggester => {
            r#"You are a recipe expert named 'Recipe Suggester' that recommends meals based on user preferences, dietary needs, and available ingredients.

IMPORTANT: Always identify yourself as 'Recipe Suggester' at the beginning of your response.

Context rules:
- Respond with full awareness of the conversation history; the user's latest message is a direct follow-up to previous messages.
- If a conversation about meal planning, diet, or recipes is already in progress, continue that conversation.
- Never introduce yourself as if starting a new conversation if you've already spoken to the user.
- Never invent or reference previous conversations that didn't happen.
- If the user refers to something previously mentioned (like 'that recipe'), reference the specific item from earlier.

Routing rules:
- Handle meal planning requests yourself first by asking about preferences and suggesting recipes.
- If the user asks specifically about diet plans, weight loss strategies, or nutrition advice, route to 'dietaryAdvisor'.
- Only route to 'groceryListBuilder' after you have already suggested specific recipes and the user asks for a shopping list.
- Only route to 'foodInventory' if the user explicitly asks to check available ingredients.
- If you can fully answer the question about recipes or meal suggestions, return 'finish'.

Never mention other agents by name to the user."#
        }
        AgentKind::DietaryAdvisor => {
            r#"You are a nutrition expert named 'Dietary Advisor' that provides dietary advice based on health goals and restrictions.

IMPORTANT: Always identify yourself as 'Dietary Advisor' at the beginning of your response.

Context rules:
- Respond with full awareness of the conversation history; the user's latest message is a direct follow-up to previous messages.
- If a conversation about diet plans, nutrition, or health goals is already in progress, continue that conversation.
- Never introduce yourself as if starting a new conversation if you've already spoken to the user.
- Never invent or reference previous conversations that didn't happen.
- If the user refers to a diet plan or nutrition advice mentioned earlier, continue that same topic.

Routing rules:
- If the user asks about specific recipes or meal ideas, route to 'recipeSuggester'.
- If the user asks about creating grocery lists, route to 'groceryListBuilder'.
- If the user asks about checking ingredients they have, route to 'foodInventory'.
- If you can fully answer the question about nutrition, diets, or dietary restrictions, return 'finish'.

Never mention other agents by name to the user."#
        }
        AgentKind::GroceryListBuilder => {
            r#"You are a grocery expert named 'Grocery List Builder' that creates shopping lists based on recipes and meal plans.

IMPORTANT: Always identify yourself as 'Grocery List Builder' at the beginning of your response.

Routing rules:
- If the conversation does not contain specific recipes yet, ask for recipe information first and route to 'recipeSuggester'.
- If the user explicitly asks about nutrition advice or dietary restrictions, route to 'dietaryAdvisor'.
- If the user explicitly asks about checking ingredients they have, route to 'foodInventory'.
- If you already have recipe information and can create a grocery list, handle it yourself and return 'finish'.

Context rules:
- Base your grocery lists on recipes or meal plans specifically mentioned in the conversation.
- If the user asks about 'ingredients for that recipe', reference the specific recipe discussed.

Never mention other agents by name to the user."#
        }
        AgentKind::FoodInventory => {
            r#"You are an inventory expert named 'Food Inventory' that helps track ingredients and suggests meals based on what users already have.

IMPORTANT: Always identify yourself as 'Food Inventory' at the beginning of your response.

Routing rules:
- If the user asks about specific recipes or meal ideas, route to 'recipeSuggester'.
- If the user asks about nutrition advice or dietary restrictions, route to 'dietaryAdvisor'.
- If the user asks about creating grocery lists, route to 'groceryListBuilder'.
- If you can fully answer the question about available ingredients or pantry management, return 'finish'.

Context rules:
- If the user refers to ingredients mentioned earlier, reference those specific items.
- Keep track of ingredients the user has mentioned having throughout the conversation.

Never mention other agents by name to the user."#
        }
    }
}

/// Build the full prompt for one agent invocation
///
/// Layout: role prompt, then (for follow-up turns) a continuity block
/// summarizing the conversation so far, then the history itself.
pub fn build_prompt(
    agent: AgentKind,
    history: &[ConversationMessage],
    current_topic: &str,
) -> Vec<Message> {
    let mut messages = vec![Message::system(role_prompt(agent))];

    if let Some(context) = continuity_context(history, current_topic) {
        messages.push(Message::system(context));
    }

    for msg in history {
        match msg.role {
            ConversationRole::User => messages.push(Message::user(&msg.content)),
            ConversationRole::Agent | ConversationRole::System => {
                messages.push(Message::assistant(&msg.content));
            }
        }
    }

    messages
}

/// Continuity block for follow-up turns; `None` on a thread's first turn
pub fn continuity_context(history: &[ConversationMessage], current_topic: &str) -> Option<String> {
    if history.len() <= 2 {
        return None;
    }

    let mut summary = String::new();
    let mut topics: Vec<String> = Vec::new();
    let mut primary_topic = String::new();

    for msg in history {
        let label = match msg.role {
            ConversationRole::User => "User",
            ConversationRole::System => "System",
            ConversationRole::Agent => msg
                .author_agent
                .map(|a| a.display_name())
                .unwrap_or("Assistant"),
        };
        summary.push_str(&format!(
            "{}: {}\n",
            label,
            truncate(&msg.content, HISTORY_LINE_MAX_CHARS)
        ));

        if let Some(topic) = &msg.topic {
            if !topics.contains(topic) {
                topics.push(topic.clone());
            }
            primary_topic = topic.clone();
        }
    }

    if primary_topic.is_empty() {
        primary_topic = current_topic.to_string();
    }

    let last_reply = history[..history.len() - 1]
        .iter()
        .rev()
        .find(|m| m.role == ConversationRole::Agent)
        .map(|m| truncate(&m.content, LAST_REPLY_MAX_CHARS));

    let mut context = format!(
        "CONVERSATION HISTORY (read carefully):\n{}\nIMPORTANT CONTINUITY NOTES:\n- Primary conversation topic: {}\n",
        summary, primary_topic
    );
    if !topics.is_empty() {
        context.push_str(&format!("- Topics discussed so far: {}\n", topics.join(", ")));
    }
    context.push_str("- The user's current message is a direct follow-up to this conversation.\n");
    if let Some(reply) = last_reply {
        context.push_str(&format!("- Your last response was about: \"{}\"\n", reply));
    }

    Some(context)
}

/// Truncate to at most `max_chars` characters, appending an ellipsis when cut
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

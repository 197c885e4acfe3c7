//! Agent system - the meal-planning specialists and their static graph structure

pub mod node;
pub mod prompts;

use serde::{Deserialize, Serialize};

pub use node::AgentNode;

/// The closed set of specialist agents
///
/// Wire names (`recipeSuggester` etc.) are what clients and the LLM see;
/// the enum keeps routing decisions type-checked internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    #[serde(rename = "recipeSuggester")]
    RecipeSuggester,
    #[serde(rename = "dietaryAdvisor")]
    DietaryAdvisor,
    #[serde(rename = "groceryListBuilder")]
    GroceryListBuilder,
    #[serde(rename = "foodInventory")]
    FoodInventory,
}

impl AgentKind {
    /// All agents, in entry-routing precedence order (default last)
    pub const ALL: [AgentKind; 4] = [
        AgentKind::DietaryAdvisor,
        AgentKind::GroceryListBuilder,
        AgentKind::FoodInventory,
        AgentKind::RecipeSuggester,
    ];

    /// The agent a brand-new thread falls back to when no keyword matches
    pub const DEFAULT: AgentKind = AgentKind::RecipeSuggester;

    /// Name used in API payloads and LLM routing decisions
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::RecipeSuggester => "recipeSuggester",
            Self::DietaryAdvisor => "dietaryAdvisor",
            Self::GroceryListBuilder => "groceryListBuilder",
            Self::FoodInventory => "foodInventory",
        }
    }

    /// Human-readable name the agent identifies itself by in replies
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::RecipeSuggester => "Recipe Suggester",
            Self::DietaryAdvisor => "Dietary Advisor",
            Self::GroceryListBuilder => "Grocery List Builder",
            Self::FoodInventory => "Food Inventory",
        }
    }

    /// Agents this agent may legally hand off to
    ///
    /// Every agent can reach the other three; no agent hands off to itself.
    /// "Finish" is handled separately as a transition to the human node.
    pub fn handoff_targets(&self) -> &'static [AgentKind] {
        match self {
            Self::RecipeSuggester => &[
                AgentKind::DietaryAdvisor,
                AgentKind::GroceryListBuilder,
                AgentKind::FoodInventory,
            ],
            Self::DietaryAdvisor => &[
                AgentKind::RecipeSuggester,
                AgentKind::GroceryListBuilder,
                AgentKind::FoodInventory,
            ],
            Self::GroceryListBuilder => &[
                AgentKind::RecipeSuggester,
                AgentKind::DietaryAdvisor,
                AgentKind::FoodInventory,
            ],
            Self::FoodInventory => &[
                AgentKind::RecipeSuggester,
                AgentKind::DietaryAdvisor,
                AgentKind::GroceryListBuilder,
            ],
        }
    }

    /// Keywords the entry router matches against a thread's first message
    pub fn entry_keywords(&self) -> &'static [&'static str] {
        match self {
            Self::RecipeSuggester => &[],
            Self::DietaryAdvisor => &[
                "dietary",
                "diet",
                "nutrition",
                "nutritional",
                "dietary advisor",
                "weight loss",
                "calories",
                "healthy eating",
            ],
            Self::GroceryListBuilder => &[
                "grocery",
                "groceries",
                "shopping",
                "list",
                "buy",
                "shopping list",
                "purchase",
                "store",
            ],
            Self::FoodInventory => &[
                "inventory",
                "pantry",
                "fridge",
                "freezer",
                "stock",
                "have",
                "available",
                "ingredients",
            ],
        }
    }

    /// Topic label used when a routing decision arrives without one
    pub fn fallback_topic(&self) -> &'static str {
        match self {
            Self::RecipeSuggester => "recipe suggestions",
            Self::DietaryAdvisor => "dietary advice",
            Self::GroceryListBuilder => "grocery list",
            Self::FoodInventory => "food inventory",
        }
    }

    /// Parse a wire name back into an agent kind
    pub fn from_wire_name(name: &str) -> Option<AgentKind> {
        match name {
            "recipeSuggester" => Some(Self::RecipeSuggester),
            "dietaryAdvisor" => Some(Self::DietaryAdvisor),
            "groceryListBuilder" => Some(Self::GroceryListBuilder),
            "foodInventory" => Some(Self::FoodInventory),
            _ => None,
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_kind_display() {
        assert_eq!(AgentKind::RecipeSuggester.to_string(), "recipeSuggester");
        assert_eq!(AgentKind::DietaryAdvisor.to_string(), "dietaryAdvisor");
        assert_eq!(
            AgentKind::GroceryListBuilder.to_string(),
            "groceryListBuilder"
        );
        assert_eq!(AgentKind::FoodInventory.to_string(), "foodInventory");
    }

    #[test]
    fn test_wire_name_round_trip() {
        for kind in AgentKind::ALL {
            assert_eq!(AgentKind::from_wire_name(kind.wire_name()), Some(kind));
        }
        assert_eq!(AgentKind::from_wire_name("somethingElse"), None);
    }

    #[test]
    fn test_no_agent_targets_itself() {
        for kind in AgentKind::ALL {
            assert!(!kind.handoff_targets().contains(&kind));
        }
    }

    #[test]
    fn test_every_agent_reaches_other_three() {
        for kind in AgentKind::ALL {
            assert_eq!(kind.handoff_targets().len(), 3);
        }
    }

    #[test]
    fn test_default_agent_has_no_keywords() {
        assert!(AgentKind::DEFAULT.entry_keywords().is_empty());
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&AgentKind::GroceryListBuilder).unwrap();
        assert_eq!(json, "\"groceryListBuilder\"");

        let parsed: AgentKind = serde_json::from_str("\"foodInventory\"").unwrap();
        assert_eq!(parsed, AgentKind::FoodInventory);
    }
}

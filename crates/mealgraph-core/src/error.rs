//! Error types for Mealgraph

use thiserror::Error;

/// Result type alias using Mealgraph's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Mealgraph error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Thread errors (E001-E099)
    #[error("Thread '{0}' not found. Start a new conversation to get a fresh thread id.")]
    ThreadNotFound(uuid::Uuid),

    // Network errors (E100-E199)
    #[error("Network error: {0}. Check your internet connection.")]
    NetworkError(#[from] reqwest::Error),

    #[error("LLM API error: {0}. Check that MEALGRAPH_API_KEY is set and valid.")]
    LLMError(String),

    #[error("Rate limited. Waiting {0} seconds before retry.")]
    RateLimited(u64),

    #[error("Routing decision rejected: {0}")]
    DecisionRejected(String),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Cancellation (E700-E799)
    #[error("Turn cancelled")]
    Cancelled,

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::ThreadNotFound(_) => "E001",
            Self::NetworkError(_) => "E100",
            Self::LLMError(_) => "E101",
            Self::RateLimited(_) => "E102",
            Self::DecisionRejected(_) => "E103",
            Self::ConfigError(_) => "E600",
            Self::Cancelled => "E700",
            Self::InvalidInput(_) => "E800",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::ThreadNotFound(_) => {
                Some("Send the message again without a threadId".to_string())
            }
            Self::NetworkError(_) => Some("Check internet connection".to_string()),
            Self::LLMError(_) => Some("Set MEALGRAPH_API_KEY or OPENROUTER_API_KEY".to_string()),
            Self::ConfigError(_) => Some("Delete config.toml to regenerate defaults".to_string()),
            _ => None,
        }
    }
}

//! Error types for the market companion agent

use thiserror::Error;

/// Result type alias for advisor operations
pub type Result<T> = std::result::Result<T, AdvisorError>;

#[derive(Error, Debug)]
pub enum AdvisorError {

    // =============================
    // Agent Loop Errors
    // =============================

    #[error("Unknown tool requested: {0}")]
    UnknownTool(String),

    #[error("Invalid tool input: {0}")]
    InvalidToolInput(String),

    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Agent did not finish within {0} tool iterations")]
    MaxIterationsExceeded(usize),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Empty query")]
    EmptyQuery,

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AdvisorError {
    /// Whether the failure came from the model or the market-data API.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AdvisorError::ToolError(_)
                | AdvisorError::LlmError(_)
                | AdvisorError::HttpError(_)
                | AdvisorError::UnknownTool(_)
                | AdvisorError::InvalidToolInput(_)
        )
    }
}

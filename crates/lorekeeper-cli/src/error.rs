//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Parser error
    #[error("Parser error: {0}")]
    Parser(#[from] lorekeeper_parser::ParserError),

    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] lorekeeper_store::StoreError),

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(#[from] lorekeeper_llm::LlmError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

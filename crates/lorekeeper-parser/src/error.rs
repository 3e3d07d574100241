//! Error types for the parser

use lorekeeper_domain::UnknownCategory;
use lorekeeper_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the parser
///
/// Service and model failures never show up here; the pipeline degrades
/// around them instead.
#[derive(Error, Debug)]
pub enum ParserError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Category name that does not exist
    #[error(transparent)]
    UnknownCategory(#[from] UnknownCategory),

    /// Persistence error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Reading the source document failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Word tokenizer failure
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),
}

//! Error types for building, rendering and reading SEPA messages

use thiserror::Error;

/// Result type for SEPA operations
pub type Result<T> = std::result::Result<T, Error>;

/// SEPA message errors
#[derive(Error, Debug)]
pub enum Error {
    /// Operation not allowed in the builder's current state
    #[error("Invalid builder state: {0}")]
    InvalidState(String),

    /// Non-positive, over-precise or out-of-range monetary amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Only one side of an IBAN change was supplied
    #[error("Invalid mandate amendment: {0}")]
    InvalidAmendment(String),

    /// Tree is incomplete or the XML writer failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Incoming document could not be deserialized
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

//! Error types for genesis transformation.

use thiserror::Error;

/// Errors raised while reading, editing or writing a genesis document.
#[derive(Debug, Error)]
pub enum GenesisError {
    /// A key the pipeline relies on is absent.
    #[error("missing field `{path}`")]
    MissingField { path: String },

    /// A value exists but has the wrong JSON type.
    #[error("expected {expected} at `{path}`")]
    UnexpectedType { path: String, expected: &'static str },

    /// A token amount or decimal could not be parsed.
    #[error("invalid amount {value:?} at `{path}`: {reason}")]
    InvalidAmount {
        path: String,
        value: String,
        reason: String,
    },

    /// Adding a delta overflowed 256 bits.
    #[error("amount overflow at `{path}`")]
    Overflow { path: String },

    /// Post-transformation ledger check failed.
    #[error("ledger mismatch for {what}: expected {expected}, got {actual}")]
    LedgerMismatch {
        what: &'static str,
        expected: String,
        actual: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for genesis operations.
pub type Result<T> = std::result::Result<T, GenesisError>;

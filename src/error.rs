//! Error types for the ledger
//!
//! Validation failures are not errors: they surface as
//! [`ValidationResult::Invalid`](crate::types::ValidationResult) or a `false`
//! return. These variants cover the paths that genuinely cannot proceed.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Transaction identity is not finalized")]
    UnfinalizedTransaction,

    #[error("Block identity is not finalized")]
    UnfinalizedBlock,

    #[error("Genesis block must not reference a parent")]
    GenesisHasParent,

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

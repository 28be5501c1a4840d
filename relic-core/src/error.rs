use crate::call::Deposit;
use crate::id::{AccountId, TokenId};
use std::io;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with the ledger
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The referenced token does not exist in the ledger
    #[error("token not found: {0}")]
    TokenNotFound(TokenId),

    /// The sender is not the recorded owner of the token
    #[error("account {account} is not the owner of token {token_id}")]
    NotOwner {
        token_id: TokenId,
        account: AccountId,
    },

    /// The receiver already owns the token; a no-op transfer is rejected
    /// rather than emitting a spurious event
    #[error("token {0} is already owned by the receiver")]
    SameOwner(TokenId),

    /// The required security deposit was absent or not the exact amount
    #[error("exactly one minimal deposit unit required, {attached} attached")]
    MissingDeposit { attached: Deposit },

    /// The receiver's asynchronous acknowledgment failed or was malformed.
    /// Absorbed into the fail-safe revert path; surfaced only in logs.
    #[error("receiver notification failed: {0}")]
    NotifyFailed(String),

    /// The token already has an unresolved notify round in flight
    #[error("token {0} has an unresolved transfer awaiting resolution")]
    ResolutionPending(TokenId),

    /// A token with this id is already registered
    #[error("token already exists: {0}")]
    TokenExists(TokenId),

    /// Errors related to missing or invalid ledger bookkeeping data
    #[error("not found: {0}")]
    NotFound(String),

    /// IO errors that occur when reading/writing files
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Database errors that occur with the underlying storage backend
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Generic errors that don't fit in other categories
    #[error("other error: {0}")]
    Other(String),

    /// Anyhow error wrapper for error context
    #[error(transparent)]
    Context(#[from] anyhow::Error),
}

// Additional From conversions for common error types

impl From<bincode::Error> for LedgerError {
    fn from(err: bincode::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => LedgerError::NotFound("row not found".to_string()),
            _ => LedgerError::Database(err.to_string()),
        }
    }
}

impl From<String> for LedgerError {
    fn from(err: String) -> Self {
        LedgerError::Other(err)
    }
}

impl From<&str> for LedgerError {
    fn from(err: &str) -> Self {
        LedgerError::Other(err.to_string())
    }
}

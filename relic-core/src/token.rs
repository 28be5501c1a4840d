use crate::id::{AccountId, TokenId};
use serde::{Deserialize, Serialize};

/// Ownership record for a single token.
///
/// TokenRecord is the ledger's authoritative view of a token: its
/// identifier, the single account that currently owns it, and an opaque
/// reference into the external metadata store. Metadata itself lives
/// outside the ledger and is never touched by transfer logic.
///
/// Records are replaced, not mutated: an ownership change constructs a
/// fresh record via [`TokenRecord::with_owner`], so any previously
/// captured snapshot (for example the previous-owner value held by a
/// pending resolution) stays stable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenRecord {
    /// Unique identifier for this token. Immutable once minted.
    pub token_id: TokenId,

    /// The account that currently owns this token. Exactly one valid
    /// value at any instant.
    pub owner_id: AccountId,

    /// Opaque reference into the external, read-only metadata store.
    pub metadata_ref: Option<String>,
}

impl TokenRecord {
    /// Create a new token record
    pub fn new(token_id: TokenId, owner_id: AccountId, metadata_ref: Option<String>) -> Self {
        Self {
            token_id,
            owner_id,
            metadata_ref,
        }
    }

    /// Get the token ID
    pub fn id(&self) -> &TokenId {
        &self.token_id
    }

    /// Get the current owner
    pub fn owner(&self) -> &AccountId {
        &self.owner_id
    }

    /// Build the successor record with a new owner.
    ///
    /// The token id and metadata reference carry over unchanged; the
    /// original record is left intact for callers that captured it.
    pub fn with_owner(&self, owner_id: AccountId) -> Self {
        Self {
            token_id: self.token_id.clone(),
            owner_id,
            metadata_ref: self.metadata_ref.clone(),
        }
    }
}

use relic_core::error::LedgerError;
use relic_core::id::{AccountId, NotifyId, TokenId};
use relic_core::resolution::PendingResolution;
use relic_core::token::TokenRecord;

use std::collections::BTreeSet;

/// Storage interface backing the ownership index, token records, and the
/// durable record of in-flight notify rounds.
///
/// Implementations perform pure data-structure or database mutation and
/// make no external calls. The cross-representation invariant (a token's
/// owned-set membership always agrees with its record's `owner_id`) is
/// maintained by the transfer engine, which drives both sides of the
/// index within one atomic move.
pub trait LedgerStore: Send + Sync {
    /// Get a token record by id
    ///
    /// # Parameters
    /// * `token_id` - The id of the token to look up
    ///
    /// # Returns
    /// Some(record) if the token exists, None otherwise
    fn get_token(&self, token_id: &TokenId) -> Result<Option<TokenRecord>, LedgerError>;

    /// Store a token record, overwriting any existing record with the
    /// same id
    ///
    /// # Parameters
    /// * `record` - The record to store
    fn put_token(&self, record: &TokenRecord) -> Result<(), LedgerError>;

    /// Get the current owner of a token
    ///
    /// # Parameters
    /// * `token_id` - The id of the token to look up
    ///
    /// # Returns
    /// The owning account, or `TokenNotFound` if the token does not exist
    fn owner_of(&self, token_id: &TokenId) -> Result<AccountId, LedgerError> {
        match self.get_token(token_id)? {
            Some(record) => Ok(record.owner_id),
            None => Err(LedgerError::TokenNotFound(token_id.clone())),
        }
    }

    /// Insert a token into an account's owned-set, creating the set if
    /// the account has no index entry yet. Inserting a token that is
    /// already present is a no-op, never a duplicate.
    ///
    /// # Parameters
    /// * `account` - The account receiving the index entry
    /// * `token_id` - The token to insert
    fn add_to_owner(&self, account: &AccountId, token_id: &TokenId) -> Result<(), LedgerError>;

    /// Remove a token from an account's owned-set.
    ///
    /// If the set becomes empty the account's index entry is deleted
    /// entirely; no empty entries are retained.
    ///
    /// # Parameters
    /// * `account` - The account losing the index entry
    /// * `token_id` - The token to remove
    ///
    /// # Returns
    /// `NotFound` if the account has no recorded set or the token is not
    /// in it
    fn remove_from_owner(&self, account: &AccountId, token_id: &TokenId)
        -> Result<(), LedgerError>;

    /// Snapshot of the tokens an account currently owns (empty if the
    /// account has no index entry)
    fn tokens_of(&self, account: &AccountId) -> Result<BTreeSet<TokenId>, LedgerError>;

    /// Whether the account currently has an index entry at all.
    /// Diagnostic surface for the no-dangling-sets invariant.
    fn has_owner_entry(&self, account: &AccountId) -> Result<bool, LedgerError>;

    /// Store a pending-resolution record, overwriting any existing record
    /// with the same notify id
    fn put_pending(&self, record: &PendingResolution) -> Result<(), LedgerError>;

    /// Get a pending-resolution record by its correlation id
    fn get_pending(&self, notify_id: &NotifyId) -> Result<Option<PendingResolution>, LedgerError>;

    /// Get the unresolved round targeting a token, if any.
    ///
    /// At most one unresolved round per token exists at a time; the
    /// protocol rejects overlapping rounds up front.
    fn pending_for_token(
        &self,
        token_id: &TokenId,
    ) -> Result<Option<PendingResolution>, LedgerError>;

    /// Delete resolved rounds, reclaiming storage
    ///
    /// # Returns
    /// The number of records removed
    fn prune_resolved(&self) -> Result<usize, LedgerError>;
}

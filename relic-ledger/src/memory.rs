use crate::store::LedgerStore;
use relic_core::error::LedgerError;
use relic_core::id::{AccountId, NotifyId, TokenId};
use relic_core::resolution::PendingResolution;
use relic_core::token::TokenRecord;

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

/// In-memory implementation of [`LedgerStore`].
///
/// The default backend: the hosts this core targets supply their own
/// durability around top-level operations, so process memory is the
/// common case. The SQLite backend covers hosts that want the ledger to
/// persist itself.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Token records by id
    tokens: RwLock<HashMap<TokenId, TokenRecord>>,

    /// Owned-sets by account. An account is present iff its set is
    /// non-empty.
    owned: RwLock<HashMap<AccountId, BTreeSet<TokenId>>>,

    /// Pending-resolution records by correlation id
    pending: RwLock<HashMap<NotifyId, PendingResolution>>,
}

fn poisoned() -> LedgerError {
    LedgerError::Other("store lock poisoned".to_string())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryStore {
    fn get_token(&self, token_id: &TokenId) -> Result<Option<TokenRecord>, LedgerError> {
        let tokens = self.tokens.read().map_err(|_| poisoned())?;
        Ok(tokens.get(token_id).cloned())
    }

    fn put_token(&self, record: &TokenRecord) -> Result<(), LedgerError> {
        let mut tokens = self.tokens.write().map_err(|_| poisoned())?;
        tokens.insert(record.token_id.clone(), record.clone());
        Ok(())
    }

    fn add_to_owner(&self, account: &AccountId, token_id: &TokenId) -> Result<(), LedgerError> {
        let mut owned = self.owned.write().map_err(|_| poisoned())?;
        owned
            .entry(account.clone())
            .or_default()
            .insert(token_id.clone());
        Ok(())
    }

    fn remove_from_owner(
        &self,
        account: &AccountId,
        token_id: &TokenId,
    ) -> Result<(), LedgerError> {
        let mut owned = self.owned.write().map_err(|_| poisoned())?;

        let set = owned.get_mut(account).ok_or_else(|| {
            LedgerError::NotFound(format!("account {} has no owned tokens", account))
        })?;

        if !set.remove(token_id) {
            return Err(LedgerError::NotFound(format!(
                "token {} is not owned by {}",
                token_id, account
            )));
        }

        // No empty entries: drop the account from the index entirely
        if set.is_empty() {
            owned.remove(account);
        }

        Ok(())
    }

    fn tokens_of(&self, account: &AccountId) -> Result<BTreeSet<TokenId>, LedgerError> {
        let owned = self.owned.read().map_err(|_| poisoned())?;
        Ok(owned.get(account).cloned().unwrap_or_default())
    }

    fn has_owner_entry(&self, account: &AccountId) -> Result<bool, LedgerError> {
        let owned = self.owned.read().map_err(|_| poisoned())?;
        Ok(owned.contains_key(account))
    }

    fn put_pending(&self, record: &PendingResolution) -> Result<(), LedgerError> {
        let mut pending = self.pending.write().map_err(|_| poisoned())?;
        pending.insert(record.notify_id, record.clone());
        Ok(())
    }

    fn get_pending(&self, notify_id: &NotifyId) -> Result<Option<PendingResolution>, LedgerError> {
        let pending = self.pending.read().map_err(|_| poisoned())?;
        Ok(pending.get(notify_id).cloned())
    }

    fn pending_for_token(
        &self,
        token_id: &TokenId,
    ) -> Result<Option<PendingResolution>, LedgerError> {
        let pending = self.pending.read().map_err(|_| poisoned())?;
        Ok(pending
            .values()
            .find(|r| &r.token_id == token_id && !r.is_resolved())
            .cloned())
    }

    fn prune_resolved(&self) -> Result<usize, LedgerError> {
        let mut pending = self.pending.write().map_err(|_| poisoned())?;
        let before = pending.len();
        pending.retain(|_, r| !r.is_resolved());
        Ok(before - pending.len())
    }
}

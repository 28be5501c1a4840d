use crate::store::LedgerStore;
use relic_core::error::LedgerError;
use relic_core::event::TransferEvent;
use relic_core::id::{AccountId, TokenId};
use relic_core::token::TokenRecord;

use std::sync::Arc;

/// Validates and executes atomic ownership moves.
///
/// The synchronous primitive every higher-level operation bottoms out in.
/// Constructed over an injected store; holds no state of its own.
///
/// Deposit verification is not this component's concern: the
/// caller-facing boundary layer has already checked it by the time a
/// transfer reaches the engine.
#[derive(Debug, Clone)]
pub struct TransferEngine<S: LedgerStore> {
    store: Arc<S>,
}

impl<S: LedgerStore> TransferEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Execute an ownership move from `sender_id` to `receiver_id`.
    ///
    /// Preconditions, checked in order with first failure winning and no
    /// mutation applied on any failure:
    /// 1. the token exists (`TokenNotFound`),
    /// 2. `sender_id` is the recorded owner (`NotOwner`),
    /// 3. `receiver_id` differs from the current owner (`SameOwner`).
    ///
    /// # Returns
    /// The pre-transfer token record, so callers that may need to revert
    /// can reconstruct prior state without a second lookup.
    pub fn transfer(
        &self,
        sender_id: &AccountId,
        receiver_id: &AccountId,
        token_id: &TokenId,
        memo: Option<String>,
    ) -> Result<TokenRecord, LedgerError> {
        let token = self
            .store
            .get_token(token_id)?
            .ok_or_else(|| LedgerError::TokenNotFound(token_id.clone()))?;

        if token.owner() != sender_id {
            return Err(LedgerError::NotOwner {
                token_id: token_id.clone(),
                account: sender_id.clone(),
            });
        }

        if receiver_id == token.owner() {
            return Err(LedgerError::SameOwner(token_id.clone()));
        }

        self.apply_move(token, receiver_id, memo)
    }

    /// Execute an ownership move from the token's current owner to `to`,
    /// bypassing the sender-authorization precondition.
    ///
    /// The caller is the authority here: the notify-and-resolve
    /// resolution path uses this to send a token back to its original
    /// owner. The move still refuses a missing token and a same-owner
    /// destination.
    pub fn transfer_unchecked(
        &self,
        to: &AccountId,
        token_id: &TokenId,
        memo: Option<String>,
    ) -> Result<TokenRecord, LedgerError> {
        let token = self
            .store
            .get_token(token_id)?
            .ok_or_else(|| LedgerError::TokenNotFound(token_id.clone()))?;

        if to == token.owner() {
            return Err(LedgerError::SameOwner(token_id.clone()));
        }

        self.apply_move(token, to, memo)
    }

    /// Install a freshly minted token: record plus index entry, kept in
    /// sync as one unit. Minting policy itself lives outside this core;
    /// this is the integration point.
    pub fn register_token(&self, record: &TokenRecord) -> Result<(), LedgerError> {
        if self.store.get_token(record.id())?.is_some() {
            return Err(LedgerError::TokenExists(record.id().clone()));
        }

        self.store.put_token(record)?;
        self.store.add_to_owner(record.owner(), record.id())?;

        log::debug!("registered token {} to {}", record.id(), record.owner());
        Ok(())
    }

    /// The atomic move: both index sides and the token record change
    /// together, with no suspension point in between. The execution model
    /// serializes top-level operations, so nothing interleaves here.
    fn apply_move(
        &self,
        token: TokenRecord,
        receiver_id: &AccountId,
        memo: Option<String>,
    ) -> Result<TokenRecord, LedgerError> {
        self.store.remove_from_owner(token.owner(), token.id())?;
        self.store.add_to_owner(receiver_id, token.id())?;

        // Fresh record, not in-place mutation: snapshots of the previous
        // record stay stable for the revert path.
        self.store.put_token(&token.with_owner(receiver_id.clone()))?;

        TransferEvent::new(
            token.owner().clone(),
            receiver_id.clone(),
            token.id().clone(),
            memo,
        )
        .emit();

        log::debug!(
            "token {} moved from {} to {}",
            token.id(),
            token.owner(),
            receiver_id
        );

        Ok(token)
    }
}

use crate::protocol::NotifyProtocol;
use crate::receiver::ReceiverRegistry;
use relic_core::call::{CallContext, Deposit};
use relic_core::error::LedgerError;
use relic_core::id::{AccountId, TokenId};
use relic_core::token::TokenRecord;
use relic_ledger::engine::TransferEngine;
use relic_ledger::store::LedgerStore;
use serde::Serialize;
use std::sync::Arc;

/// Read-only access to the external metadata store.
///
/// Keyed by token id, immutable after creation, never consulted or
/// mutated by transfer logic; only the read surface joins it in.
pub trait MetadataSource: Send + Sync {
    fn metadata_of(&self, token_id: &TokenId) -> Option<String>;
}

/// A token as presented to callers: the ownership record joined with the
/// external metadata document
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TokenView {
    pub token_id: TokenId,
    pub owner_id: AccountId,
    pub metadata_ref: Option<String>,
    pub metadata: Option<String>,
}

/// Caller-facing boundary over the engine and the notify protocol.
///
/// The one place the security deposit is verified: mutating entry points
/// demand exactly one minimal unit attached, rejecting absence and
/// excess alike, before any core logic runs.
pub struct LedgerService<S: LedgerStore> {
    protocol: NotifyProtocol<S>,
    metadata: Option<Arc<dyn MetadataSource>>,
}

impl<S: LedgerStore> LedgerService<S> {
    pub fn new(store: Arc<S>, receivers: ReceiverRegistry) -> Self {
        Self {
            protocol: NotifyProtocol::new(store, receivers),
            metadata: None,
        }
    }

    /// Attach the external metadata store for the read surface
    pub fn with_metadata(mut self, source: Arc<dyn MetadataSource>) -> Self {
        self.metadata = Some(source);
        self
    }

    pub fn protocol(&self) -> &NotifyProtocol<S> {
        &self.protocol
    }

    pub fn engine(&self) -> &TransferEngine<S> {
        self.protocol.engine()
    }

    fn require_exact_deposit(ctx: &CallContext) -> Result<(), LedgerError> {
        if ctx.deposit != Deposit::ONE {
            return Err(LedgerError::MissingDeposit {
                attached: ctx.deposit,
            });
        }
        Ok(())
    }

    /// Transfer a token from the caller to `receiver_id`.
    ///
    /// Synchronous and final. Requires exactly one minimal deposit unit
    /// attached; fails with the engine's precondition errors otherwise.
    pub fn transfer(
        &self,
        ctx: &CallContext,
        receiver_id: &AccountId,
        token_id: &TokenId,
        memo: Option<String>,
    ) -> Result<(), LedgerError> {
        Self::require_exact_deposit(ctx)?;
        self.protocol
            .engine()
            .transfer(&ctx.caller, receiver_id, token_id, memo)?;
        Ok(())
    }

    /// Transfer a token from the caller to `receiver_id` and notify the
    /// receiver's collaborator, which may send it back.
    ///
    /// Same deposit requirement as [`transfer`](Self::transfer).
    /// Resolves to `true` iff the transfer ends up standing.
    pub async fn transfer_and_notify(
        &self,
        ctx: &CallContext,
        receiver_id: &AccountId,
        token_id: &TokenId,
        memo: Option<String>,
        payload: &str,
    ) -> Result<bool, LedgerError> {
        Self::require_exact_deposit(ctx)?;
        self.protocol
            .transfer_and_notify(&ctx.caller, receiver_id, token_id, memo, payload)
            .await
    }

    /// Minting integration point; see [`TransferEngine::register_token`]
    pub fn register_token(&self, record: &TokenRecord) -> Result<(), LedgerError> {
        self.protocol.engine().register_token(record)
    }

    pub fn owner_of(&self, token_id: &TokenId) -> Result<AccountId, LedgerError> {
        self.protocol.store().owner_of(token_id)
    }

    /// The token joined with its external metadata, or None if it does
    /// not exist
    pub fn token_view(&self, token_id: &TokenId) -> Result<Option<TokenView>, LedgerError> {
        let record = match self.protocol.store().get_token(token_id)? {
            Some(record) => record,
            None => return Ok(None),
        };

        let metadata = self
            .metadata
            .as_ref()
            .and_then(|source| source.metadata_of(token_id));

        Ok(Some(TokenView {
            token_id: record.token_id,
            owner_id: record.owner_id,
            metadata_ref: record.metadata_ref,
            metadata,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn account(s: &str) -> AccountId {
        AccountId::from(s)
    }

    fn token(s: &str) -> TokenId {
        TokenId::from(s)
    }

    fn service_with_token() -> LedgerService<relic_ledger::memory::MemoryStore> {
        let store = Arc::new(relic_ledger::memory::MemoryStore::new());
        let service = LedgerService::new(store, ReceiverRegistry::new());
        service
            .register_token(&TokenRecord::new(token("t1"), account("alice"), None))
            .unwrap();
        service
    }

    #[test]
    fn test_transfer_with_exact_deposit() {
        let service = service_with_token();
        let ctx = CallContext::with_one_unit(account("alice"));

        service
            .transfer(&ctx, &account("bob"), &token("t1"), Some("hi".to_string()))
            .unwrap();

        assert_eq!(service.owner_of(&token("t1")).unwrap(), account("bob"));
    }

    #[test]
    fn test_transfer_without_deposit_rejected() {
        let service = service_with_token();
        let ctx = CallContext::new(account("alice"), Deposit::NONE);

        let err = service
            .transfer(&ctx, &account("bob"), &token("t1"), None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::MissingDeposit { .. }));

        // No state change
        assert_eq!(service.owner_of(&token("t1")).unwrap(), account("alice"));
    }

    #[test]
    fn test_excess_deposit_rejected() {
        // The deposit is an access-control mechanism, not a price;
        // overpaying is as wrong as not paying
        let service = service_with_token();
        let ctx = CallContext::new(account("alice"), Deposit(2));

        let err = service
            .transfer(&ctx, &account("bob"), &token("t1"), None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::MissingDeposit { .. }));
        assert_eq!(service.owner_of(&token("t1")).unwrap(), account("alice"));
    }

    #[test]
    fn test_transfer_to_self_rejected() {
        let service = service_with_token();
        let ctx = CallContext::with_one_unit(account("alice"));

        let err = service
            .transfer(&ctx, &account("alice"), &token("t1"), None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::SameOwner(_)));
    }

    #[tokio::test]
    async fn test_transfer_and_notify_requires_deposit() {
        let service = service_with_token();
        let ctx = CallContext::new(account("alice"), Deposit::NONE);

        let err = service
            .transfer_and_notify(&ctx, &account("bob"), &token("t1"), None, "")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::MissingDeposit { .. }));
        assert_eq!(service.owner_of(&token("t1")).unwrap(), account("alice"));
    }

    struct MapMetadata(HashMap<TokenId, String>);

    impl MetadataSource for MapMetadata {
        fn metadata_of(&self, token_id: &TokenId) -> Option<String> {
            self.0.get(token_id).cloned()
        }
    }

    #[test]
    fn test_token_view_joins_metadata() {
        let mut docs = HashMap::new();
        docs.insert(token("t1"), "{\"name\":\"first\"}".to_string());

        let service = service_with_token().with_metadata(Arc::new(MapMetadata(docs)));

        let view = service.token_view(&token("t1")).unwrap().unwrap();
        assert_eq!(view.owner_id, account("alice"));
        assert_eq!(view.metadata.as_deref(), Some("{\"name\":\"first\"}"));

        assert!(service.token_view(&token("t2")).unwrap().is_none());
    }
}

use crate::receiver::ReceiverRegistry;
use relic_core::error::LedgerError;
use relic_core::id::{AccountId, NotifyId, TokenId};
use relic_core::resolution::{NotifySignal, PendingResolution, TransferOutcome};
use relic_ledger::engine::TransferEngine;
use relic_ledger::store::LedgerStore;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long a receiver gets to answer before the round settles as failed
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(30);

/// Two-phase transfer workflow layered over the synchronous engine.
///
/// Phase 1 applies the transfer immediately and notifies the receiver's
/// collaborator; phase 2 runs once the notification settles and may send
/// the token back. Optimistic transfer, pessimistic rollback: between
/// the phases the token is genuinely owned by the receiver and visible
/// as such to every reader.
pub struct NotifyProtocol<S: LedgerStore> {
    engine: TransferEngine<S>,
    receivers: ReceiverRegistry,
    notify_timeout: Duration,
    /// Distinguishes repeated rounds between the same parties over the
    /// same token when deriving correlation ids
    sequence: AtomicU64,
}

impl<S: LedgerStore> NotifyProtocol<S> {
    pub fn new(store: Arc<S>, receivers: ReceiverRegistry) -> Self {
        Self {
            engine: TransferEngine::new(store),
            receivers,
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    pub fn engine(&self) -> &TransferEngine<S> {
        &self.engine
    }

    pub fn store(&self) -> &Arc<S> {
        self.engine.store()
    }

    /// Phase 1: transfer now, ask the receiver, settle later.
    ///
    /// The ownership move is applied before the receiver is asked and is
    /// observable throughout the round. The returned future resolves
    /// once phase 2 has run; its value is `true` iff the transfer ends
    /// up standing (the receiver, or whoever it legitimately passed the
    /// token to, owns it), `false` iff it was reverted.
    ///
    /// A token with an unresolved round already in flight is rejected
    /// with `ResolutionPending` before any state change; overlapping
    /// rounds over one token would make the second round's ownership
    /// premise ambiguous.
    pub async fn transfer_and_notify(
        &self,
        sender_id: &AccountId,
        receiver_id: &AccountId,
        token_id: &TokenId,
        memo: Option<String>,
        payload: &str,
    ) -> Result<bool, LedgerError> {
        if let Some(open) = self.store().pending_for_token(token_id)? {
            log::debug!(
                "rejecting notify round for {}: {} still unresolved",
                token_id,
                open.notify_id
            );
            return Err(LedgerError::ResolutionPending(token_id.clone()));
        }

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let notify_id = NotifyId::derive(sender_id, receiver_id, token_id, sequence);
        let mut round = PendingResolution::new(
            notify_id,
            sender_id.clone(),
            receiver_id.clone(),
            token_id.clone(),
            memo.clone(),
            payload.to_string(),
        );

        // The move is final from the index's point of view; only phase 2
        // may undo it.
        let previous = self.engine.transfer(sender_id, receiver_id, token_id, memo)?;
        round.mark_transferred();

        // Persist the in-flight record before suspending, so a settle
        // signal always finds its round.
        round.mark_awaiting_ack();
        self.store().put_pending(&round)?;

        log::debug!(
            "notify round {} dispatched: {} -> {} for {}",
            notify_id,
            sender_id,
            receiver_id,
            token_id
        );

        // The protocol's only suspension point.
        let signal = match self
            .receivers
            .notify(
                receiver_id,
                sender_id,
                previous.owner(),
                token_id,
                payload,
                self.notify_timeout,
            )
            .await
        {
            Ok(true) => NotifySignal::Revert,
            Ok(false) => NotifySignal::Keep,
            Err(e) => {
                // Absorbed into the fail-safe revert path, never
                // surfaced to the original caller as a hard error
                log::warn!("notify round {} failed: {}", notify_id, e);
                NotifySignal::Failed(e.to_string())
            }
        };

        self.resolve_transfer(&notify_id, signal)
    }

    /// Phase 2: settle one round.
    ///
    /// Invoked by `transfer_and_notify` once the notification settles;
    /// hosts that receive retried settle signals may also call it
    /// directly. Resolution applies at most once: a round that is
    /// already resolved returns its recorded outcome unchanged.
    ///
    /// A revert request is honored only if the token is still exactly
    /// where phase 1 left it. If the receiver has since disposed of it
    /// through a legitimate transfer, the reversal is skipped and the
    /// original sender is not compensated; the receiver provably gave
    /// the asset away through its own action.
    pub fn resolve_transfer(
        &self,
        notify_id: &NotifyId,
        signal: NotifySignal,
    ) -> Result<bool, LedgerError> {
        let mut round = self.store().get_pending(notify_id)?.ok_or_else(|| {
            LedgerError::NotFound(format!("no notify round {}", notify_id))
        })?;

        if let Some(stands) = round.transfer_stands() {
            log::debug!("notify round {} already resolved, keeping recorded outcome", notify_id);
            return Ok(stands);
        }

        let outcome = if !signal.should_revert() {
            TransferOutcome::Kept
        } else {
            match self.store().get_token(&round.token_id)? {
                // The token record is gone (disposed of by the host in
                // the window); nothing left to send back.
                None => TransferOutcome::Kept,
                Some(token) if token.owner() != &round.receiver_id => {
                    log::debug!(
                        "notify round {}: token {} no longer with {}, skipping reversal",
                        notify_id,
                        round.token_id,
                        round.receiver_id
                    );
                    TransferOutcome::Kept
                }
                Some(_) => {
                    // The protocol is the authority here, not the caller
                    self.engine.transfer_unchecked(
                        &round.sender_id,
                        &round.token_id,
                        round.memo.clone(),
                    )?;
                    TransferOutcome::Reverted
                }
            }
        };

        round.resolve(outcome);
        self.store().put_pending(&round)?;

        log::info!("notify round {} resolved: {:?}", notify_id, outcome);
        Ok(outcome == TransferOutcome::Kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receiver::TransferReceiver;
    use async_trait::async_trait;
    use relic_core::token::TokenRecord;
    use relic_ledger::memory::MemoryStore;

    fn account(s: &str) -> AccountId {
        AccountId::from(s)
    }

    fn token(s: &str) -> TokenId {
        TokenId::from(s)
    }

    /// Answers with a fixed should-revert value
    struct Answer(bool);

    #[async_trait]
    impl TransferReceiver for Answer {
        async fn on_transfer(
            &self,
            _sender_id: &AccountId,
            _previous_owner_id: &AccountId,
            _token_id: &TokenId,
            _payload: &str,
        ) -> anyhow::Result<bool> {
            Ok(self.0)
        }
    }

    /// Fails every notification
    struct Broken;

    #[async_trait]
    impl TransferReceiver for Broken {
        async fn on_transfer(
            &self,
            _sender_id: &AccountId,
            _previous_owner_id: &AccountId,
            _token_id: &TokenId,
            _payload: &str,
        ) -> anyhow::Result<bool> {
            Err(anyhow::anyhow!("collaborator offline"))
        }
    }

    /// Takes longer than the protocol's timeout, then asks to keep
    struct Slow(Duration);

    #[async_trait]
    impl TransferReceiver for Slow {
        async fn on_transfer(
            &self,
            _sender_id: &AccountId,
            _previous_owner_id: &AccountId,
            _token_id: &TokenId,
            _payload: &str,
        ) -> anyhow::Result<bool> {
            tokio::time::sleep(self.0).await;
            Ok(false)
        }
    }

    /// Passes the token on to a third party during the notify window,
    /// then asks for a revert anyway
    struct Disposer {
        store: Arc<MemoryStore>,
        me: AccountId,
        third_party: AccountId,
    }

    #[async_trait]
    impl TransferReceiver for Disposer {
        async fn on_transfer(
            &self,
            _sender_id: &AccountId,
            _previous_owner_id: &AccountId,
            token_id: &TokenId,
            _payload: &str,
        ) -> anyhow::Result<bool> {
            // A perfectly legitimate transfer: the phase-1 move already
            // made this account the owner
            TransferEngine::new(self.store.clone()).transfer(
                &self.me,
                &self.third_party,
                token_id,
                None,
            )?;
            Ok(true)
        }
    }

    fn protocol_with(
        handler: Option<Arc<dyn TransferReceiver>>,
    ) -> (NotifyProtocol<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let mut receivers = ReceiverRegistry::new();
        if let Some(handler) = handler {
            receivers.register(account("bob"), handler);
        }

        let protocol = NotifyProtocol::new(store.clone(), receivers);
        protocol
            .engine()
            .register_token(&TokenRecord::new(token("t1"), account("alice"), None))
            .unwrap();
        (protocol, store)
    }

    #[tokio::test]
    async fn test_receiver_declines_transfer_reverted() {
        let (protocol, store) = protocol_with(Some(Arc::new(Answer(true))));

        let stands = protocol
            .transfer_and_notify(&account("alice"), &account("bob"), &token("t1"), None, "hi")
            .await
            .unwrap();

        assert!(!stands);
        assert_eq!(store.owner_of(&token("t1")).unwrap(), account("alice"));
        assert!(store.tokens_of(&account("alice")).unwrap().contains(&token("t1")));
        assert!(!store.has_owner_entry(&account("bob")).unwrap());
    }

    #[tokio::test]
    async fn test_receiver_accepts_transfer_stands() {
        let (protocol, store) = protocol_with(Some(Arc::new(Answer(false))));

        let stands = protocol
            .transfer_and_notify(&account("alice"), &account("bob"), &token("t1"), None, "hi")
            .await
            .unwrap();

        assert!(stands);
        assert_eq!(store.owner_of(&token("t1")).unwrap(), account("bob"));
        assert!(!store.has_owner_entry(&account("alice")).unwrap());
    }

    #[tokio::test]
    async fn test_receiver_error_reverts() {
        let (protocol, store) = protocol_with(Some(Arc::new(Broken)));

        let stands = protocol
            .transfer_and_notify(&account("alice"), &account("bob"), &token("t1"), None, "")
            .await
            .unwrap();

        assert!(!stands);
        assert_eq!(store.owner_of(&token("t1")).unwrap(), account("alice"));
    }

    #[tokio::test]
    async fn test_receiver_timeout_reverts() {
        let (protocol, store) = protocol_with(Some(Arc::new(Slow(Duration::from_millis(200)))));
        let protocol = protocol.with_notify_timeout(Duration::from_millis(20));

        let stands = protocol
            .transfer_and_notify(&account("alice"), &account("bob"), &token("t1"), None, "")
            .await
            .unwrap();

        assert!(!stands);
        assert_eq!(store.owner_of(&token("t1")).unwrap(), account("alice"));
    }

    #[tokio::test]
    async fn test_unreachable_receiver_reverts() {
        let (protocol, store) = protocol_with(None);

        let stands = protocol
            .transfer_and_notify(&account("alice"), &account("bob"), &token("t1"), None, "")
            .await
            .unwrap();

        assert!(!stands);
        assert_eq!(store.owner_of(&token("t1")).unwrap(), account("alice"));
    }

    #[tokio::test]
    async fn test_disposed_token_skips_reversal() {
        let store = Arc::new(MemoryStore::new());
        let mut receivers = ReceiverRegistry::new();
        receivers.register(
            account("bob"),
            Arc::new(Disposer {
                store: store.clone(),
                me: account("bob"),
                third_party: account("carol"),
            }),
        );

        let protocol = NotifyProtocol::new(store.clone(), receivers);
        protocol
            .engine()
            .register_token(&TokenRecord::new(token("t1"), account("alice"), None))
            .unwrap();

        let stands = protocol
            .transfer_and_notify(&account("alice"), &account("bob"), &token("t1"), None, "")
            .await
            .unwrap();

        // The revert request was void: the third party keeps the token
        // and the original sender is not compensated
        assert!(stands);
        assert_eq!(store.owner_of(&token("t1")).unwrap(), account("carol"));
        assert!(!store.has_owner_entry(&account("alice")).unwrap());
        assert!(!store.has_owner_entry(&account("bob")).unwrap());
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let (protocol, store) = protocol_with(Some(Arc::new(Answer(true))));

        let stands = protocol
            .transfer_and_notify(&account("alice"), &account("bob"), &token("t1"), None, "")
            .await
            .unwrap();
        assert!(!stands);

        // First round used sequence 0
        let notify_id = NotifyId::derive(&account("alice"), &account("bob"), &token("t1"), 0);

        // A retried settle signal, even one pointing the other way, gets
        // the recorded outcome and applies nothing
        let again = protocol
            .resolve_transfer(&notify_id, NotifySignal::Keep)
            .unwrap();
        assert!(!again);
        assert_eq!(store.owner_of(&token("t1")).unwrap(), account("alice"));

        let and_again = protocol
            .resolve_transfer(&notify_id, NotifySignal::Revert)
            .unwrap();
        assert!(!and_again);
        assert_eq!(store.owner_of(&token("t1")).unwrap(), account("alice"));
    }

    #[tokio::test]
    async fn test_overlapping_round_rejected() {
        let (protocol, store) = protocol_with(Some(Arc::new(Answer(false))));

        // An unresolved round is still in flight for the token
        let open = PendingResolution::new(
            NotifyId::derive(&account("x"), &account("y"), &token("t1"), 99),
            account("x"),
            account("y"),
            token("t1"),
            None,
            String::new(),
        );
        store.put_pending(&open).unwrap();

        let err = protocol
            .transfer_and_notify(&account("alice"), &account("bob"), &token("t1"), None, "")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ResolutionPending(_)));

        // Rejected before any state change
        assert_eq!(store.owner_of(&token("t1")).unwrap(), account("alice"));
    }

    #[tokio::test]
    async fn test_resolving_unknown_round_fails() {
        let (protocol, _store) = protocol_with(None);

        let missing = NotifyId::from_bytes([7; 32]);
        let err = protocol
            .resolve_transfer(&missing, NotifySignal::Keep)
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }
}

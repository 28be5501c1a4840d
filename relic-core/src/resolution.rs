use crate::id::{AccountId, NotifyId, TokenId};
use serde::{Deserialize, Serialize};

/// Final outcome of a notify-and-resolve round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferOutcome {
    /// The transfer stands; the receiver (or whoever it legitimately
    /// passed the token to) keeps it
    Kept,
    /// The transfer was reversed; the token is back with the original owner
    Reverted,
}

/// Lifecycle of one notify-and-resolve round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionPhase {
    /// Round created, transfer not yet applied
    Initiated,
    /// Ownership has moved to the receiver; visible to all readers even
    /// though it may still be reversed
    Transferred,
    /// Receiver notification dispatched; waiting for it to settle
    AwaitingReceiverAck,
    /// Resolution applied exactly once
    Resolved(TransferOutcome),
}

impl Default for ResolutionPhase {
    fn default() -> Self {
        ResolutionPhase::Initiated
    }
}

/// The settled result of the receiver notification, as observed by the
/// continuation that runs resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifySignal {
    /// Receiver answered and asked for the token back
    Revert,
    /// Receiver answered and keeps the token
    Keep,
    /// The call failed, timed out, or the receiver was unreachable.
    /// Treated identically to an explicit revert request.
    Failed(String),
}

impl NotifySignal {
    /// Whether this signal requests the token be sent back
    pub fn should_revert(&self) -> bool {
        !matches!(self, NotifySignal::Keep)
    }
}

/// Durable record of one in-flight transfer-and-notify round.
///
/// Created when the round starts and kept past resolution so a retried
/// settle signal resolves to the recorded outcome instead of applying a
/// second reversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingResolution {
    /// Correlation id for this round
    pub notify_id: NotifyId,

    /// The original owner; the refund target if the round reverts
    pub sender_id: AccountId,

    /// The account the token was provisionally transferred to
    pub receiver_id: AccountId,

    /// The token being moved
    pub token_id: TokenId,

    /// Memo carried on the underlying transfer, replayed on a revert
    pub memo: Option<String>,

    /// Opaque payload forwarded to the receiver's collaborator
    pub payload: String,

    /// When the round was initiated (Unix timestamp, seconds)
    pub initiated_at: i64,

    /// Where the round currently is in its lifecycle
    pub phase: ResolutionPhase,
}

impl PendingResolution {
    /// Create a new round in the `Initiated` phase
    pub fn new(
        notify_id: NotifyId,
        sender_id: AccountId,
        receiver_id: AccountId,
        token_id: TokenId,
        memo: Option<String>,
        payload: String,
    ) -> Self {
        Self {
            notify_id,
            sender_id,
            receiver_id,
            token_id,
            memo,
            payload,
            initiated_at: chrono::Utc::now().timestamp(),
            phase: ResolutionPhase::Initiated,
        }
    }

    /// Mark the provisional transfer as applied
    pub fn mark_transferred(&mut self) {
        self.phase = ResolutionPhase::Transferred;
    }

    /// Mark the receiver notification as dispatched
    pub fn mark_awaiting_ack(&mut self) {
        self.phase = ResolutionPhase::AwaitingReceiverAck;
    }

    /// Record the final outcome
    pub fn resolve(&mut self, outcome: TransferOutcome) {
        self.phase = ResolutionPhase::Resolved(outcome);
    }

    /// Check whether resolution has already been applied
    pub fn is_resolved(&self) -> bool {
        matches!(self.phase, ResolutionPhase::Resolved(_))
    }

    /// The recorded outcome, if resolution has been applied
    pub fn outcome(&self) -> Option<TransferOutcome> {
        match self.phase {
            ResolutionPhase::Resolved(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Whether the transfer ended up standing. None while unresolved.
    pub fn transfer_stands(&self) -> Option<bool> {
        self.outcome().map(|o| o == TransferOutcome::Kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round() -> PendingResolution {
        let sender = AccountId::from("alice");
        let receiver = AccountId::from("bob");
        let token = TokenId::from("t1");
        let id = NotifyId::derive(&sender, &receiver, &token, 0);
        PendingResolution::new(id, sender, receiver, token, None, "hello".to_string())
    }

    #[test]
    fn test_phase_progression() {
        let mut r = round();
        assert_eq!(r.phase, ResolutionPhase::Initiated);
        assert!(!r.is_resolved());
        assert_eq!(r.transfer_stands(), None);

        r.mark_transferred();
        assert_eq!(r.phase, ResolutionPhase::Transferred);

        r.mark_awaiting_ack();
        assert_eq!(r.phase, ResolutionPhase::AwaitingReceiverAck);

        r.resolve(TransferOutcome::Reverted);
        assert!(r.is_resolved());
        assert_eq!(r.outcome(), Some(TransferOutcome::Reverted));
        assert_eq!(r.transfer_stands(), Some(false));
    }

    #[test]
    fn test_notify_signal_revert_defaults() {
        assert!(NotifySignal::Revert.should_revert());
        assert!(NotifySignal::Failed("unreachable".to_string()).should_revert());
        assert!(!NotifySignal::Keep.should_revert());
    }
}

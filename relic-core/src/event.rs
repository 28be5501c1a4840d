use crate::id::{AccountId, TokenId};
use serde::{Deserialize, Serialize};

/// Log target transfer events are emitted on, one JSON object per line.
/// Observational side effect for external consumers; never read back by
/// the core.
pub const EVENT_TARGET: &str = "relic::event";

/// A completed ownership move, as observed by external consumers.
///
/// Emitted for every applied move, including reversals (a reversal is
/// just a move from the receiver back to the original owner).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferEvent {
    /// Owner before the move
    pub old_owner_id: AccountId,

    /// Owner after the move
    pub new_owner_id: AccountId,

    /// The token that moved
    pub token_id: TokenId,

    /// Free-form memo supplied by the caller
    pub memo: Option<String>,

    /// When the move was applied (Unix timestamp, seconds)
    pub timestamp: i64,
}

impl TransferEvent {
    pub fn new(
        old_owner_id: AccountId,
        new_owner_id: AccountId,
        token_id: TokenId,
        memo: Option<String>,
    ) -> Self {
        Self {
            old_owner_id,
            new_owner_id,
            token_id,
            memo,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// Emit this event on the [`EVENT_TARGET`] log target
    pub fn emit(&self) {
        match serde_json::to_string(self) {
            Ok(body) => log::info!(target: EVENT_TARGET, "{}", body),
            Err(e) => log::warn!(
                target: EVENT_TARGET,
                "failed to serialize transfer event for {}: {}",
                self.token_id,
                e
            ),
        }
    }
}

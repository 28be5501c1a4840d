use async_trait::async_trait;
use relic_core::error::LedgerError;
use relic_core::id::{AccountId, TokenId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Contract obligation on the receiving side of a transfer-and-notify.
///
/// The collaborator behind the receiving account is told about the
/// transfer after it has already been applied and answers whether the
/// token should be sent back.
///
/// # Returns
/// `true` if the token should be returned to the sender, `false` if the
/// receiver keeps it. An error (or no answer within the protocol's
/// timeout) is treated exactly like `true`.
#[async_trait]
pub trait TransferReceiver: Send + Sync {
    async fn on_transfer(
        &self,
        sender_id: &AccountId,
        previous_owner_id: &AccountId,
        token_id: &TokenId,
        payload: &str,
    ) -> anyhow::Result<bool>;
}

/// Routes receiver notifications to the collaborator registered for the
/// receiving account.
///
/// Built up at wiring time and then frozen inside the protocol; an
/// account without a registered handler is unreachable, which the
/// protocol maps to the fail-safe revert outcome.
#[derive(Default)]
pub struct ReceiverRegistry {
    handlers: HashMap<AccountId, Arc<dyn TransferReceiver>>,
}

impl ReceiverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the collaborator handling notifications for an account.
    /// Replaces any previous handler for the same account.
    pub fn register(&mut self, account: AccountId, handler: Arc<dyn TransferReceiver>) {
        self.handlers.insert(account, handler);
    }

    pub fn handler_for(&self, account: &AccountId) -> Option<Arc<dyn TransferReceiver>> {
        self.handlers.get(account).cloned()
    }

    /// Dispatch one notification and wait for it to settle.
    ///
    /// # Returns
    /// The receiver's answer, or `NotifyFailed` if the receiver is
    /// unreachable, errors, or does not answer within `timeout`.
    pub async fn notify(
        &self,
        receiver_id: &AccountId,
        sender_id: &AccountId,
        previous_owner_id: &AccountId,
        token_id: &TokenId,
        payload: &str,
        timeout: Duration,
    ) -> Result<bool, LedgerError> {
        let handler = self.handler_for(receiver_id).ok_or_else(|| {
            LedgerError::NotifyFailed(format!("receiver {} has no registered handler", receiver_id))
        })?;

        match tokio::time::timeout(
            timeout,
            handler.on_transfer(sender_id, previous_owner_id, token_id, payload),
        )
        .await
        {
            Ok(Ok(should_revert)) => Ok(should_revert),
            Ok(Err(e)) => Err(LedgerError::NotifyFailed(format!(
                "receiver {} errored: {}",
                receiver_id, e
            ))),
            Err(_) => Err(LedgerError::NotifyFailed(format!(
                "receiver {} did not answer within {:?}",
                receiver_id, timeout
            ))),
        }
    }
}

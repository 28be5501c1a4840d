use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::Deref;

/// Identifier of an account that can hold tokens.
///
/// Opaque, non-empty string. The ledger core never interprets the
/// contents; uniqueness and naming policy belong to the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        AccountId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        AccountId(id.to_string())
    }
}

impl From<String> for AccountId {
    fn from(id: String) -> Self {
        AccountId(id)
    }
}

/// Identifier of a token. Immutable once the token is minted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(String);

impl TokenId {
    pub fn new(id: impl Into<String>) -> Self {
        TokenId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TokenId {
    fn from(id: &str) -> Self {
        TokenId(id.to_string())
    }
}

impl From<String> for TokenId {
    fn from(id: String) -> Self {
        TokenId(id)
    }
}

// NotifyId correlates one notify-and-resolve round: the provisional
// transfer, the receiver notification, and the resolution that settles it.
// It is a 32 byte identifier derived from the round's participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NotifyId([u8; 32]);

impl fmt::Display for NotifyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Format as a hex string with a prefix of the first 6 bytes
        let prefix = hex::encode(&self.0[0..6]);
        write!(f, "ntf:{}", prefix)
    }
}

impl Deref for NotifyId {
    type Target = [u8; 32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl NotifyId {
    /// Create a NotifyId from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        NotifyId(bytes)
    }

    /// Get a reference to the internal bytes
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Derive the correlation id for a notify round.
    ///
    /// The sequence number distinguishes repeated rounds between the same
    /// parties over the same token; callers supply a monotonically
    /// increasing value.
    pub fn derive(
        sender: &AccountId,
        receiver: &AccountId,
        token_id: &TokenId,
        sequence: u64,
    ) -> Self {
        let mut hasher = Sha256::new();

        // Domain separator
        hasher.update(b"RELIC_Notify");

        hasher.update(sender.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(receiver.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(token_id.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(sequence.to_le_bytes());

        NotifyId(hasher.finalize().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_id_derivation_is_deterministic() {
        let sender = AccountId::from("alice");
        let receiver = AccountId::from("bob");
        let token = TokenId::from("t1");

        let a = NotifyId::derive(&sender, &receiver, &token, 7);
        let b = NotifyId::derive(&sender, &receiver, &token, 7);
        assert_eq!(a, b);
    }

    #[test]
    fn test_notify_id_varies_with_inputs() {
        let sender = AccountId::from("alice");
        let receiver = AccountId::from("bob");
        let token = TokenId::from("t1");

        let base = NotifyId::derive(&sender, &receiver, &token, 0);
        assert_ne!(base, NotifyId::derive(&sender, &receiver, &token, 1));
        assert_ne!(
            base,
            NotifyId::derive(&sender, &receiver, &TokenId::from("t2"), 0)
        );
        assert_ne!(
            base,
            NotifyId::derive(&receiver, &sender, &token, 0)
        );
    }

    #[test]
    fn test_notify_id_display_prefix() {
        let id = NotifyId::from_bytes([0xab; 32]);
        assert_eq!(format!("{}", id), "ntf:abababababab");
    }

    #[test]
    fn test_account_id_roundtrip() {
        let id = AccountId::from("carol");
        assert_eq!(id.as_str(), "carol");
        assert_eq!(format!("{}", id), "carol");

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"carol\"");
        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}

pub mod call;
pub mod error;
pub mod event;
pub mod id;
pub mod resolution;
pub mod token;

// Re-export the main types for convenience
pub use call::{CallContext, Deposit};
pub use error::LedgerError;
pub use event::TransferEvent;
pub use id::{AccountId, NotifyId, TokenId};
pub use resolution::{NotifySignal, PendingResolution, ResolutionPhase, TransferOutcome};
pub use token::TokenRecord;

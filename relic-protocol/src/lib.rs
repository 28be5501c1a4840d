pub mod protocol;
pub mod receiver;
pub mod service;

// Re-export the main types for convenience
pub use protocol::{NotifyProtocol, DEFAULT_NOTIFY_TIMEOUT};
pub use receiver::{ReceiverRegistry, TransferReceiver};
pub use service::{LedgerService, MetadataSource, TokenView};

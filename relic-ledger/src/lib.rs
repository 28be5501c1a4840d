pub mod engine;
pub mod memory;
pub mod store;

#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-export the main types for convenience
pub use engine::TransferEngine;
pub use memory::MemoryStore;
pub use store::LedgerStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

//! relic — a non-fungible asset ledger
//!
//! This crate re-exports all the components of the relic ledger.

pub use relic_core::*;
pub use relic_ledger::*;
pub use relic_protocol::*;

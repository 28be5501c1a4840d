use crate::id::AccountId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An amount of the host environment's currency, counted in minimal
/// indivisible units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Deposit(pub u128);

impl Deposit {
    /// The exact security deposit required on mutating boundary calls.
    ///
    /// One minimal unit. This is an access-control mechanism forcing
    /// full-authority signing on the caller's side, not a price; any
    /// other amount is rejected at the boundary.
    pub const ONE: Deposit = Deposit(1);

    /// A call with nothing attached
    pub const NONE: Deposit = Deposit(0);
}

impl fmt::Display for Deposit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller-side context for one boundary call: who signed it and what
/// deposit they attached. Supplied by the host environment; the core
/// never fabricates one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallContext {
    /// The account the host authenticated as the caller
    pub caller: AccountId,

    /// Deposit attached to the call, in minimal units
    pub deposit: Deposit,
}

impl CallContext {
    pub fn new(caller: AccountId, deposit: Deposit) -> Self {
        Self { caller, deposit }
    }

    /// Context with the exact required security deposit attached
    pub fn with_one_unit(caller: AccountId) -> Self {
        Self::new(caller, Deposit::ONE)
    }
}

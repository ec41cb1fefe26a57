//! Wallet module
//!
//! The balance mutator: applies one credit or debit to a wallet and appends
//! its audit record as a single all-or-nothing unit, under the wallet lock.

mod error;
mod mutator;

pub use error::MutationError;
pub use mutator::{plan_balance, BalanceMutator, MutationOutcome};

//! Wallet Ledger Library
//!
//! Re-exports modules for integration testing and the binaries.

pub mod api;
pub mod domain;
pub mod handlers;
pub mod jobs;
pub mod ledger;
pub mod lock;
pub mod wallet;

pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use domain::{Amount, AmountError, Balance, DomainError, OperationContext, TransactionKind};
pub use error::{AppError, AppResult, ErrorResponse};
pub use lock::{LockSettings, LockStrategy};
pub use wallet::{BalanceMutator, MutationError, MutationOutcome};

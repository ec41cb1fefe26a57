//! Ledger module
//!
//! System of record for wallet balances and the append-only transaction
//! history. No business rule lives here.

mod error;
mod repository;

pub use error::LedgerError;
pub use repository::{
    AuditRecord, KindTotals, LedgerStore, LedgerSummary, NewAuditRecord, Owner, Reconciliation,
    WalletStatus,
};

//! Domain module
//!
//! Core domain types and business rules.

pub mod amount;
pub mod context;
pub mod error;
pub mod kind;
pub mod validation;

pub use amount::{Amount, AmountError, Balance};
pub use context::OperationContext;
pub use error::DomainError;
pub use kind::TransactionKind;
pub use validation::{validate_email, validate_name, validate_username};

//! Command definitions
//!
//! Commands represent intentions to change the system state. They carry the
//! raw request values; validation happens in `validate` so a handler can
//! reject a command before touching the database.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    validate_email, validate_name, validate_username, Amount, DomainError, TransactionKind,
};

// =========================================================================
// MutationCommand
// =========================================================================

/// Command to credit or debit one wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationCommand {
    pub user_id: Uuid,
    /// "credit" or "debit", case-insensitive
    pub kind: String,
    /// Decimal amount as text
    pub amount: String,
}

impl MutationCommand {
    pub fn new(user_id: Uuid, kind: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            user_id,
            kind: kind.into(),
            amount: amount.into(),
        }
    }

    pub fn credit(user_id: Uuid, amount: impl Into<String>) -> Self {
        Self::new(user_id, TransactionKind::Credit.as_str(), amount)
    }

    pub fn debit(user_id: Uuid, amount: impl Into<String>) -> Self {
        Self::new(user_id, TransactionKind::Debit.as_str(), amount)
    }

    /// Parse the kind and amount. The kind is checked first.
    pub fn validate(&self) -> Result<(TransactionKind, Amount), DomainError> {
        let kind: TransactionKind = self.kind.parse()?;
        let amount: Amount = self.amount.parse()?;
        Ok((kind, amount))
    }
}

// =========================================================================
// User commands
// =========================================================================

/// Command to create a new user and provision its wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserCommand {
    pub username: String,
    pub fname: String,
    pub lname: String,
    pub email: String,
}

impl CreateUserCommand {
    pub fn new(
        username: impl Into<String>,
        fname: impl Into<String>,
        lname: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            fname: fname.into(),
            lname: lname.into(),
            email: email.into(),
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        validate_user_fields(&self.username, &self.fname, &self.lname, &self.email)
    }
}

/// Command to replace a user's identity fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserCommand {
    pub user_id: Uuid,
    pub username: String,
    pub fname: String,
    pub lname: String,
    pub email: String,
}

impl UpdateUserCommand {
    pub fn new(user_id: Uuid, fields: CreateUserCommand) -> Self {
        Self {
            user_id,
            username: fields.username,
            fname: fields.fname,
            lname: fields.lname,
            email: fields.email,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        validate_user_fields(&self.username, &self.fname, &self.lname, &self.email)
    }
}

fn validate_user_fields(
    username: &str,
    fname: &str,
    lname: &str,
    email: &str,
) -> Result<(), DomainError> {
    validate_username(username)?;
    validate_name(fname, "First name")?;
    validate_name(lname, "Last name")?;
    validate_email(email)
}

// =========================================================================
// Results
// =========================================================================

/// Stored user row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub fname: String,
    pub lname: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User with wallet balance and transaction count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDetails {
    #[serde(flatten)]
    pub user: UserRecord,
    pub balance: Decimal,
    pub total_transactions: i64,
}

/// Result of a successful user deletion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteUserResult {
    pub user_id: Uuid,
    /// False when the wallet was kept because transactions reference it
    pub wallet_removed: bool,
    pub message: String,
}

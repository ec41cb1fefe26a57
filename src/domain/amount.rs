//! Amount and Balance types
//!
//! Domain primitives for monetary values. An `Amount` is the size of one
//! credit or debit and is validated at construction time; a `Balance` is
//! what a wallet holds and may rest at zero.

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Largest value NUMERIC(20, 8) holds: 999,999,999,999.99999999
const MAX_AMOUNT: Decimal = Decimal::from_parts(1_661_992_959, 1_808_227_885, 5, false, 8);

/// Maximum decimal places, matching NUMERIC(20, 8)
const MAX_SCALE: u32 = 8;

/// Amount represents a validated, strictly positive monetary value.
///
/// # Invariants
/// - Value is always positive (> 0)
/// - Maximum 8 decimal places
/// - Below 1 trillion, the column limit
///
/// Parsed from text (plain or exponent notation) and always serialized as a
/// string.
///
/// # Example
/// ```
/// use rust_decimal::Decimal;
/// use wallet_ledger::domain::Amount;
///
/// let amount = Amount::new(Decimal::new(100, 0)).unwrap();
/// assert_eq!(amount.value(), Decimal::new(100, 0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct Amount(Decimal);

/// Errors that can occur when creating an Amount
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(Decimal),

    #[error("Amount has too many decimal places (max {MAX_SCALE}, got {0})")]
    TooManyDecimals(u32),

    #[error("Amount exceeds maximum allowed value ({MAX_AMOUNT})")]
    Overflow,

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `AmountError::NotPositive` if value <= 0
    /// - `AmountError::TooManyDecimals` if more than 8 decimal places
    /// - `AmountError::Overflow` if value does not fit NUMERIC(20, 8)
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }

        let value = value.normalize();
        if value.scale() > MAX_SCALE {
            return Err(AmountError::TooManyDecimals(value.scale()));
        }

        if value > MAX_AMOUNT {
            return Err(AmountError::Overflow);
        }

        Ok(Self(value))
    }

    /// Create an Amount from an integer (no decimal places).
    pub fn from_integer(value: i64) -> Result<Self, AmountError> {
        Self::new(Decimal::from(value))
    }

    /// Get the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.8}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let decimal = Decimal::from_str(s)
            .or_else(|_| Decimal::from_scientific(s))
            .map_err(|e| AmountError::ParseError(e.to_string()))?;
        Amount::new(decimal)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        format!("{:.8}", amount.0)
    }
}

/// Balance represents a wallet balance (zero or positive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Balance(Decimal);

impl Balance {
    /// Create a new balance (zero or positive)
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }

        if value > MAX_AMOUNT {
            return Err(AmountError::Overflow);
        }

        Ok(Self(value))
    }

    /// Create a zero balance
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Get the underlying value
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Check if balance covers a withdrawal of `amount`
    pub fn is_sufficient_for(&self, amount: &Amount) -> bool {
        self.0 >= amount.value()
    }

    /// Add amount to balance
    pub fn credit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        Balance::new(self.0 + amount.value())
    }

    /// Subtract amount from balance
    pub fn debit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        Balance::new(self.0 - amount.value())
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.8}", self.0)
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_max_amount_constant() {
        assert_eq!(MAX_AMOUNT, dec!(999999999999.99999999));
    }

    #[test]
    fn test_amount_positive() {
        let amount = Amount::new(dec!(100)).unwrap();
        assert_eq!(amount.value(), dec!(100));
    }

    #[test]
    fn test_amount_zero_and_negative_rejected() {
        assert!(matches!(Amount::new(Decimal::ZERO), Err(AmountError::NotPositive(_))));
        assert!(matches!(Amount::new(dec!(-5)), Err(AmountError::NotPositive(_))));
    }

    #[test]
    fn test_amount_too_many_decimals() {
        let amount = Amount::new(dec!(0.123456789));
        assert!(matches!(amount, Err(AmountError::TooManyDecimals(9))));
    }

    #[test]
    fn test_amount_trailing_zeros_do_not_count_as_decimals() {
        let amount = Amount::new(dec!(1.500000000000)).unwrap();
        assert_eq!(amount.value(), dec!(1.5));
    }

    #[test]
    fn test_amount_overflow() {
        assert!(matches!(Amount::new(dec!(1000000000000)), Err(AmountError::Overflow)));
        assert!(Amount::new(dec!(999999999999.99999999)).is_ok());
    }

    #[test]
    fn test_amount_parses_plain_and_exponent_text() {
        assert_eq!("10.50".parse::<Amount>().unwrap().value(), dec!(10.5));
        assert_eq!(" 7 ".parse::<Amount>().unwrap().value(), dec!(7));
        assert_eq!("1e-7".parse::<Amount>().unwrap().value(), dec!(0.0000001));
        assert_eq!("2.5E3".parse::<Amount>().unwrap().value(), dec!(2500));
    }

    #[test]
    fn test_amount_parse_rejects_bad_text() {
        assert!(matches!("abc".parse::<Amount>(), Err(AmountError::ParseError(_))));
        assert!(matches!("-1".parse::<Amount>(), Err(AmountError::NotPositive(_))));
        assert!(matches!("1e-9".parse::<Amount>(), Err(AmountError::TooManyDecimals(9))));
        assert!(matches!("1e12".parse::<Amount>(), Err(AmountError::Overflow)));
    }

    #[test]
    fn test_amount_serializes_as_string() {
        let amount = Amount::new(dec!(2.5)).unwrap();
        assert_eq!(serde_json::to_string(&amount).unwrap(), r#""2.50000000""#);
    }

    #[test]
    fn test_balance_credit_debit() {
        let balance = Balance::zero();
        let balance = balance.credit(&Amount::new(dec!(100)).unwrap()).unwrap();
        assert_eq!(balance.value(), dec!(100));

        let balance = balance.debit(&Amount::new(dec!(30)).unwrap()).unwrap();
        assert_eq!(balance.value(), dec!(70));
    }

    #[test]
    fn test_balance_debit_to_exactly_zero() {
        let balance = Balance::new(dec!(42.42)).unwrap();
        let amount = Amount::new(dec!(42.42)).unwrap();

        assert!(balance.is_sufficient_for(&amount));
        assert_eq!(balance.debit(&amount).unwrap(), Balance::zero());
    }

    #[test]
    fn test_balance_credit_past_column_limit_overflows() {
        let balance = Balance::new(dec!(999999999999)).unwrap();
        let amount = Amount::new(dec!(1)).unwrap();

        assert!(matches!(balance.credit(&amount), Err(AmountError::Overflow)));
    }

    #[test]
    fn test_balance_insufficient() {
        let balance = Balance::new(dec!(50)).unwrap();
        let amount = Amount::new(dec!(100)).unwrap();

        assert!(!balance.is_sufficient_for(&amount));
        assert!(matches!(balance.debit(&amount), Err(AmountError::NotPositive(_))));
    }
}

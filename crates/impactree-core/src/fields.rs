//! Input checks shared by the write paths.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use crate::error::{ImpactError, Result};

/// Integer digits allowed by each NUMERIC column (all have two decimals).
pub(crate) const MONEY_DIGITS: u32 = 10;
pub(crate) const ALLOCATION_DIGITS: u32 = 8;
pub(crate) const PERCENTAGE_DIGITS: u32 = 3;

pub(crate) fn require_non_empty(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ImpactError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Reject negative values and values that overflow a `NUMERIC(p, 2)` column
/// with `integer_digits = p - 2`.
pub(crate) fn check_decimal(field: &'static str, value: Decimal, integer_digits: u32) -> Result<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ImpactError::validation(format!("{field} must not be negative")));
    }
    let limit = Decimal::from(10_i64.pow(integer_digits));
    if value.round_dp(2) >= limit {
        return Err(ImpactError::validation(format!(
            "{field} must be less than {limit}"
        )));
    }
    Ok(())
}

/// True when a store error was caused by a unique constraint.
pub(crate) fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .is_some_and(|db| db.is_unique_violation())
}

/// Distinguish an absent field (`None`) from an explicit `null`
/// (`Some(None)`). Pair with `#[serde(default)]`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

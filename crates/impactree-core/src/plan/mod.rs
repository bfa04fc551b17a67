//! Impact plan lifecycle.
//!
//! A plan belongs to exactly one user, carries its resolved milestone, and
//! owns a set of charity allocations. Creation and update each run in a
//! single transaction, so a failure part way leaves the plan untouched.

pub mod reconcile;
pub mod service;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::Result;
use crate::fields::{ALLOCATION_DIGITS, MONEY_DIGITS, PERCENTAGE_DIGITS, check_decimal, double_option};

/// One requested allocation in a plan's `charities` payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AllocationEntry {
    pub charity_id: i64,
    pub allocation_amount: Decimal,
}

/// Payload for creating a plan. `user` defaults to the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPlanRequest {
    #[serde(default)]
    pub user: Option<i64>,
    pub annual_income: Decimal,
    pub philanthropy_percentage: Decimal,
    pub total_annual_allocation: Decimal,
    #[serde(default)]
    pub charities: Option<Vec<AllocationEntry>>,
}

/// Partial plan update. Absent fields are left unchanged; `charities`
/// replaces the whole allocation set, an empty list clearing it. A present
/// `user`, including `null`, must name the current owner.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanChanges {
    #[serde(default, deserialize_with = "double_option")]
    pub user: Option<Option<i64>>,
    pub annual_income: Option<Decimal>,
    pub philanthropy_percentage: Option<Decimal>,
    pub total_annual_allocation: Option<Decimal>,
    #[serde(default)]
    pub charities: Option<Vec<AllocationEntry>>,
}

fn check_money(
    annual_income: Option<Decimal>,
    philanthropy_percentage: Option<Decimal>,
    total_annual_allocation: Option<Decimal>,
) -> Result<()> {
    if let Some(v) = annual_income {
        check_decimal("annual_income", v, MONEY_DIGITS)?;
    }
    if let Some(v) = philanthropy_percentage {
        check_decimal("philanthropy_percentage", v, PERCENTAGE_DIGITS)?;
    }
    if let Some(v) = total_annual_allocation {
        check_decimal("total_annual_allocation", v, MONEY_DIGITS)?;
    }
    Ok(())
}

pub(crate) fn check_entries(entries: &[AllocationEntry]) -> Result<()> {
    entries
        .iter()
        .try_for_each(|e| check_decimal("allocation_amount", e.allocation_amount, ALLOCATION_DIGITS))
}

impl NewPlanRequest {
    pub fn validate(&self) -> Result<()> {
        check_money(
            Some(self.annual_income),
            Some(self.philanthropy_percentage),
            Some(self.total_annual_allocation),
        )?;
        check_entries(self.charities.as_deref().unwrap_or_default())
    }
}

impl PlanChanges {
    pub fn validate(&self) -> Result<()> {
        check_money(
            self.annual_income,
            self.philanthropy_percentage,
            self.total_annual_allocation,
        )?;
        check_entries(self.charities.as_deref().unwrap_or_default())
    }
}

//! Database query functions for the `impact_plans` table.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sqlx::PgExecutor;

use crate::models::ImpactPlan;

/// Columns supplied when inserting a plan.
#[derive(Debug, Clone)]
pub struct NewImpactPlan {
    pub user_id: i64,
    pub annual_income: Decimal,
    pub philanthropy_percentage: Decimal,
    pub total_annual_allocation: Decimal,
    pub current_milestone_id: Option<i64>,
}

pub async fn insert_plan(executor: impl PgExecutor<'_>, new: &NewImpactPlan) -> Result<ImpactPlan> {
    let plan = sqlx::query_as::<_, ImpactPlan>(
        "INSERT INTO impact_plans \
             (user_id, annual_income, philanthropy_percentage, total_annual_allocation, current_milestone_id) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(new.user_id)
    .bind(new.annual_income)
    .bind(new.philanthropy_percentage)
    .bind(new.total_annual_allocation)
    .bind(new.current_milestone_id)
    .fetch_one(executor)
    .await
    .context("failed to insert impact plan")?;

    Ok(plan)
}

pub async fn get_plan(executor: impl PgExecutor<'_>, id: i64) -> Result<Option<ImpactPlan>> {
    let plan = sqlx::query_as::<_, ImpactPlan>("SELECT * FROM impact_plans WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("failed to fetch impact plan")?;

    Ok(plan)
}

/// Fetch a plan and hold a row lock on it until the transaction ends.
pub async fn get_plan_for_update(
    executor: impl PgExecutor<'_>,
    id: i64,
) -> Result<Option<ImpactPlan>> {
    let plan =
        sqlx::query_as::<_, ImpactPlan>("SELECT * FROM impact_plans WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await
            .context("failed to lock impact plan")?;

    Ok(plan)
}

/// Fetch the plan owned by a user, if any. The oldest wins should the
/// one-plan-per-user rule ever have been bypassed.
pub async fn get_plan_for_user(
    executor: impl PgExecutor<'_>,
    user_id: i64,
) -> Result<Option<ImpactPlan>> {
    let plan = sqlx::query_as::<_, ImpactPlan>(
        "SELECT * FROM impact_plans WHERE user_id = $1 ORDER BY id LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
    .context("failed to fetch impact plan for user")?;

    Ok(plan)
}

/// Fetch several plans at once. Missing IDs are silently skipped.
pub async fn get_plans_by_ids(executor: impl PgExecutor<'_>, ids: &[i64]) -> Result<Vec<ImpactPlan>> {
    let plans =
        sqlx::query_as::<_, ImpactPlan>("SELECT * FROM impact_plans WHERE id = ANY($1) ORDER BY id")
            .bind(ids)
            .fetch_all(executor)
            .await
            .context("failed to fetch impact plans by id")?;

    Ok(plans)
}

pub async fn list_plans(executor: impl PgExecutor<'_>) -> Result<Vec<ImpactPlan>> {
    let plans = sqlx::query_as::<_, ImpactPlan>("SELECT * FROM impact_plans ORDER BY id")
        .fetch_all(executor)
        .await
        .context("failed to list impact plans")?;

    Ok(plans)
}

pub async fn count_plans_for_user(executor: impl PgExecutor<'_>, user_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM impact_plans WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(executor)
        .await
        .context("failed to count impact plans")?;

    Ok(count)
}

/// Write back every mutable column of `plan`. The owner is never touched.
pub async fn update_plan(executor: impl PgExecutor<'_>, plan: &ImpactPlan) -> Result<Option<ImpactPlan>> {
    let updated = sqlx::query_as::<_, ImpactPlan>(
        "UPDATE impact_plans SET \
             annual_income = $2, \
             philanthropy_percentage = $3, \
             total_annual_allocation = $4, \
             current_milestone_id = $5 \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(plan.id)
    .bind(plan.annual_income)
    .bind(plan.philanthropy_percentage)
    .bind(plan.total_annual_allocation)
    .bind(plan.current_milestone_id)
    .fetch_optional(executor)
    .await
    .context("failed to update impact plan")?;

    Ok(updated)
}

/// Delete a plan. Its allocations are removed by `ON DELETE CASCADE`.
pub async fn delete_plan(executor: impl PgExecutor<'_>, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM impact_plans WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .context("failed to delete impact plan")?;

    Ok(result.rows_affected() > 0)
}

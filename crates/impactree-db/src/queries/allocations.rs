//! Database query functions for the `impact_plan_charities` table.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sqlx::PgExecutor;

use crate::models::ImpactPlanCharity;

pub async fn insert_allocation(
    executor: impl PgExecutor<'_>,
    impact_plan_id: i64,
    charity_id: i64,
    allocation_amount: Decimal,
) -> Result<ImpactPlanCharity> {
    let allocation = sqlx::query_as::<_, ImpactPlanCharity>(
        "INSERT INTO impact_plan_charities (impact_plan_id, charity_id, allocation_amount) \
         VALUES ($1, $2, $3) \
         RETURNING *",
    )
    .bind(impact_plan_id)
    .bind(charity_id)
    .bind(allocation_amount)
    .fetch_one(executor)
    .await
    .with_context(|| {
        format!("failed to insert allocation of charity {charity_id} to plan {impact_plan_id}")
    })?;

    Ok(allocation)
}

pub async fn get_allocation(
    executor: impl PgExecutor<'_>,
    id: i64,
) -> Result<Option<ImpactPlanCharity>> {
    let allocation =
        sqlx::query_as::<_, ImpactPlanCharity>("SELECT * FROM impact_plan_charities WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
            .context("failed to fetch allocation")?;

    Ok(allocation)
}

/// Look up the allocation for a (plan, charity) pair.
pub async fn find_allocation(
    executor: impl PgExecutor<'_>,
    impact_plan_id: i64,
    charity_id: i64,
) -> Result<Option<ImpactPlanCharity>> {
    let allocation = sqlx::query_as::<_, ImpactPlanCharity>(
        "SELECT * FROM impact_plan_charities \
         WHERE impact_plan_id = $1 AND charity_id = $2 \
         ORDER BY id LIMIT 1",
    )
    .bind(impact_plan_id)
    .bind(charity_id)
    .fetch_optional(executor)
    .await
    .context("failed to look up allocation pair")?;

    Ok(allocation)
}

/// List a plan's allocations in insertion order.
pub async fn list_allocations_for_plan(
    executor: impl PgExecutor<'_>,
    impact_plan_id: i64,
) -> Result<Vec<ImpactPlanCharity>> {
    let allocations = sqlx::query_as::<_, ImpactPlanCharity>(
        "SELECT * FROM impact_plan_charities WHERE impact_plan_id = $1 ORDER BY id",
    )
    .bind(impact_plan_id)
    .fetch_all(executor)
    .await
    .context("failed to list allocations for plan")?;

    Ok(allocations)
}

/// List the allocations of several plans at once, ordered by plan then id.
pub async fn list_allocations_for_plans(
    executor: impl PgExecutor<'_>,
    impact_plan_ids: &[i64],
) -> Result<Vec<ImpactPlanCharity>> {
    let allocations = sqlx::query_as::<_, ImpactPlanCharity>(
        "SELECT * FROM impact_plan_charities \
         WHERE impact_plan_id = ANY($1) \
         ORDER BY impact_plan_id, id",
    )
    .bind(impact_plan_ids)
    .fetch_all(executor)
    .await
    .context("failed to list allocations for plans")?;

    Ok(allocations)
}

/// Set a new amount. Returns `None` when the allocation does not exist.
pub async fn update_allocation_amount(
    executor: impl PgExecutor<'_>,
    id: i64,
    allocation_amount: Decimal,
) -> Result<Option<ImpactPlanCharity>> {
    let allocation = sqlx::query_as::<_, ImpactPlanCharity>(
        "UPDATE impact_plan_charities SET allocation_amount = $2 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(allocation_amount)
    .fetch_optional(executor)
    .await
    .context("failed to update allocation amount")?;

    Ok(allocation)
}

pub async fn delete_allocation(executor: impl PgExecutor<'_>, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM impact_plan_charities WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .context("failed to delete allocation")?;

    Ok(result.rows_affected() > 0)
}

/// Remove every allocation of a plan. Returns the number of rows removed.
pub async fn delete_allocations_for_plan(
    executor: impl PgExecutor<'_>,
    impact_plan_id: i64,
) -> Result<u64> {
    let result = sqlx::query("DELETE FROM impact_plan_charities WHERE impact_plan_id = $1")
        .bind(impact_plan_id)
        .execute(executor)
        .await
        .context("failed to clear plan allocations")?;

    Ok(result.rows_affected())
}

pub async fn count_allocations_for_plan(
    executor: impl PgExecutor<'_>,
    impact_plan_id: i64,
) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM impact_plan_charities WHERE impact_plan_id = $1",
    )
    .bind(impact_plan_id)
    .fetch_one(executor)
    .await
    .context("failed to count allocations")?;

    Ok(count)
}

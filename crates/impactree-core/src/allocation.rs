//! Direct operations on single plan/charity allocations.
//!
//! Unlike the nested `charities` payload of a plan, this path refuses to
//! add a charity that the plan already allocates to.

use anyhow::Context;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, warn};

use impactree_db::models::{ImpactPlanCharity, User};
use impactree_db::queries::{
    allocations as allocation_queries, charities as charity_queries, impact_plans as plan_queries,
};

use crate::auth::require_self_or_staff;
use crate::error::{ImpactError, Result};
use crate::fields::{ALLOCATION_DIGITS, check_decimal};
use crate::view::{AllocationView, allocation_view, allocation_views};

#[derive(Debug, Clone, Deserialize)]
pub struct NewAllocationRequest {
    pub impact_plan_id: i64,
    pub charity_id: i64,
    pub allocation_amount: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AllocationUpdate {
    pub allocation_amount: Option<Decimal>,
}

fn plan_not_found() -> ImpactError {
    ImpactError::NotFound("Impact Plan not found".into())
}

fn allocation_not_found(id: i64) -> ImpactError {
    ImpactError::not_found("allocation", id)
}

/// Add one charity to a plan.
///
/// The plan row is locked while checking for an existing pair so two
/// concurrent requests cannot both insert it.
pub async fn create_allocation(
    pool: &PgPool,
    caller: &User,
    req: &NewAllocationRequest,
) -> Result<AllocationView> {
    check_decimal("allocation_amount", req.allocation_amount, ALLOCATION_DIGITS)?;

    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let plan = plan_queries::get_plan_for_update(&mut *tx, req.impact_plan_id)
        .await?
        .ok_or_else(plan_not_found)?;
    require_self_or_staff(caller, plan.user_id)?;

    if charity_queries::get_charity(&mut *tx, req.charity_id).await?.is_none() {
        return Err(ImpactError::NotFound("Charity not found".into()));
    }
    if allocation_queries::find_allocation(&mut *tx, plan.id, req.charity_id)
        .await?
        .is_some()
    {
        warn!(plan_id = plan.id, charity_id = req.charity_id, "charity already in plan");
        return Err(ImpactError::DuplicateAllocation);
    }

    let allocation = allocation_queries::insert_allocation(
        &mut *tx,
        plan.id,
        req.charity_id,
        req.allocation_amount,
    )
    .await?;
    tx.commit().await.context("failed to commit allocation")?;

    info!(
        allocation_id = allocation.id,
        plan_id = plan.id,
        charity_id = req.charity_id,
        amount = %allocation.allocation_amount,
        "allocation created"
    );
    allocation_view(pool, allocation).await
}

pub async fn get_allocation(pool: &PgPool, id: i64) -> Result<AllocationView> {
    let allocation = allocation_queries::get_allocation(pool, id)
        .await?
        .ok_or_else(|| allocation_not_found(id))?;
    allocation_view(pool, allocation).await
}

/// Load an allocation and check the caller may modify its plan.
async fn load_owned(pool: &PgPool, caller: &User, id: i64) -> Result<ImpactPlanCharity> {
    let allocation = allocation_queries::get_allocation(pool, id)
        .await?
        .ok_or_else(|| allocation_not_found(id))?;
    let plan = plan_queries::get_plan(pool, allocation.impact_plan_id)
        .await?
        .ok_or_else(plan_not_found)?;
    require_self_or_staff(caller, plan.user_id)?;
    Ok(allocation)
}

/// Change an allocation's amount. The amount is mandatory here even though
/// the update is otherwise partial.
pub async fn update_allocation(
    pool: &PgPool,
    caller: &User,
    id: i64,
    update: &AllocationUpdate,
) -> Result<AllocationView> {
    load_owned(pool, caller, id).await?;
    let amount = update
        .allocation_amount
        .ok_or(ImpactError::MissingField("allocation_amount"))?;
    check_decimal("allocation_amount", amount, ALLOCATION_DIGITS)?;

    let allocation = allocation_queries::update_allocation_amount(pool, id, amount)
        .await?
        .ok_or_else(|| allocation_not_found(id))?;
    info!(allocation_id = id, amount = %amount, by = caller.id, "allocation updated");
    allocation_view(pool, allocation).await
}

pub async fn delete_allocation(pool: &PgPool, caller: &User, id: i64) -> Result<()> {
    load_owned(pool, caller, id).await?;
    if !allocation_queries::delete_allocation(pool, id).await? {
        return Err(allocation_not_found(id));
    }
    info!(allocation_id = id, by = caller.id, "allocation deleted");
    Ok(())
}

/// Allocations of the caller's own plan, ordered by id.
pub async fn list_caller_allocations(pool: &PgPool, caller: &User) -> Result<Vec<AllocationView>> {
    let plan = plan_queries::get_plan_for_user(pool, caller.id)
        .await?
        .ok_or(ImpactError::NoPlanForUser)?;
    let allocations = allocation_queries::list_allocations_for_plan(pool, plan.id).await?;
    allocation_views(pool, allocations).await
}

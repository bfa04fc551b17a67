//! Plan service layer.
//!
//! Create and update open one transaction each: the duplicate check,
//! plan row write, milestone resolution and allocation reconciliation
//! either all land or none do.

use anyhow::Context;
use sqlx::PgPool;
use tracing::{info, warn};

use impactree_db::models::User;
use impactree_db::queries::impact_plans::{self as plan_queries, NewImpactPlan};
use impactree_db::queries::users as user_queries;

use super::reconcile::{insert_allocations, replace_allocations};
use super::{NewPlanRequest, PlanChanges};
use crate::auth::require_self_or_staff;
use crate::error::{ImpactError, Result};
use crate::milestone::current_milestone_for;
use crate::view::{PlanView, plan_view, plan_views};

/// Create a plan for `req.user` (or the caller) and return it fully expanded.
///
/// Fails with [`ImpactError::DuplicatePlan`] if the owner already has a
/// plan. The owner's user row is locked for the duration so concurrent
/// creates for the same user serialize on it.
pub async fn create_plan(pool: &PgPool, caller: &User, req: &NewPlanRequest) -> Result<PlanView> {
    let owner_id = req.user.unwrap_or(caller.id);
    require_self_or_staff(caller, owner_id)?;
    req.validate()?;

    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    if !user_queries::lock_user(&mut *tx, owner_id).await? {
        return Err(ImpactError::not_found("user", owner_id));
    }
    if let Some(existing) = plan_queries::get_plan_for_user(&mut *tx, owner_id).await? {
        warn!(user_id = owner_id, plan_id = existing.id, "user already has an impact plan");
        return Err(ImpactError::DuplicatePlan);
    }

    let milestone = current_milestone_for(&mut *tx, req.philanthropy_percentage).await?;
    let plan = plan_queries::insert_plan(
        &mut *tx,
        &NewImpactPlan {
            user_id: owner_id,
            annual_income: req.annual_income,
            philanthropy_percentage: req.philanthropy_percentage,
            total_annual_allocation: req.total_annual_allocation,
            current_milestone_id: milestone.as_ref().map(|m| m.id),
        },
    )
    .await?;

    let allocations = match &req.charities {
        Some(entries) => insert_allocations(&mut tx, plan.id, entries).await?.len(),
        None => 0,
    };

    tx.commit().await.context("failed to commit impact plan")?;

    info!(
        plan_id = plan.id,
        user_id = owner_id,
        milestone_id = plan.current_milestone_id,
        allocations,
        "impact plan created"
    );
    plan_view(pool, plan).await
}

pub async fn get_plan(pool: &PgPool, id: i64) -> Result<PlanView> {
    let plan = plan_queries::get_plan(pool, id)
        .await?
        .ok_or_else(|| ImpactError::not_found("impact plan", id))?;
    plan_view(pool, plan).await
}

pub async fn list_plans(pool: &PgPool) -> Result<Vec<PlanView>> {
    let plans = plan_queries::list_plans(pool).await?;
    plan_views(pool, plans).await
}

/// Apply a partial update to a plan.
///
/// The milestone is re-resolved only when `philanthropy_percentage` is
/// present; allocations are replaced only when `charities` is present.
pub async fn update_plan(
    pool: &PgPool,
    caller: &User,
    id: i64,
    changes: &PlanChanges,
) -> Result<PlanView> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let mut plan = plan_queries::get_plan_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| ImpactError::not_found("impact plan", id))?;

    if changes.user.is_some_and(|user| user != Some(plan.user_id)) {
        return Err(ImpactError::ImmutableOwner);
    }
    require_self_or_staff(caller, plan.user_id)?;
    changes.validate()?;

    if let Some(v) = changes.annual_income {
        plan.annual_income = v;
    }
    if let Some(v) = changes.total_annual_allocation {
        plan.total_annual_allocation = v;
    }
    if let Some(pct) = changes.philanthropy_percentage {
        plan.philanthropy_percentage = pct;
        plan.current_milestone_id = current_milestone_for(&mut *tx, pct).await?.map(|m| m.id);
    }

    let plan = plan_queries::update_plan(&mut *tx, &plan)
        .await?
        .ok_or_else(|| ImpactError::not_found("impact plan", id))?;

    if let Some(entries) = &changes.charities {
        replace_allocations(&mut tx, plan.id, entries).await?;
    }

    tx.commit().await.context("failed to commit impact plan update")?;

    info!(
        plan_id = id,
        by = caller.id,
        milestone_id = plan.current_milestone_id,
        replaced_allocations = changes.charities.is_some(),
        "impact plan updated"
    );
    plan_view(pool, plan).await
}

/// Delete a plan and its allocations.
pub async fn delete_plan(pool: &PgPool, caller: &User, id: i64) -> Result<()> {
    let plan = plan_queries::get_plan(pool, id)
        .await?
        .ok_or_else(|| ImpactError::not_found("impact plan", id))?;
    require_self_or_staff(caller, plan.user_id)?;

    if !plan_queries::delete_plan(pool, id).await? {
        return Err(ImpactError::not_found("impact plan", id));
    }
    info!(plan_id = id, by = caller.id, "impact plan deleted");
    Ok(())
}

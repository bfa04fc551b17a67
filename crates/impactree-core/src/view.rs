//! Read shapes returned to clients.
//!
//! Rows are expanded into nested objects here: a plan carries its owner,
//! milestone and allocations, and each allocation carries its charity with
//! the charity's category. Related rows are fetched in batches.

use std::collections::HashMap;

use anyhow::anyhow;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use impactree_db::models::{
    Charity, CharityCategory, ImpactPlan, ImpactPlanCharity, Milestone, User,
};
use impactree_db::queries::{
    allocations as allocation_queries, categories as category_queries,
    charities as charity_queries, impact_plans as plan_queries, milestones as milestone_queries,
    users as user_queries,
};

use crate::error::Result;
use crate::media::media_url;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharityView {
    pub id: i64,
    pub name: String,
    pub category: Option<CharityCategory>,
    pub description: String,
    pub impact_metric: String,
    pub impact_ratio: f64,
    pub website_url: String,
    pub image: Option<String>,
}

impl CharityView {
    fn new(charity: Charity, category: Option<CharityCategory>) -> Self {
        Self {
            id: charity.id,
            name: charity.name,
            category,
            description: charity.description,
            impact_metric: charity.impact_metric,
            impact_ratio: charity.impact_ratio,
            website_url: charity.website_url,
            image: charity.image_path.as_deref().map(media_url),
        }
    }
}

/// An allocation as nested inside its plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanAllocationView {
    pub id: i64,
    pub charity: CharityView,
    pub allocation_amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanView {
    pub id: i64,
    pub user: User,
    pub annual_income: Decimal,
    pub philanthropy_percentage: Decimal,
    pub total_annual_allocation: Decimal,
    pub current_milestone: Option<Milestone>,
    pub charities: Vec<PlanAllocationView>,
}

/// A plan with its references left as ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSummary {
    pub id: i64,
    pub user: i64,
    pub annual_income: Decimal,
    pub philanthropy_percentage: Decimal,
    pub total_annual_allocation: Decimal,
    pub current_milestone: Option<i64>,
}

impl From<ImpactPlan> for PlanSummary {
    fn from(plan: ImpactPlan) -> Self {
        Self {
            id: plan.id,
            user: plan.user_id,
            annual_income: plan.annual_income,
            philanthropy_percentage: plan.philanthropy_percentage,
            total_annual_allocation: plan.total_annual_allocation,
            current_milestone: plan.current_milestone_id,
        }
    }
}

/// A single allocation as returned by the allocation endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationView {
    pub id: i64,
    pub impact_plan: PlanSummary,
    pub charity: CharityView,
    pub allocation_amount: Decimal,
}

fn unique_ids(ids: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let mut ids: Vec<i64> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Expand charities with their categories, preserving input order.
pub async fn charity_views(pool: &PgPool, charities: Vec<Charity>) -> Result<Vec<CharityView>> {
    let category_ids = unique_ids(charities.iter().filter_map(|c| c.category_id));
    let categories: HashMap<i64, CharityCategory> =
        category_queries::get_categories_by_ids(pool, &category_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

    Ok(charities
        .into_iter()
        .map(|charity| {
            let category = charity.category_id.and_then(|id| categories.get(&id).cloned());
            CharityView::new(charity, category)
        })
        .collect())
}

pub async fn charity_view(pool: &PgPool, charity: Charity) -> Result<CharityView> {
    let mut views = charity_views(pool, vec![charity]).await?;
    views
        .pop()
        .ok_or_else(|| anyhow!("charity view expansion produced no rows").into())
}

async fn charity_map(pool: &PgPool, ids: &[i64]) -> Result<HashMap<i64, CharityView>> {
    let charities = charity_queries::get_charities_by_ids(pool, ids).await?;
    Ok(charity_views(pool, charities)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect())
}

/// Expand plans with owner, milestone and allocations (ordered by id),
/// preserving input order.
pub async fn plan_views(pool: &PgPool, plans: Vec<ImpactPlan>) -> Result<Vec<PlanView>> {
    if plans.is_empty() {
        return Ok(Vec::new());
    }

    let user_ids = unique_ids(plans.iter().map(|p| p.user_id));
    let users: HashMap<i64, User> = user_queries::get_users_by_ids(pool, &user_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let milestone_ids = unique_ids(plans.iter().filter_map(|p| p.current_milestone_id));
    let milestones: HashMap<i64, Milestone> =
        milestone_queries::get_milestones_by_ids(pool, &milestone_ids)
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();

    let plan_ids: Vec<i64> = plans.iter().map(|p| p.id).collect();
    let allocations = allocation_queries::list_allocations_for_plans(pool, &plan_ids).await?;
    let charities = charity_map(pool, &unique_ids(allocations.iter().map(|a| a.charity_id))).await?;

    let mut by_plan: HashMap<i64, Vec<PlanAllocationView>> = HashMap::new();
    for allocation in allocations {
        let charity = charities.get(&allocation.charity_id).cloned().ok_or_else(|| {
            anyhow!("charity {} of allocation {} vanished", allocation.charity_id, allocation.id)
        })?;
        by_plan
            .entry(allocation.impact_plan_id)
            .or_default()
            .push(PlanAllocationView {
                id: allocation.id,
                charity,
                allocation_amount: allocation.allocation_amount,
            });
    }

    let mut views = Vec::with_capacity(plans.len());
    for plan in plans {
        let user = users
            .get(&plan.user_id)
            .cloned()
            .ok_or_else(|| anyhow!("owner {} of plan {} vanished", plan.user_id, plan.id))?;
        let mut charities = by_plan.remove(&plan.id).unwrap_or_default();
        charities.sort_by_key(|a| a.id);
        views.push(PlanView {
            id: plan.id,
            user,
            annual_income: plan.annual_income,
            philanthropy_percentage: plan.philanthropy_percentage,
            total_annual_allocation: plan.total_annual_allocation,
            current_milestone: plan
                .current_milestone_id
                .and_then(|id| milestones.get(&id).cloned()),
            charities,
        });
    }
    Ok(views)
}

pub async fn plan_view(pool: &PgPool, plan: ImpactPlan) -> Result<PlanView> {
    let mut views = plan_views(pool, vec![plan]).await?;
    views
        .pop()
        .ok_or_else(|| anyhow!("plan view expansion produced no rows").into())
}

/// Expand allocation rows with their plan summary and charity.
pub async fn allocation_views(
    pool: &PgPool,
    allocations: Vec<ImpactPlanCharity>,
) -> Result<Vec<AllocationView>> {
    let plan_ids = unique_ids(allocations.iter().map(|a| a.impact_plan_id));
    let plans: HashMap<i64, ImpactPlan> = plan_queries::get_plans_by_ids(pool, &plan_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let charities = charity_map(pool, &unique_ids(allocations.iter().map(|a| a.charity_id))).await?;

    allocations
        .into_iter()
        .map(|allocation| -> Result<AllocationView> {
            let plan = plans.get(&allocation.impact_plan_id).cloned().ok_or_else(|| {
                anyhow!("plan {} of allocation {} vanished", allocation.impact_plan_id, allocation.id)
            })?;
            let charity = charities.get(&allocation.charity_id).cloned().ok_or_else(|| {
                anyhow!("charity {} of allocation {} vanished", allocation.charity_id, allocation.id)
            })?;
            Ok(AllocationView {
                id: allocation.id,
                impact_plan: plan.into(),
                charity,
                allocation_amount: allocation.allocation_amount,
            })
        })
        .collect()
}

pub async fn allocation_view(pool: &PgPool, allocation: ImpactPlanCharity) -> Result<AllocationView> {
    let mut views = allocation_views(pool, vec![allocation]).await?;
    views
        .pop()
        .ok_or_else(|| anyhow!("allocation view expansion produced no rows").into())
}

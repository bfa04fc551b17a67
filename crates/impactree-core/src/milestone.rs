//! Milestone resolution and milestone catalog maintenance.
//!
//! A plan's milestone is derived from its philanthropy percentage at write
//! time: the milestone with the largest `required_percentage` not exceeding
//! the plan's percentage. Milestones are never kept as a linked structure;
//! every resolution re-reads the full set.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgExecutor, PgPool};
use tracing::{debug, info};

use impactree_db::models::Milestone;
use impactree_db::queries::milestones::{self as milestone_queries, MilestoneFields};

use crate::error::{ImpactError, Result};
use crate::fields::{PERCENTAGE_DIGITS, check_decimal, require_non_empty};

/// Pick the milestone with the greatest threshold `<= percentage`.
///
/// Returns `None` when the percentage is below every threshold. Among equal
/// thresholds the last one in `milestones` wins.
pub fn resolve_milestone(milestones: &[Milestone], percentage: Decimal) -> Option<&Milestone> {
    milestones
        .iter()
        .filter(|m| m.required_percentage <= percentage)
        .max_by(|a, b| a.required_percentage.cmp(&b.required_percentage))
}

/// Load every milestone and resolve `percentage` against them.
pub async fn current_milestone_for(
    executor: impl PgExecutor<'_>,
    percentage: Decimal,
) -> Result<Option<Milestone>> {
    let milestones = milestone_queries::list_milestones(executor).await?;
    let resolved = resolve_milestone(&milestones, percentage).cloned();
    debug!(
        %percentage,
        milestone_id = resolved.as_ref().map(|m| m.id),
        "resolved milestone"
    );
    Ok(resolved)
}

/// Write payload for a milestone.
#[derive(Debug, Clone, Deserialize)]
pub struct MilestoneInput {
    pub name: String,
    pub description: String,
    pub required_percentage: Decimal,
    #[serde(default)]
    pub image_url: String,
}

impl MilestoneInput {
    fn validate(&self) -> Result<()> {
        require_non_empty("name", &self.name)?;
        check_decimal("required_percentage", self.required_percentage, PERCENTAGE_DIGITS)
    }

    fn as_fields(&self) -> MilestoneFields<'_> {
        MilestoneFields {
            name: &self.name,
            description: &self.description,
            required_percentage: self.required_percentage,
            image_url: &self.image_url,
        }
    }
}

pub async fn create_milestone(pool: &PgPool, input: &MilestoneInput) -> Result<Milestone> {
    input.validate()?;
    let milestone = milestone_queries::insert_milestone(pool, &input.as_fields()).await?;
    info!(milestone_id = milestone.id, required = %milestone.required_percentage, "milestone created");
    Ok(milestone)
}

pub async fn get_milestone(pool: &PgPool, id: i64) -> Result<Milestone> {
    milestone_queries::get_milestone(pool, id)
        .await?
        .ok_or_else(|| ImpactError::not_found("milestone", id))
}

pub async fn list_milestones(pool: &PgPool) -> Result<Vec<Milestone>> {
    Ok(milestone_queries::list_milestones(pool).await?)
}

/// Replace every field of a milestone. Plans already pointing at it keep
/// their reference even if the new threshold would no longer match.
pub async fn update_milestone(pool: &PgPool, id: i64, input: &MilestoneInput) -> Result<Milestone> {
    input.validate()?;
    let milestone = milestone_queries::update_milestone(pool, id, &input.as_fields())
        .await?
        .ok_or_else(|| ImpactError::not_found("milestone", id))?;
    info!(milestone_id = id, "milestone updated");
    Ok(milestone)
}

pub async fn delete_milestone(pool: &PgPool, id: i64) -> Result<()> {
    if !milestone_queries::delete_milestone(pool, id).await? {
        return Err(ImpactError::not_found("milestone", id));
    }
    info!(milestone_id = id, "milestone deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn milestone(id: i64, required: Decimal) -> Milestone {
        Milestone {
            id,
            name: format!("tier {id}"),
            description: String::new(),
            required_percentage: required,
            image_url: String::new(),
        }
    }

    fn tiers() -> Vec<Milestone> {
        vec![milestone(1, dec!(5.00)), milestone(2, dec!(75.00))]
    }

    #[test]
    fn exact_threshold_matches() {
        let tiers = tiers();
        assert_eq!(resolve_milestone(&tiers, dec!(5.00)).map(|m| m.id), Some(1));
    }

    #[test]
    fn below_every_threshold_is_none() {
        let tiers = tiers();
        assert!(resolve_milestone(&tiers, dec!(4.99)).is_none());
        assert!(resolve_milestone(&tiers, dec!(0)).is_none());
    }

    #[test]
    fn picks_highest_qualifying_threshold() {
        let tiers = tiers();
        assert_eq!(resolve_milestone(&tiers, dec!(100.00)).map(|m| m.id), Some(2));
        assert_eq!(resolve_milestone(&tiers, dec!(74.99)).map(|m| m.id), Some(1));
    }

    #[test]
    fn input_order_does_not_matter() {
        let mut tiers = tiers();
        tiers.reverse();
        assert_eq!(resolve_milestone(&tiers, dec!(80)).map(|m| m.id), Some(2));
    }

    #[test]
    fn empty_catalog_resolves_nothing() {
        assert!(resolve_milestone(&[], dec!(50)).is_none());
    }

    #[test]
    fn percentage_range_is_checked() {
        let mut input = MilestoneInput {
            name: "Gold".into(),
            description: String::new(),
            required_percentage: dec!(999.99),
            image_url: String::new(),
        };
        assert!(input.validate().is_ok());
        input.required_percentage = dec!(1000);
        assert!(matches!(input.validate(), Err(ImpactError::Validation(_))));
        input.required_percentage = dec!(-1);
        assert!(matches!(input.validate(), Err(ImpactError::Validation(_))));
    }
}

//! Database query functions for the `milestones` table.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sqlx::PgExecutor;

use crate::models::Milestone;

/// Every writable column of a milestone.
#[derive(Debug)]
pub struct MilestoneFields<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub required_percentage: Decimal,
    pub image_url: &'a str,
}

pub async fn insert_milestone(
    executor: impl PgExecutor<'_>,
    fields: &MilestoneFields<'_>,
) -> Result<Milestone> {
    let milestone = sqlx::query_as::<_, Milestone>(
        "INSERT INTO milestones (name, description, required_percentage, image_url) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(fields.name)
    .bind(fields.description)
    .bind(fields.required_percentage)
    .bind(fields.image_url)
    .fetch_one(executor)
    .await
    .with_context(|| format!("failed to insert milestone {:?}", fields.name))?;

    Ok(milestone)
}

pub async fn get_milestone(executor: impl PgExecutor<'_>, id: i64) -> Result<Option<Milestone>> {
    let milestone = sqlx::query_as::<_, Milestone>("SELECT * FROM milestones WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("failed to fetch milestone")?;

    Ok(milestone)
}

/// Fetch several milestones at once. Missing IDs are silently skipped.
pub async fn get_milestones_by_ids(
    executor: impl PgExecutor<'_>,
    ids: &[i64],
) -> Result<Vec<Milestone>> {
    let milestones =
        sqlx::query_as::<_, Milestone>("SELECT * FROM milestones WHERE id = ANY($1) ORDER BY id")
            .bind(ids)
            .fetch_all(executor)
            .await
            .context("failed to fetch milestones by id")?;

    Ok(milestones)
}

/// List all milestones in ascending threshold order (ties by id).
pub async fn list_milestones(executor: impl PgExecutor<'_>) -> Result<Vec<Milestone>> {
    let milestones = sqlx::query_as::<_, Milestone>(
        "SELECT * FROM milestones ORDER BY required_percentage ASC, id ASC",
    )
    .fetch_all(executor)
    .await
    .context("failed to list milestones")?;

    Ok(milestones)
}

pub async fn update_milestone(
    executor: impl PgExecutor<'_>,
    id: i64,
    fields: &MilestoneFields<'_>,
) -> Result<Option<Milestone>> {
    let milestone = sqlx::query_as::<_, Milestone>(
        "UPDATE milestones SET \
             name = $2, description = $3, required_percentage = $4, image_url = $5 \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(id)
    .bind(fields.name)
    .bind(fields.description)
    .bind(fields.required_percentage)
    .bind(fields.image_url)
    .fetch_optional(executor)
    .await
    .context("failed to update milestone")?;

    Ok(milestone)
}

/// Delete a milestone. Plans pointing at it fall back to no milestone.
pub async fn delete_milestone(executor: impl PgExecutor<'_>, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM milestones WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .context("failed to delete milestone")?;

    Ok(result.rows_affected() > 0)
}

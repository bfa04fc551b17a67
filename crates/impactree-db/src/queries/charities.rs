//! Database query functions for the `charities` table.

use anyhow::{Context, Result};
use sqlx::PgExecutor;

use crate::models::Charity;

/// Every writable column of a charity. Used for both insert and full update.
#[derive(Debug)]
pub struct CharityFields<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub impact_metric: &'a str,
    pub impact_ratio: f64,
    pub website_url: &'a str,
    pub category_id: Option<i64>,
    pub image_path: Option<&'a str>,
}

pub async fn insert_charity(
    executor: impl PgExecutor<'_>,
    fields: &CharityFields<'_>,
) -> Result<Charity> {
    let charity = sqlx::query_as::<_, Charity>(
        "INSERT INTO charities \
             (name, description, impact_metric, impact_ratio, website_url, category_id, image_path) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING *",
    )
    .bind(fields.name)
    .bind(fields.description)
    .bind(fields.impact_metric)
    .bind(fields.impact_ratio)
    .bind(fields.website_url)
    .bind(fields.category_id)
    .bind(fields.image_path)
    .fetch_one(executor)
    .await
    .with_context(|| format!("failed to insert charity {:?}", fields.name))?;

    Ok(charity)
}

pub async fn get_charity(executor: impl PgExecutor<'_>, id: i64) -> Result<Option<Charity>> {
    let charity = sqlx::query_as::<_, Charity>("SELECT * FROM charities WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("failed to fetch charity")?;

    Ok(charity)
}

/// Fetch several charities at once. Missing IDs are silently skipped.
pub async fn get_charities_by_ids(
    executor: impl PgExecutor<'_>,
    ids: &[i64],
) -> Result<Vec<Charity>> {
    let charities =
        sqlx::query_as::<_, Charity>("SELECT * FROM charities WHERE id = ANY($1) ORDER BY id")
            .bind(ids)
            .fetch_all(executor)
            .await
            .context("failed to fetch charities by id")?;

    Ok(charities)
}

/// Return which of `ids` have no charity row, preserving input order.
pub async fn find_missing_charity_ids(
    executor: impl PgExecutor<'_>,
    ids: &[i64],
) -> Result<Vec<i64>> {
    let missing: Vec<i64> = sqlx::query_scalar(
        "SELECT requested.id \
         FROM UNNEST($1::BIGINT[]) WITH ORDINALITY AS requested(id, ord) \
         WHERE NOT EXISTS (SELECT 1 FROM charities c WHERE c.id = requested.id) \
         ORDER BY requested.ord",
    )
    .bind(ids)
    .fetch_all(executor)
    .await
    .context("failed to check charity ids")?;

    Ok(missing)
}

pub async fn list_charities(executor: impl PgExecutor<'_>) -> Result<Vec<Charity>> {
    let charities = sqlx::query_as::<_, Charity>("SELECT * FROM charities ORDER BY id")
        .fetch_all(executor)
        .await
        .context("failed to list charities")?;

    Ok(charities)
}

/// Overwrite every writable column. Returns `None` when the charity does
/// not exist.
pub async fn update_charity(
    executor: impl PgExecutor<'_>,
    id: i64,
    fields: &CharityFields<'_>,
) -> Result<Option<Charity>> {
    let charity = sqlx::query_as::<_, Charity>(
        "UPDATE charities SET \
             name = $2, description = $3, impact_metric = $4, impact_ratio = $5, \
             website_url = $6, category_id = $7, image_path = $8 \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(id)
    .bind(fields.name)
    .bind(fields.description)
    .bind(fields.impact_metric)
    .bind(fields.impact_ratio)
    .bind(fields.website_url)
    .bind(fields.category_id)
    .bind(fields.image_path)
    .fetch_optional(executor)
    .await
    .context("failed to update charity")?;

    Ok(charity)
}

/// Delete a charity. Allocations that reference it are cascade-deleted.
pub async fn delete_charity(executor: impl PgExecutor<'_>, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM charities WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .context("failed to delete charity")?;

    Ok(result.rows_affected() > 0)
}

//! Database query functions for the `charity_categories` table.

use anyhow::{Context, Result};
use sqlx::PgExecutor;

use crate::models::CharityCategory;

pub async fn insert_category(executor: impl PgExecutor<'_>, name: &str) -> Result<CharityCategory> {
    let category = sqlx::query_as::<_, CharityCategory>(
        "INSERT INTO charity_categories (name) VALUES ($1) RETURNING *",
    )
    .bind(name)
    .fetch_one(executor)
    .await
    .context("failed to insert charity category")?;

    Ok(category)
}

pub async fn get_category(executor: impl PgExecutor<'_>, id: i64) -> Result<Option<CharityCategory>> {
    let category =
        sqlx::query_as::<_, CharityCategory>("SELECT * FROM charity_categories WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
            .context("failed to fetch charity category")?;

    Ok(category)
}

/// Fetch several categories at once. Missing IDs are silently skipped.
pub async fn get_categories_by_ids(
    executor: impl PgExecutor<'_>,
    ids: &[i64],
) -> Result<Vec<CharityCategory>> {
    let categories = sqlx::query_as::<_, CharityCategory>(
        "SELECT * FROM charity_categories WHERE id = ANY($1) ORDER BY id",
    )
    .bind(ids)
    .fetch_all(executor)
    .await
    .context("failed to fetch charity categories by id")?;

    Ok(categories)
}

pub async fn list_categories(executor: impl PgExecutor<'_>) -> Result<Vec<CharityCategory>> {
    let categories =
        sqlx::query_as::<_, CharityCategory>("SELECT * FROM charity_categories ORDER BY id")
            .fetch_all(executor)
            .await
            .context("failed to list charity categories")?;

    Ok(categories)
}

/// Rename a category. Returns `None` when it does not exist.
pub async fn update_category(
    executor: impl PgExecutor<'_>,
    id: i64,
    name: &str,
) -> Result<Option<CharityCategory>> {
    let category = sqlx::query_as::<_, CharityCategory>(
        "UPDATE charity_categories SET name = $2 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(name)
    .fetch_optional(executor)
    .await
    .context("failed to update charity category")?;

    Ok(category)
}

/// Delete a category. Charities in it keep existing with a null category.
pub async fn delete_category(executor: impl PgExecutor<'_>, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM charity_categories WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .context("failed to delete charity category")?;

    Ok(result.rows_affected() > 0)
}

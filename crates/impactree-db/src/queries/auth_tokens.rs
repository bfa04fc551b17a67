//! Database query functions for the `auth_tokens` table.

use anyhow::{Context, Result};
use sqlx::PgExecutor;

use crate::models::{AuthToken, User};

/// Record a new token hash for a user.
pub async fn insert_token(
    executor: impl PgExecutor<'_>,
    user_id: i64,
    token_hash: &str,
) -> Result<AuthToken> {
    let token = sqlx::query_as::<_, AuthToken>(
        "INSERT INTO auth_tokens (token_hash, user_id) VALUES ($1, $2) RETURNING *",
    )
    .bind(token_hash)
    .bind(user_id)
    .fetch_one(executor)
    .await
    .context("failed to insert auth token")?;

    Ok(token)
}

/// Resolve a token hash to the user that owns it.
pub async fn find_user_by_token(
    executor: impl PgExecutor<'_>,
    token_hash: &str,
) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT u.* FROM users u \
         JOIN auth_tokens t ON t.user_id = u.id \
         WHERE t.token_hash = $1",
    )
    .bind(token_hash)
    .fetch_optional(executor)
    .await
    .context("failed to look up auth token")?;

    Ok(user)
}

pub async fn count_tokens_for_user(executor: impl PgExecutor<'_>, user_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM auth_tokens WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(executor)
        .await
        .context("failed to count auth tokens")?;

    Ok(count)
}

//! Database query functions for the `users` table.

use anyhow::{Context, Result};
use sqlx::PgExecutor;

use crate::models::User;

/// Fields required to insert a user.
#[derive(Debug)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password_hash: &'a str,
    pub is_staff: bool,
}

/// Partial user update. `None` leaves the column unchanged.
#[derive(Debug, Default)]
pub struct UserChanges<'a> {
    pub username: Option<&'a str>,
    pub email: Option<&'a str>,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub is_staff: Option<bool>,
}

pub async fn insert_user(executor: impl PgExecutor<'_>, new: &NewUser<'_>) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, email, first_name, last_name, password_hash, is_staff) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING *",
    )
    .bind(new.username)
    .bind(new.email)
    .bind(new.first_name)
    .bind(new.last_name)
    .bind(new.password_hash)
    .bind(new.is_staff)
    .fetch_one(executor)
    .await
    .with_context(|| format!("failed to insert user {:?}", new.username))?;

    Ok(user)
}

pub async fn get_user(executor: impl PgExecutor<'_>, id: i64) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("failed to fetch user")?;

    Ok(user)
}

pub async fn get_user_by_username(
    executor: impl PgExecutor<'_>,
    username: &str,
) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(executor)
        .await
        .context("failed to fetch user by username")?;

    Ok(user)
}

/// Fetch several users at once. Missing IDs are silently skipped.
pub async fn get_users_by_ids(executor: impl PgExecutor<'_>, ids: &[i64]) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ANY($1) ORDER BY id")
        .bind(ids)
        .fetch_all(executor)
        .await
        .context("failed to fetch users by id")?;

    Ok(users)
}

pub async fn list_users(executor: impl PgExecutor<'_>) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id")
        .fetch_all(executor)
        .await
        .context("failed to list users")?;

    Ok(users)
}

/// Take a row lock on a user for the rest of the transaction.
///
/// Returns `false` when the user does not exist. Used to serialize
/// concurrent plan creation for the same owner.
pub async fn lock_user(executor: impl PgExecutor<'_>, id: i64) -> Result<bool> {
    let row: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("failed to lock user")?;

    Ok(row.is_some())
}

/// Apply a partial update. Returns `None` when the user does not exist.
pub async fn update_user(
    executor: impl PgExecutor<'_>,
    id: i64,
    changes: &UserChanges<'_>,
) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET \
             username = COALESCE($2, username), \
             email = COALESCE($3, email), \
             first_name = COALESCE($4, first_name), \
             last_name = COALESCE($5, last_name), \
             is_staff = COALESCE($6, is_staff) \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(id)
    .bind(changes.username)
    .bind(changes.email)
    .bind(changes.first_name)
    .bind(changes.last_name)
    .bind(changes.is_staff)
    .fetch_optional(executor)
    .await
    .context("failed to update user")?;

    Ok(user)
}

/// Delete a user. Tokens and plans go with it via `ON DELETE CASCADE`.
pub async fn delete_user(executor: impl PgExecutor<'_>, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .context("failed to delete user")?;

    Ok(result.rows_affected() > 0)
}

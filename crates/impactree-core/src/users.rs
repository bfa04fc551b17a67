//! User records as seen through the API.

use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;

use impactree_db::models::User;
use impactree_db::queries::users::{self as user_queries, UserChanges};

use crate::auth::{require_self_or_staff, require_staff};
use crate::error::{ImpactError, Result};
use crate::fields::{is_unique_violation, require_non_empty};

/// Partial update of a user. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_staff: Option<bool>,
}

pub async fn list_users(pool: &PgPool) -> Result<Vec<User>> {
    Ok(user_queries::list_users(pool).await?)
}

pub async fn get_user(pool: &PgPool, id: i64) -> Result<User> {
    user_queries::get_user(pool, id)
        .await?
        .ok_or_else(|| ImpactError::not_found("user", id))
}

/// Apply a partial update. Callers may edit only themselves unless they are
/// staff, and only staff may change `is_staff`.
pub async fn update_user(pool: &PgPool, caller: &User, id: i64, update: &UserUpdate) -> Result<User> {
    require_self_or_staff(caller, id)?;
    if update.is_staff.is_some() {
        require_staff(caller)?;
    }
    if let Some(username) = &update.username {
        require_non_empty("username", username)?;
    }

    let changes = UserChanges {
        username: update.username.as_deref(),
        email: update.email.as_deref(),
        first_name: update.first_name.as_deref(),
        last_name: update.last_name.as_deref(),
        is_staff: update.is_staff,
    };
    let user = match user_queries::update_user(pool, id, &changes).await {
        Ok(user) => user.ok_or_else(|| ImpactError::not_found("user", id))?,
        Err(e) if is_unique_violation(&e) => {
            return Err(ImpactError::validation(
                "An account with that username already exists",
            ));
        }
        Err(e) => return Err(e.into()),
    };
    info!(user_id = id, by = caller.id, "user updated");
    Ok(user)
}

/// Delete a user together with their tokens, plan and allocations.
pub async fn delete_user(pool: &PgPool, caller: &User, id: i64) -> Result<()> {
    require_self_or_staff(caller, id)?;
    if !user_queries::delete_user(pool, id).await? {
        return Err(ImpactError::not_found("user", id));
    }
    info!(user_id = id, by = caller.id, "user deleted");
    Ok(())
}

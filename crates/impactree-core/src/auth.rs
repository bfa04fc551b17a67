//! Account access: registration, login and token authentication.
//!
//! Passwords are stored as Argon2 PHC strings. Session tokens are random
//! hex strings handed to the client once; the store only keeps their
//! SHA-256 digest.

use anyhow::{Context, anyhow};
use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{PgExecutor, PgPool};
use tracing::{debug, info, warn};

use impactree_db::models::User;
use impactree_db::queries::{auth_tokens as token_queries, users as user_queries};
use impactree_db::queries::users::NewUser;

use crate::error::{ImpactError, Result};
use crate::fields::{is_unique_violation, require_non_empty};

/// Raw token length in bytes (40 hex characters).
const TOKEN_BYTES: usize = 20;

const REGISTER_FIELDS_MESSAGE: &str =
    "You must provide email, username, password, first_name, and last_name";
const DUPLICATE_USERNAME_MESSAGE: &str = "An account with that username already exists";

pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| anyhow!("failed to encode password salt: {e}"))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("failed to hash password: {e}"))?;
    Ok(hash.to_string())
}

/// Check `password` against a stored PHC string. A malformed stored hash
/// never verifies.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "stored password hash is malformed");
            false
        }
    }
}

pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Digest under which a token is stored.
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Extract the token from an `Authorization` header value. Both
/// `Token <key>` and `Bearer <key>` are accepted.
pub fn parse_authorization(header: &str) -> Option<&str> {
    let (scheme, key) = header.trim().split_once(' ')?;
    let key = key.trim();
    let known = scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer");
    (known && !key.is_empty()).then_some(key)
}

/// A freshly issued token with the user it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

fn required(value: &Option<String>) -> Result<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ImpactError::validation(REGISTER_FIELDS_MESSAGE))
}

async fn issue_token(executor: impl PgExecutor<'_>, user_id: i64) -> Result<String> {
    let token = generate_token();
    token_queries::insert_token(executor, user_id, &token_digest(&token)).await?;
    debug!(user_id, "issued token");
    Ok(token)
}

async fn create_user(pool: &PgPool, new: &NewUser<'_>) -> Result<Session> {
    if user_queries::get_user_by_username(pool, new.username).await?.is_some() {
        return Err(ImpactError::validation(DUPLICATE_USERNAME_MESSAGE));
    }

    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    let user = match user_queries::insert_user(&mut *tx, new).await {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            return Err(ImpactError::validation(DUPLICATE_USERNAME_MESSAGE));
        }
        Err(e) => return Err(e.into()),
    };
    let token = issue_token(&mut *tx, user.id).await?;
    tx.commit().await.context("failed to commit registration")?;

    info!(user_id = user.id, username = %user.username, staff = user.is_staff, "user registered");
    Ok(Session { token, user })
}

/// Create an ordinary account and issue its first token.
pub async fn register(pool: &PgPool, req: &RegisterRequest) -> Result<Session> {
    let username = required(&req.username)?;
    let email = required(&req.email)?;
    let password = required(&req.password)?;
    let first_name = required(&req.first_name)?;
    let last_name = required(&req.last_name)?;

    let password_hash = hash_password(password)?;
    create_user(
        pool,
        &NewUser {
            username,
            email,
            first_name,
            last_name,
            password_hash: &password_hash,
            is_staff: false,
        },
    )
    .await
}

/// Create a privileged account. Used by the operator CLI.
pub async fn create_staff(pool: &PgPool, username: &str, email: &str, password: &str) -> Result<Session> {
    require_non_empty("username", username)?;
    require_non_empty("password", password)?;
    let password_hash = hash_password(password)?;
    create_user(
        pool,
        &NewUser {
            username,
            email,
            first_name: "",
            last_name: "",
            password_hash: &password_hash,
            is_staff: true,
        },
    )
    .await
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Result of a login attempt. Bad credentials are not an error: the client
/// receives `{"valid": false}`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl LoginOutcome {
    fn rejected() -> Self {
        Self {
            valid: false,
            token: None,
            user: None,
        }
    }
}

pub async fn login(pool: &PgPool, req: &LoginRequest) -> Result<LoginOutcome> {
    let Some(user) = user_queries::get_user_by_username(pool, &req.username).await? else {
        debug!(username = %req.username, "login for unknown user");
        return Ok(LoginOutcome::rejected());
    };
    if !verify_password(&req.password, &user.password_hash) {
        debug!(user_id = user.id, "login with wrong password");
        return Ok(LoginOutcome::rejected());
    }

    let token = issue_token(pool, user.id).await?;
    info!(user_id = user.id, "user logged in");
    Ok(LoginOutcome {
        valid: true,
        token: Some(token),
        user: Some(user),
    })
}

/// Resolve a presented token to its user.
pub async fn authenticate(pool: &PgPool, token: &str) -> Result<User> {
    token_queries::find_user_by_token(pool, &token_digest(token))
        .await?
        .ok_or(ImpactError::Unauthorized)
}

pub fn require_staff(caller: &User) -> Result<()> {
    if caller.is_staff {
        Ok(())
    } else {
        Err(ImpactError::forbidden(
            "You do not have permission to perform this action.",
        ))
    }
}

/// Allow the record's owner or a privileged caller.
pub fn require_self_or_staff(caller: &User, owner_id: i64) -> Result<()> {
    if caller.id == owner_id || caller.is_staff {
        Ok(())
    } else {
        Err(ImpactError::forbidden(
            "You do not have permission to perform this action.",
        ))
    }
}

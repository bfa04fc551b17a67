//! `/register`, `/login` and `/users` handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use impactree_core::auth::{self, LoginOutcome, LoginRequest, RegisterRequest, Session};
use impactree_core::users::{self, UserUpdate};
use impactree_db::models::User;

use super::AppState;
use super::error::AppError;
use super::extract::{ApiJson, ApiPath, AuthUser};

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<Json<Session>, AppError> {
    Ok(Json(auth::register(&state.pool, &req).await?))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginOutcome>, AppError> {
    Ok(Json(auth::login(&state.pool, &req).await?))
}

pub async fn list_users(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(users::list_users(&state.pool).await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<User>, AppError> {
    Ok(Json(users::get_user(&state.pool, id).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<UserUpdate>,
) -> Result<Json<User>, AppError> {
    Ok(Json(users::update_user(&state.pool, &caller, id, &update).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    users::delete_user(&state.pool, &caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

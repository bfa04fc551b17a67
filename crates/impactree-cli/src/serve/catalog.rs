//! `/charitycategories`, `/charities` and `/milestones` handlers.
//!
//! Reads are open to anonymous callers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use impactree_core::catalog::{self, CategoryInput, CharityInput};
use impactree_core::milestone::{self, MilestoneInput};
use impactree_core::view::CharityView;
use impactree_db::models::{CharityCategory, Milestone};

use super::AppState;
use super::error::AppError;
use super::extract::{ApiJson, ApiPath, AuthUser};

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CharityCategory>>, AppError> {
    Ok(Json(catalog::list_categories(&state.pool).await?))
}

pub async fn get_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<CharityCategory>, AppError> {
    Ok(Json(catalog::get_category(&state.pool, id).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiJson(input): ApiJson<CategoryInput>,
) -> Result<(StatusCode, Json<CharityCategory>), AppError> {
    let category = catalog::create_category(&state.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<CategoryInput>,
) -> Result<Json<CharityCategory>, AppError> {
    Ok(Json(catalog::update_category(&state.pool, id, &input).await?))
}

pub async fn delete_category(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    catalog::delete_category(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Charities
// ---------------------------------------------------------------------------

pub async fn list_charities(
    State(state): State<AppState>,
) -> Result<Json<Vec<CharityView>>, AppError> {
    Ok(Json(catalog::list_charities(&state.pool).await?))
}

pub async fn get_charity(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<CharityView>, AppError> {
    Ok(Json(catalog::get_charity(&state.pool, id).await?))
}

pub async fn create_charity(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiJson(input): ApiJson<CharityInput>,
) -> Result<(StatusCode, Json<CharityView>), AppError> {
    let charity = catalog::create_charity(&state.pool, &state.media, &caller, &input).await?;
    Ok((StatusCode::CREATED, Json(charity)))
}

pub async fn update_charity(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<CharityInput>,
) -> Result<Json<CharityView>, AppError> {
    let charity = catalog::update_charity(&state.pool, &state.media, &caller, id, &input).await?;
    Ok(Json(charity))
}

pub async fn delete_charity(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    catalog::delete_charity(&state.pool, &state.media, &caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Milestones
// ---------------------------------------------------------------------------

pub async fn list_milestones(
    State(state): State<AppState>,
) -> Result<Json<Vec<Milestone>>, AppError> {
    Ok(Json(milestone::list_milestones(&state.pool).await?))
}

pub async fn get_milestone(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Milestone>, AppError> {
    Ok(Json(milestone::get_milestone(&state.pool, id).await?))
}

pub async fn create_milestone(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiJson(input): ApiJson<MilestoneInput>,
) -> Result<(StatusCode, Json<Milestone>), AppError> {
    let milestone = milestone::create_milestone(&state.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(milestone)))
}

pub async fn update_milestone(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<MilestoneInput>,
) -> Result<Json<Milestone>, AppError> {
    Ok(Json(milestone::update_milestone(&state.pool, id, &input).await?))
}

pub async fn delete_milestone(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    milestone::delete_milestone(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

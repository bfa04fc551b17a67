//! `/impactplans` and `/impactplan_charities` handlers. Every route needs
//! an authenticated caller.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use impactree_core::allocation::{self, AllocationUpdate, NewAllocationRequest};
use impactree_core::plan::service;
use impactree_core::plan::{NewPlanRequest, PlanChanges};
use impactree_core::view::{AllocationView, PlanView};

use super::AppState;
use super::error::AppError;
use super::extract::{ApiJson, ApiPath, AuthUser};

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

pub async fn list_plans(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> Result<Json<Vec<PlanView>>, AppError> {
    Ok(Json(service::list_plans(&state.pool).await?))
}

pub async fn get_plan(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<PlanView>, AppError> {
    Ok(Json(service::get_plan(&state.pool, id).await?))
}

pub async fn create_plan(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiJson(req): ApiJson<NewPlanRequest>,
) -> Result<(StatusCode, Json<PlanView>), AppError> {
    let plan = service::create_plan(&state.pool, &caller, &req).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// Serves both PUT and PATCH; either way only the fields sent are applied.
pub async fn update_plan(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(changes): ApiJson<PlanChanges>,
) -> Result<Json<PlanView>, AppError> {
    Ok(Json(service::update_plan(&state.pool, &caller, id, &changes).await?))
}

pub async fn delete_plan(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    service::delete_plan(&state.pool, &caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Single allocations
// ---------------------------------------------------------------------------

pub async fn list_allocations(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<Json<Vec<AllocationView>>, AppError> {
    Ok(Json(allocation::list_caller_allocations(&state.pool, &caller).await?))
}

pub async fn get_allocation(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<AllocationView>, AppError> {
    Ok(Json(allocation::get_allocation(&state.pool, id).await?))
}

pub async fn create_allocation(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiJson(req): ApiJson<NewAllocationRequest>,
) -> Result<(StatusCode, Json<AllocationView>), AppError> {
    let created = allocation::create_allocation(&state.pool, &caller, &req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_allocation(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<AllocationUpdate>,
) -> Result<Json<AllocationView>, AppError> {
    Ok(Json(
        allocation::update_allocation(&state.pool, &caller, id, &update).await?,
    ))
}

pub async fn delete_allocation(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    allocation::delete_allocation(&state.pool, &caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

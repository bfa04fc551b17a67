//! The `impactree serve` JSON API.

mod accounts;
mod catalog;
mod error;
mod extract;
mod plans;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use impactree_core::media::MediaStore;

/// Request bodies carry base64 images, so allow more than axum's default.
const BODY_LIMIT_BYTES: usize = 8 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub media: MediaStore,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    let media_files = ServeDir::new(state.media.root());

    Router::new()
        .route("/register", post(accounts::register))
        .route("/login", post(accounts::login))
        .route("/users", get(accounts::list_users))
        .route(
            "/users/{id}",
            get(accounts::get_user)
                .put(accounts::update_user)
                .patch(accounts::update_user)
                .delete(accounts::delete_user),
        )
        .route(
            "/charitycategories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/charitycategories/{id}",
            get(catalog::get_category)
                .put(catalog::update_category)
                .delete(catalog::delete_category),
        )
        .route(
            "/charities",
            get(catalog::list_charities).post(catalog::create_charity),
        )
        .route(
            "/charities/{id}",
            get(catalog::get_charity)
                .put(catalog::update_charity)
                .delete(catalog::delete_charity),
        )
        .route(
            "/milestones",
            get(catalog::list_milestones).post(catalog::create_milestone),
        )
        .route(
            "/milestones/{id}",
            get(catalog::get_milestone)
                .put(catalog::update_milestone)
                .delete(catalog::delete_milestone),
        )
        .route(
            "/impactplans",
            get(plans::list_plans).post(plans::create_plan),
        )
        .route(
            "/impactplans/{id}",
            get(plans::get_plan)
                .put(plans::update_plan)
                .patch(plans::update_plan)
                .delete(plans::delete_plan),
        )
        .route(
            "/impactplan_charities",
            get(plans::list_allocations).post(plans::create_allocation),
        )
        .route(
            "/impactplan_charities/{id}",
            get(plans::get_allocation)
                .put(plans::update_allocation)
                .patch(plans::update_allocation)
                .delete(plans::delete_allocation),
        )
        .nest_service("/media", media_files)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    tokio::fs::create_dir_all(state.media.root())
        .await
        .with_context(|| format!("failed to create media root {}", state.media.root().display()))?;

    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {bind}:{port}"))?;
    tracing::info!("impactree serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("impactree serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C; serving until killed");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

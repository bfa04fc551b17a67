//! Query functions, one module per table.
//!
//! Every function takes any [`sqlx::PgExecutor`], so callers can pass either
//! `&PgPool` or `&mut *tx` from an open transaction.

pub mod allocations;
pub mod auth_tokens;
pub mod categories;
pub mod charities;
pub mod impact_plans;
pub mod milestones;
pub mod users;

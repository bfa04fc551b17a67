use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A registered account.
///
/// `password_hash` never leaves the process: it is skipped on serialization.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_staff: bool,
    #[serde(skip_serializing)]
    pub date_joined: DateTime<Utc>,
}

/// An issued session token. Only the SHA-256 of the token is stored.
#[derive(Debug, Clone, FromRow)]
pub struct AuthToken {
    pub token_hash: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CharityCategory {
    pub id: i64,
    pub name: String,
}

/// A charity row. `category_id` is nulled when its category is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Charity {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub impact_metric: String,
    /// Units of impact per dollar.
    pub impact_ratio: f64,
    pub website_url: String,
    pub category_id: Option<i64>,
    /// Path of the stored image relative to the media root.
    pub image_path: Option<String>,
}

/// An achievement tier keyed by a minimum philanthropy percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Milestone {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub required_percentage: Decimal,
    pub image_url: String,
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ImpactPlan {
    pub id: i64,
    pub user_id: i64,
    pub annual_income: Decimal,
    pub philanthropy_percentage: Decimal,
    pub total_annual_allocation: Decimal,
    pub current_milestone_id: Option<i64>,
}

/// One charity's share of a plan's annual budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ImpactPlanCharity {
    pub id: i64,
    pub impact_plan_id: i64,
    pub charity_id: i64,
    pub allocation_amount: Decimal,
}

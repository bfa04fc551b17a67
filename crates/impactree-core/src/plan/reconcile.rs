//! Allocation reconciliation for the nested `charities` payload.
//!
//! Nested writes do not check for a charity appearing twice; only the
//! single-allocation endpoint rejects duplicate pairs.

use sqlx::PgConnection;
use tracing::debug;

use impactree_db::models::ImpactPlanCharity;
use impactree_db::queries::{allocations as allocation_queries, charities as charity_queries};

use super::AllocationEntry;
use crate::error::{ImpactError, Result};

/// Insert one allocation per entry, in payload order.
///
/// Every referenced charity must exist; the first missing id is reported
/// and nothing is inserted.
pub async fn insert_allocations(
    conn: &mut PgConnection,
    plan_id: i64,
    entries: &[AllocationEntry],
) -> Result<Vec<ImpactPlanCharity>> {
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let charity_ids: Vec<i64> = entries.iter().map(|e| e.charity_id).collect();
    let missing = charity_queries::find_missing_charity_ids(&mut *conn, &charity_ids).await?;
    if let Some(&id) = missing.first() {
        return Err(ImpactError::not_found("charity", id));
    }

    let mut created = Vec::with_capacity(entries.len());
    for entry in entries {
        let allocation = allocation_queries::insert_allocation(
            &mut *conn,
            plan_id,
            entry.charity_id,
            entry.allocation_amount,
        )
        .await?;
        created.push(allocation);
    }
    debug!(plan_id, count = created.len(), "inserted allocations");
    Ok(created)
}

/// Replace a plan's allocations wholesale with `entries`.
pub async fn replace_allocations(
    conn: &mut PgConnection,
    plan_id: i64,
    entries: &[AllocationEntry],
) -> Result<Vec<ImpactPlanCharity>> {
    let removed = allocation_queries::delete_allocations_for_plan(&mut *conn, plan_id).await?;
    debug!(plan_id, removed, "cleared allocations");
    insert_allocations(conn, plan_id, entries).await
}

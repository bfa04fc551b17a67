//! Domain logic for impactree: plan lifecycle, allocation reconciliation,
//! milestone resolution, the charity catalog, and account access.

pub mod allocation;
pub mod auth;
pub mod catalog;
pub mod error;
mod fields;
pub mod media;
pub mod milestone;
pub mod plan;
pub mod users;
pub mod view;

pub use error::{ImpactError, Result};

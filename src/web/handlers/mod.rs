//! # Web API Request Handlers
//!
//! HTTP handlers organized by functional area.

pub mod health;
pub mod kitchen;
pub mod orders;

use super::errors::{ApiError, ApiResult};

/// Parse a numeric path identifier, rejecting anything else as a bad request
pub(crate) fn parse_id(raw: &str, field: &str) -> ApiResult<i64> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::bad_request(format!("{field} must be an integer, got '{raw}'")))
}

//! Caller input normalisation
//!
//! Applied at the HTTP boundary, before any query intent reaches the stock service.

use thiserror::Error;

use crate::types::{Pagination, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Malformed caller input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("invalid warehouse code: {0:?}")]
    InvalidWarehouseCode(String),

    #[error("missing article reference")]
    MissingReference,
}

/// Page defaults to 1 and never goes below it; limit defaults to 20 and is clamped to 1..=100
pub fn normalize_pagination(page: Option<u32>, limit: Option<u32>) -> Pagination {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    Pagination::new(page, limit)
}

/// Trimmed search term; absent means empty
pub fn normalize_search(search: Option<&str>) -> String {
    search.map(str::trim).unwrap_or_default().to_string()
}

/// Family code filter; blank means no filter
pub fn normalize_family(family: Option<&str>) -> Option<String> {
    family
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
}

/// Warehouse codes are ERP integers
pub fn parse_warehouse_code(raw: &str) -> Result<i32, InputError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| InputError::InvalidWarehouseCode(raw.to_string()))
}

/// References are matched exactly (case-sensitive), so only emptiness is rejected
pub fn validate_reference(reference: &str) -> Result<&str, InputError> {
    if reference.trim().is_empty() {
        return Err(InputError::MissingReference);
    }
    Ok(reference)
}

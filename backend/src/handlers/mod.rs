//! HTTP handlers
//!
//! Successful bodies share one envelope: `{ "success": true, "data": ..., "meta": ... }`.

use serde::Serialize;
use shared::{PaginatedResponse, PaginationMeta};

pub mod admin;
pub mod articles;
pub mod auth;
pub mod families;
pub mod health;
pub mod warehouses;

pub use admin::{cache_stats, clear_cache};
pub use articles::{article_detail, article_stock, list_articles};
pub use auth::{login, me};
pub use families::list_families;
pub use health::health_check;
pub use warehouses::{list_warehouses, warehouse_stock};

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PaginationMeta>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            meta: None,
        }
    }
}

/// Query-string flag: a default-off flag is on only for `true`, a default-on flag
/// is off only for `false`.
pub fn flag(value: Option<&str>, default: bool) -> bool {
    match value.map(str::trim) {
        None => default,
        Some(v) if default => v != "false",
        Some(v) => v == "true",
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn page(page: PaginatedResponse<T>) -> Self {
        Self {
            success: true,
            data: page.data,
            meta: Some(page.meta),
        }
    }
}

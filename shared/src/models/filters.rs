//! Query intents for the stock listings
//!
//! Every field that can change a result lives here, so the `Debug` rendering of a
//! filter is a complete cache key.

use serde::{Deserialize, Serialize};

use crate::types::Pagination;

/// Filters for the article listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArticleFilters {
    /// Case-insensitive "contains" on reference and designation; empty means no filter
    pub search: String,
    /// Exact family code
    pub family: Option<String>,
    /// Aggregate on-hand quantity strictly positive
    pub has_stock: bool,
    /// Aggregate only the reference warehouse (implies `has_stock`)
    pub reference_warehouse_only: bool,
    /// Reference warehouse line at or under its threshold
    pub low_stock_only: bool,
    pub pagination: Pagination,
}

impl ArticleFilters {
    /// Whether the positive-stock predicate applies
    pub fn requires_stock(&self) -> bool {
        self.has_stock || self.reference_warehouse_only
    }
}

/// Filters for one warehouse's stock listing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WarehouseStockFilters {
    pub search: String,
    /// On-hand quantity at this warehouse strictly positive
    pub has_stock: bool,
    pub pagination: Pagination,
}

impl Default for WarehouseStockFilters {
    fn default() -> Self {
        Self {
            search: String::new(),
            has_stock: true,
            pagination: Pagination::default(),
        }
    }
}

/// Options for the article detail lookup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetailOptions {
    /// Skip the cache read (the result is still cached)
    pub fresh: bool,
}

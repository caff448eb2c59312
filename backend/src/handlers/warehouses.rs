//! HTTP handlers for warehouse (dépôt) endpoints

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use shared::{
    normalize_pagination, normalize_search, parse_warehouse_code, PaginationMeta, Warehouse,
    WarehouseStockFilters, WarehouseStockItem, WarehouseWithStats,
};

use super::{flag, ApiResponse};
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct WarehouseListQuery {
    pub stats: Option<String>,
}

/// Either listing shape, depending on `stats`
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WarehouseList {
    Plain(Vec<Warehouse>),
    WithStats(Vec<WarehouseWithStats>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseStockQuery {
    pub search: Option<String>,
    pub has_stock: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl WarehouseStockQuery {
    pub fn into_filters(self) -> WarehouseStockFilters {
        WarehouseStockFilters {
            search: normalize_search(self.search.as_deref()),
            has_stock: flag(self.has_stock.as_deref(), true),
            pagination: normalize_pagination(self.page, self.limit),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WarehouseStockResponse {
    pub success: bool,
    #[serde(rename = "depot")]
    pub warehouse: Warehouse,
    pub data: Vec<WarehouseStockItem>,
    pub meta: PaginationMeta,
}

/// List warehouses, with statistics unless `stats=false`
pub async fn list_warehouses(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    query: Result<Query<WarehouseListQuery>, QueryRejection>,
) -> AppResult<Json<ApiResponse<WarehouseList>>> {
    let Query(query) = query?;
    let list = if flag(query.stats.as_deref(), true) {
        WarehouseList::WithStats(state.stock.list_warehouses_with_stats().await)
    } else {
        WarehouseList::Plain(state.stock.list_warehouses().await)
    };
    Ok(Json(ApiResponse::ok(list)))
}

/// One warehouse's stock
pub async fn warehouse_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(code): Path<String>,
    query: Result<Query<WarehouseStockQuery>, QueryRejection>,
) -> AppResult<Json<WarehouseStockResponse>> {
    let code = parse_warehouse_code(&code)?;
    let Query(query) = query?;
    let filters = query.into_filters();

    let result = state.stock.warehouse_stock(code, &filters).await?;
    Ok(Json(WarehouseStockResponse {
        success: true,
        warehouse: result.warehouse,
        data: result.page.data,
        meta: result.page.meta,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_listing_defaults_to_positive_stock() {
        let filters = WarehouseStockQuery::default().into_filters();
        assert!(filters.has_stock);
        assert_eq!(filters, WarehouseStockFilters::default());

        let query = WarehouseStockQuery {
            has_stock: Some("false".into()),
            search: Some("  abc ".into()),
            ..Default::default()
        };
        let filters = query.into_filters();
        assert!(!filters.has_stock);
        assert_eq!(filters.search, "abc");
    }
}

//! HTTP handlers for article endpoints

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shared::{
    normalize_family, normalize_pagination, normalize_search, validate_reference, Article,
    ArticleDetail, ArticleFilters, ArticleWithStock, DetailOptions, UserRole, WarehouseStockLine,
};

use super::{flag, ApiResponse};
use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleQuery {
    pub search: Option<String>,
    pub famille: Option<String>,
    pub has_stock: Option<String>,
    #[serde(alias = "referenceWarehouseOnly")]
    pub gennevilliers_only: Option<String>,
    pub low_stock_only: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ArticleQuery {
    pub fn into_filters(self) -> ArticleFilters {
        ArticleFilters {
            search: normalize_search(self.search.as_deref()),
            family: normalize_family(self.famille.as_deref()),
            has_stock: flag(self.has_stock.as_deref(), false),
            reference_warehouse_only: flag(self.gennevilliers_only.as_deref(), false),
            low_stock_only: flag(self.low_stock_only.as_deref(), false),
            pagination: normalize_pagination(self.page, self.limit),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DetailQuery {
    pub fresh: Option<String>,
}

/// Article as shown to a given role: costs stripped for standard users, margins
/// added for administrators.
#[derive(Debug, Serialize)]
pub struct ArticleView<T> {
    #[serde(flatten)]
    pub item: T,
    #[serde(rename = "marge", skip_serializing_if = "Option::is_none")]
    pub margin: Option<Decimal>,
    #[serde(rename = "tauxMarge", skip_serializing_if = "Option::is_none")]
    pub margin_rate: Option<Decimal>,
}

/// Margin and margin rate (percent, one decimal; only when the purchase price is positive)
pub fn margin(sale: Decimal, purchase: Decimal) -> (Decimal, Option<Decimal>) {
    let margin = sale - purchase;
    let rate = (purchase > Decimal::ZERO)
        .then(|| (margin / purchase * Decimal::ONE_HUNDRED).round_dp(1));
    (margin, rate)
}

fn present_costs(article: &mut Article, role: UserRole) -> (Option<Decimal>, Option<Decimal>) {
    if !role.can_see_costs() {
        article.purchase_price = None;
        return (None, None);
    }
    match article.purchase_price {
        Some(purchase) => {
            let (m, rate) = margin(article.sale_price, purchase);
            (Some(m), rate)
        }
        None => (None, None),
    }
}

pub fn present_article(mut item: ArticleWithStock, role: UserRole) -> ArticleView<ArticleWithStock> {
    let (margin, margin_rate) = present_costs(&mut item.article, role);
    ArticleView {
        item,
        margin,
        margin_rate,
    }
}

pub fn present_detail(mut detail: ArticleDetail, role: UserRole) -> ArticleView<ArticleDetail> {
    let (margin, margin_rate) = present_costs(&mut detail.summary.article, role);
    if !role.can_see_costs() {
        detail.last_purchase_price = None;
    }
    ArticleView {
        item: detail,
        margin,
        margin_rate,
    }
}

/// Per-warehouse breakdown of one article
#[derive(Debug, Serialize)]
pub struct ArticleStockView {
    pub reference: String,
    pub designation: String,
    #[serde(rename = "stockTotal")]
    pub on_hand: Decimal,
    #[serde(rename = "stockDisponible")]
    pub available: Decimal,
    #[serde(rename = "stockParDepot")]
    pub lines: Vec<WarehouseStockLine>,
}

/// List articles with their aggregate stock
pub async fn list_articles(
    State(state): State<AppState>,
    current_user: CurrentUser,
    query: Result<Query<ArticleQuery>, QueryRejection>,
) -> AppResult<Json<ApiResponse<Vec<ArticleView<ArticleWithStock>>>>> {
    let Query(query) = query?;
    let filters = query.into_filters();
    let page = state.stock.list_articles(&filters).await;

    let role = current_user.role();
    let page = shared::PaginatedResponse {
        data: page
            .data
            .into_iter()
            .map(|item| present_article(item, role))
            .collect(),
        meta: page.meta,
    };
    Ok(Json(ApiResponse::page(page)))
}

/// Article detail with per-warehouse stock
pub async fn article_detail(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(reference): Path<String>,
    query: Result<Query<DetailQuery>, QueryRejection>,
) -> AppResult<Json<ApiResponse<ArticleView<ArticleDetail>>>> {
    let Query(query) = query?;
    let reference = validate_reference(&reference)?;
    let options = DetailOptions {
        fresh: flag(query.fresh.as_deref(), false),
    };

    let detail = state
        .stock
        .article_detail(reference, options)
        .await
        .ok_or_else(|| AppError::NotFound("Article".to_string()))?;
    Ok(Json(ApiResponse::ok(present_detail(detail, current_user.role()))))
}

/// Stock breakdown of one article
pub async fn article_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(reference): Path<String>,
) -> AppResult<Json<ApiResponse<ArticleStockView>>> {
    let reference = validate_reference(&reference)?;
    let detail = state
        .stock
        .article_detail(reference, DetailOptions::default())
        .await
        .ok_or_else(|| AppError::NotFound("Article".to_string()))?;

    let summary = detail.summary;
    Ok(Json(ApiResponse::ok(ArticleStockView {
        reference: summary.article.reference,
        designation: summary.article.designation,
        on_hand: summary.stock.on_hand,
        available: summary.stock.available,
        lines: detail.lines,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Pagination, StockLevel, StockTotals};

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn item() -> ArticleWithStock {
        ArticleWithStock {
            article: Article {
                reference: "A1".into(),
                designation: "Café".into(),
                family: "BOIS".into(),
                family_name: None,
                purchase_price: Some(d(3)),
                sale_price: d(4),
                unit: "PCE".into(),
                barcode: None,
                active: true,
            },
            stock: StockTotals::new(d(10), d(0)),
            level: StockLevel::Normal,
            min_threshold: None,
        }
    }

    #[test]
    fn users_never_see_purchase_prices() {
        let json = serde_json::to_value(present_article(item(), UserRole::User)).unwrap();
        assert!(json.get("prixAchat").is_none());
        assert!(json.get("marge").is_none());
        assert_eq!(json["prixVente"], 4.0);
    }

    #[test]
    fn admins_get_margins() {
        let json = serde_json::to_value(present_article(item(), UserRole::Admin)).unwrap();
        assert_eq!(json["prixAchat"], 3.0);
        assert_eq!(json["marge"], 1.0);
        assert_eq!(json["tauxMarge"], 33.3);
    }

    #[test]
    fn margin_rate_needs_a_purchase_price() {
        assert_eq!(margin(d(5), d(0)), (d(5), None));
    }

    #[test]
    fn query_defaults_and_alias() {
        let filters = ArticleQuery::default().into_filters();
        assert_eq!(filters.pagination, Pagination::new(1, 20));
        assert!(!filters.reference_warehouse_only);

        let query: ArticleQuery =
            serde_json::from_str(r#"{"referenceWarehouseOnly": "true", "limit": 500}"#).unwrap();
        let filters = query.into_filters();
        assert!(filters.reference_warehouse_only);
        assert_eq!(filters.pagination.limit, 100);
    }
}

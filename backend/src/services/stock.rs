//! Stock aggregation service
//!
//! Composes ERP reads into the views the front-end consumes, classifies stock
//! levels and fronts every read with the result cache. ERP failures never escape:
//! they are logged and degrade to an empty list or a missing article.

use std::sync::Arc;

use thiserror::Error;

use shared::{
    default_warehouse_name, effective_purchase_price, is_reference_warehouse, Article,
    ArticleDetail, ArticleFilters, ArticleWithStock, DetailOptions, ExclusionRules, Family,
    PaginatedResponse, ReferenceStock, StockLevel, StockTotals, Warehouse, WarehouseStockFilters,
    WarehouseStockItem, WarehouseStockLine, WarehouseWithStats, KLY_EXCLUSIONS,
};

use crate::cache::{cache_key, CacheStats, ResultCache};
use crate::erp::{ArticleRow, ArticleStockRow, SourceError, StockLineRow, StockSource};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StockError {
    #[error("warehouse {0} not found")]
    NotFound(i32),
}

/// One page of a warehouse's stock, with the warehouse it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct WarehouseStockPage {
    pub warehouse: Warehouse,
    pub page: PaginatedResponse<WarehouseStockItem>,
}

#[derive(Clone)]
pub struct StockService {
    source: Arc<dyn StockSource>,
    cache: ResultCache,
    rules: ExclusionRules,
}

fn log_degraded(operation: &'static str, err: &SourceError) {
    match err {
        SourceError::Configuration => {
            tracing::warn!(operation, error = %err, "ERP unavailable, degrading")
        }
        _ => tracing::error!(operation, error = %err, "ERP read failed, degrading"),
    }
}

impl StockService {
    pub fn new(source: Arc<dyn StockSource>, cache: ResultCache) -> Self {
        Self {
            source,
            cache,
            rules: KLY_EXCLUSIONS,
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Whether the ERP currently answers
    pub async fn is_available(&self) -> bool {
        match self.source.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "ERP ping failed");
                false
            }
        }
    }

    pub async fn list_warehouses(&self) -> Vec<Warehouse> {
        let key = "depots:all";
        if let Some(hit) = self.cache.get::<Vec<Warehouse>>(key) {
            return hit;
        }
        match self.source.warehouses().await {
            Ok(warehouses) => {
                self.cache.set(key, warehouses.clone());
                warehouses
            }
            Err(e) => {
                log_degraded("list_warehouses", &e);
                Vec::new()
            }
        }
    }

    pub async fn list_warehouses_with_stats(&self) -> Vec<WarehouseWithStats> {
        let key = "depots:stats";
        if let Some(hit) = self.cache.get::<Vec<WarehouseWithStats>>(key) {
            return hit;
        }
        match self.source.warehouses_with_stats().await {
            Ok(warehouses) => {
                self.cache.set(key, warehouses.clone());
                warehouses
            }
            Err(e) => {
                log_degraded("list_warehouses_with_stats", &e);
                Vec::new()
            }
        }
    }

    /// Non-excluded warehouse by code
    pub async fn find_warehouse(&self, code: i32) -> Option<Warehouse> {
        self.list_warehouses()
            .await
            .into_iter()
            .find(|w| w.code == code)
    }

    pub async fn list_articles(&self, filters: &ArticleFilters) -> PaginatedResponse<ArticleWithStock> {
        let key = cache_key("articles", filters);
        if let Some(hit) = self.cache.get::<PaginatedResponse<ArticleWithStock>>(&key) {
            return hit;
        }
        match self.source.articles(filters).await {
            Ok(rows) => {
                let data = rows.rows.into_iter().map(article_with_stock).collect();
                let response = PaginatedResponse::new(data, rows.total, filters.pagination);
                self.cache.set(key, response.clone());
                response
            }
            Err(e) => {
                log_degraded("list_articles", &e);
                PaginatedResponse::empty(filters.pagination)
            }
        }
    }

    /// Full detail of one article; `fresh` skips the cache read but still refreshes
    /// the entry.
    pub async fn article_detail(
        &self,
        reference: &str,
        options: DetailOptions,
    ) -> Option<ArticleDetail> {
        if reference.is_empty() {
            return None;
        }
        let key = cache_key("article:detail", &reference);
        if !options.fresh {
            if let Some(hit) = self.cache.get::<ArticleDetail>(&key) {
                return Some(hit);
            }
        }
        match self.load_detail(reference).await {
            Ok(Some(detail)) => {
                self.cache.set(key, detail.clone());
                Some(detail)
            }
            Ok(None) => None,
            Err(e) => {
                log_degraded("article_detail", &e);
                None
            }
        }
    }

    async fn load_detail(&self, reference: &str) -> Result<Option<ArticleDetail>, SourceError> {
        let Some(row) = self.source.article(reference).await? else {
            return Ok(None);
        };
        if self
            .rules
            .excludes_family(&row.family_code, row.family_name.as_deref())
        {
            return Ok(None);
        }

        let (lines, last_price) = tokio::try_join!(
            self.source.article_stock_lines(reference),
            self.source.last_purchase_price(reference),
        )?;

        let reference_stock = reference_line(&lines);
        let lines: Vec<WarehouseStockLine> = lines.into_iter().map(stock_line).collect();
        let stock = StockTotals::from_lines(&lines);
        let level = StockLevel::for_article(stock.on_hand, reference_stock);
        let purchase_price = effective_purchase_price(row.purchase_price, last_price);

        Ok(Some(ArticleDetail {
            summary: ArticleWithStock {
                article: Article {
                    purchase_price: Some(purchase_price),
                    ..article(row)
                },
                stock,
                level,
                min_threshold: reference_stock.and_then(|r| r.published_threshold()),
            },
            last_purchase_price: last_price,
            lines,
        }))
    }

    /// Stock held by one warehouse; unknown or excluded codes are `NotFound`
    pub async fn warehouse_stock(
        &self,
        code: i32,
        filters: &WarehouseStockFilters,
    ) -> Result<WarehouseStockPage, StockError> {
        let warehouse = self
            .find_warehouse(code)
            .await
            .ok_or(StockError::NotFound(code))?;

        let key = cache_key("depot:stock", &(code, filters));
        if let Some(page) = self.cache.get::<PaginatedResponse<WarehouseStockItem>>(&key) {
            return Ok(WarehouseStockPage { warehouse, page });
        }

        let page = match self.source.warehouse_stock(code, filters).await {
            Ok(rows) => {
                let page = PaginatedResponse::new(rows.rows, rows.total, filters.pagination);
                self.cache.set(key, page.clone());
                page
            }
            Err(e) => {
                log_degraded("warehouse_stock", &e);
                PaginatedResponse::empty(filters.pagination)
            }
        };
        Ok(WarehouseStockPage { warehouse, page })
    }

    pub async fn list_families(&self) -> Vec<Family> {
        let key = "familles:all";
        if let Some(hit) = self.cache.get::<Vec<Family>>(key) {
            return hit;
        }
        match self.source.families().await {
            Ok(families) => {
                self.cache.set(key, families.clone());
                families
            }
            Err(e) => {
                log_degraded("list_families", &e);
                Vec::new()
            }
        }
    }
}

fn article(row: ArticleRow) -> Article {
    Article {
        reference: row.reference,
        designation: row.designation,
        family: row.family_code,
        family_name: row.family_name,
        purchase_price: Some(row.purchase_price),
        sale_price: row.sale_price,
        unit: row.unit,
        barcode: row.barcode,
        active: !row.dormant,
    }
}

fn article_with_stock(row: ArticleStockRow) -> ArticleWithStock {
    ArticleWithStock {
        level: StockLevel::for_article(row.on_hand, row.reference),
        min_threshold: row.reference.and_then(|r| r.published_threshold()),
        stock: StockTotals::new(row.on_hand, row.reserved),
        article: article(row.article),
    }
}

fn stock_line(row: StockLineRow) -> WarehouseStockLine {
    WarehouseStockLine::new(
        row.warehouse_code,
        row.warehouse_name
            .unwrap_or_else(|| default_warehouse_name(row.warehouse_code)),
        row.on_hand,
        row.reserved,
        row.min_threshold,
    )
}

// Reference-warehouse view of an article's lines: summed on-hand, largest threshold.
fn reference_line(lines: &[StockLineRow]) -> Option<ReferenceStock> {
    lines
        .iter()
        .filter(|l| {
            l.warehouse_name
                .as_deref()
                .map(is_reference_warehouse)
                .unwrap_or(false)
        })
        .fold(None, |acc: Option<ReferenceStock>, l| {
            let r = acc.unwrap_or_default();
            Some(ReferenceStock::new(
                r.on_hand + l.on_hand,
                r.threshold.max(l.min_threshold),
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn line(code: i32, name: &str, on_hand: i64, threshold: i64) -> StockLineRow {
        StockLineRow {
            warehouse_code: code,
            warehouse_name: Some(name.to_string()),
            principal: false,
            on_hand: Decimal::from(on_hand),
            reserved: Decimal::ZERO,
            min_threshold: Decimal::from(threshold),
        }
    }

    #[test]
    fn reference_line_only_reads_the_reference_warehouse() {
        let lines = vec![
            line(1, "KLY Gennevilliers", 3, 10),
            line(2, "KLY LYON", 500, 1),
        ];
        assert_eq!(
            reference_line(&lines),
            Some(ReferenceStock::new(Decimal::from(3), Decimal::from(10)))
        );
        assert_eq!(reference_line(&lines[1..]), None);
    }

    #[test]
    fn unnamed_lines_get_a_default_name() {
        let mut row = line(9, "", 1, 0);
        row.warehouse_name = None;
        assert_eq!(stock_line(row).warehouse_name, "Dépôt 9");
    }
}

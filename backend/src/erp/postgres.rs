//! PostgreSQL read replica of the Sage tables

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use shared::{
    default_warehouse_name, ArticleFilters, ArticleSummary, ExclusionRules, Family,
    ReferenceStock, Warehouse, WarehouseStockFilters, WarehouseStockItem, WarehouseWithStats,
    DEFAULT_UNIT, KLY_EXCLUSIONS,
};

use super::query::{
    self, ArticleRecord, ArticleStockRecord, FamilyRecord, StockLineRecord, WarehouseRecord,
    WarehouseStatsRecord, WarehouseStockRecord,
};
use super::{
    clean, trimmed, ArticleRow, ArticleStockRow, RowPage, SourceError, SourceResult,
    StockLineRow, StockSource,
};
use crate::config::ErpConfig;

pub struct PgStockSource {
    pool: PgPool,
    request_timeout: Duration,
    rules: ExclusionRules,
}

impl PgStockSource {
    /// Connections are opened on first use, so an unreachable replica does not
    /// prevent startup.
    pub fn new(config: &ErpConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .options([("statement_timeout", config.request_timeout_ms.to_string())]);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout())
            .idle_timeout(config.idle_timeout())
            .connect_lazy_with(options);

        Self::with_pool(pool, config.request_timeout())
    }

    pub fn with_pool(pool: PgPool, request_timeout: Duration) -> Self {
        Self {
            pool,
            request_timeout,
            rules: KLY_EXCLUSIONS,
        }
    }

    async fn timed<T, F>(&self, fut: F) -> SourceResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
    {
        match tokio::time::timeout(self.request_timeout, fut).await {
            Ok(result) => result.map_err(SourceError::from),
            Err(_) => Err(SourceError::Timeout),
        }
    }

    async fn count(&self, mut qb: query::PgQuery) -> SourceResult<u64> {
        let (total,): (i64,) = self
            .timed(qb.build_query_as::<(i64,)>().fetch_one(&self.pool))
            .await?;
        Ok(u64::try_from(total).unwrap_or_default())
    }
}

#[async_trait]
impl StockSource for PgStockSource {
    async fn ping(&self) -> SourceResult<()> {
        let mut qb = query::ping();
        self.timed(qb.build().execute(&self.pool)).await?;
        Ok(())
    }

    async fn warehouses(&self) -> SourceResult<Vec<Warehouse>> {
        let mut qb = query::select_warehouses(&self.rules);
        let records: Vec<WarehouseRecord> = self
            .timed(qb.build_query_as::<WarehouseRecord>().fetch_all(&self.pool))
            .await?;
        Ok(records.into_iter().map(Warehouse::from).collect())
    }

    async fn warehouses_with_stats(&self) -> SourceResult<Vec<WarehouseWithStats>> {
        let mut qb = query::select_warehouses_with_stats(&self.rules);
        let records: Vec<WarehouseStatsRecord> = self
            .timed(qb.build_query_as::<WarehouseStatsRecord>().fetch_all(&self.pool))
            .await?;
        Ok(records
            .into_iter()
            .map(|r| WarehouseWithStats {
                warehouse: r.warehouse.into(),
                article_count: r.article_count,
                stock_value: r.stock_value,
            })
            .collect())
    }

    async fn articles(&self, filters: &ArticleFilters) -> SourceResult<RowPage<ArticleStockRow>> {
        let total = self.count(query::count_articles(filters, &self.rules)).await?;
        if total == 0 {
            return Ok(RowPage::empty());
        }

        let mut qb = query::select_articles(filters, &self.rules);
        let records: Vec<ArticleStockRecord> = self
            .timed(qb.build_query_as::<ArticleStockRecord>().fetch_all(&self.pool))
            .await?;
        Ok(RowPage::new(
            total,
            records.into_iter().map(ArticleStockRow::from).collect(),
        ))
    }

    async fn article(&self, reference: &str) -> SourceResult<Option<ArticleRow>> {
        let mut qb = query::select_article(reference);
        let record: Option<ArticleRecord> = self
            .timed(qb.build_query_as::<ArticleRecord>().fetch_optional(&self.pool))
            .await?;
        Ok(record.map(ArticleRow::from))
    }

    async fn article_stock_lines(&self, reference: &str) -> SourceResult<Vec<StockLineRow>> {
        let mut qb = query::select_article_stock_lines(reference, &self.rules);
        let records: Vec<StockLineRecord> = self
            .timed(qb.build_query_as::<StockLineRecord>().fetch_all(&self.pool))
            .await?;
        Ok(records
            .into_iter()
            .map(|r| StockLineRow {
                warehouse_code: r.warehouse_code,
                warehouse_name: clean(r.warehouse_name),
                principal: r.principal,
                on_hand: r.on_hand,
                reserved: r.reserved,
                min_threshold: r.min_threshold,
            })
            .collect())
    }

    async fn last_purchase_price(&self, reference: &str) -> SourceResult<Option<Decimal>> {
        let mut qb = query::select_last_purchase_price(reference);
        let price: Option<(Decimal,)> = self
            .timed(qb.build_query_as::<(Decimal,)>().fetch_optional(&self.pool))
            .await?;
        Ok(price.map(|(p,)| p))
    }

    async fn warehouse_stock(
        &self,
        code: i32,
        filters: &WarehouseStockFilters,
    ) -> SourceResult<RowPage<WarehouseStockItem>> {
        let total = self
            .count(query::count_warehouse_stock(code, filters, &self.rules))
            .await?;
        if total == 0 {
            return Ok(RowPage::empty());
        }

        let mut qb = query::select_warehouse_stock(code, filters, &self.rules);
        let records: Vec<WarehouseStockRecord> = self
            .timed(qb.build_query_as::<WarehouseStockRecord>().fetch_all(&self.pool))
            .await?;
        Ok(RowPage::new(
            total,
            records.into_iter().map(WarehouseStockItem::from).collect(),
        ))
    }

    async fn families(&self) -> SourceResult<Vec<Family>> {
        let mut qb = query::select_families(&self.rules);
        let records: Vec<FamilyRecord> = self
            .timed(qb.build_query_as::<FamilyRecord>().fetch_all(&self.pool))
            .await?;
        Ok(records
            .into_iter()
            .map(|r| Family {
                name: clean(r.name).unwrap_or_else(|| r.code.clone()),
                code: r.code,
            })
            .collect())
    }
}

impl From<ArticleRecord> for ArticleRow {
    fn from(r: ArticleRecord) -> Self {
        Self {
            reference: r.reference.trim().to_string(),
            designation: trimmed(r.designation),
            family_code: trimmed(r.family_code),
            family_name: clean(r.family_name),
            purchase_price: r.purchase_price.unwrap_or_default(),
            sale_price: r.sale_price.unwrap_or_default(),
            unit: clean(r.unit).unwrap_or_else(|| DEFAULT_UNIT.to_string()),
            barcode: clean(r.barcode),
            dormant: r.dormant.unwrap_or(0) != 0,
        }
    }
}

impl From<ArticleStockRecord> for ArticleStockRow {
    fn from(r: ArticleStockRecord) -> Self {
        let reference = r
            .ref_on_hand
            .map(|on_hand| ReferenceStock::new(on_hand, r.ref_threshold.unwrap_or_default()));
        Self {
            article: r.article.into(),
            on_hand: r.on_hand,
            reserved: r.reserved,
            reference,
        }
    }
}

impl From<WarehouseRecord> for Warehouse {
    fn from(r: WarehouseRecord) -> Self {
        Self {
            name: clean(r.name).unwrap_or_else(|| default_warehouse_name(r.code)),
            code: r.code,
            address: clean(r.address),
            postal_code: clean(r.postal_code),
            city: clean(r.city),
            principal: r.principal,
        }
    }
}

impl From<WarehouseStockRecord> for WarehouseStockItem {
    fn from(r: WarehouseStockRecord) -> Self {
        Self {
            article: ArticleSummary {
                reference: r.reference.trim().to_string(),
                designation: trimmed(r.designation),
                family: trimmed(r.family_code),
            },
            on_hand: r.on_hand,
            reserved: r.reserved,
            available: shared::available_quantity(r.on_hand, r.reserved),
            sale_price: r.sale_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_columns_become_defaults() {
        let row = ArticleRow::from(ArticleRecord {
            reference: "  ABC1 ".into(),
            designation: Some("Thé vert   ".into()),
            family_code: None,
            family_name: Some("   ".into()),
            purchase_price: None,
            sale_price: Some(Decimal::from(4)),
            unit: Some(" ".into()),
            barcode: None,
            dormant: Some(1),
        });
        assert_eq!(row.reference, "ABC1");
        assert_eq!(row.designation, "Thé vert");
        assert_eq!(row.family_code, "");
        assert_eq!(row.family_name, None);
        assert_eq!(row.unit, DEFAULT_UNIT);
        assert!(row.dormant);
    }

    #[test]
    fn unnamed_warehouse_gets_default_name() {
        let warehouse = Warehouse::from(WarehouseRecord {
            code: 7,
            name: None,
            address: Some("".into()),
            postal_code: None,
            city: Some(" Gennevilliers ".into()),
            principal: false,
        });
        assert_eq!(warehouse.name, "Dépôt 7");
        assert_eq!(warehouse.address, None);
        assert_eq!(warehouse.city.as_deref(), Some("Gennevilliers"));
    }
}

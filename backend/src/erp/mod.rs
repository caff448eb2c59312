//! Read access to the Sage ERP
//!
//! The stock service talks to the ERP through [`StockSource`]. Every implementation
//! applies the exclusion rules itself, so nothing a caller passes can surface an
//! excluded warehouse or family.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use shared::{
    ArticleFilters, Family, ReferenceStock, Warehouse, WarehouseStockFilters, WarehouseStockItem,
    WarehouseWithStats,
};

use crate::config::{ErpConfig, ErpSourceKind};

pub mod postgres;
pub mod query;
pub mod snapshot;

pub use postgres::PgStockSource;
pub use snapshot::{ErpSnapshot, SnapshotSource};

/// Failures reaching or reading the ERP
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("ERP not configured")]
    Configuration,

    #[error("ERP connection failed: {0}")]
    Connection(String),

    #[error("ERP request timed out")]
    Timeout,

    #[error("ERP query failed: {0}")]
    Query(sqlx::Error),

    #[error("ERP snapshot unreadable: {0}")]
    Snapshot(String),
}

impl From<sqlx::Error> for SourceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => SourceError::Connection("pool timed out".into()),
            sqlx::Error::Io(e) => SourceError::Connection(e.to_string()),
            sqlx::Error::Tls(e) => SourceError::Connection(e.to_string()),
            sqlx::Error::PoolClosed => SourceError::Connection("pool closed".into()),
            other => SourceError::Query(other),
        }
    }
}

pub type SourceResult<T> = Result<T, SourceError>;

/// One page of rows plus the row count for the whole filter set
#[derive(Debug, Clone, PartialEq)]
pub struct RowPage<T> {
    pub total: u64,
    pub rows: Vec<T>,
}

impl<T> RowPage<T> {
    pub fn new(total: u64, rows: Vec<T>) -> Self {
        Self { total, rows }
    }

    pub fn empty() -> Self {
        Self::new(0, Vec::new())
    }
}

/// Article master record as stored by the ERP
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleRow {
    pub reference: String,
    pub designation: String,
    pub family_code: String,
    pub family_name: Option<String>,
    pub purchase_price: Decimal,
    pub sale_price: Decimal,
    pub unit: String,
    pub barcode: Option<String>,
    pub dormant: bool,
}

/// Article with its stock aggregated over the non-excluded warehouses in scope
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleStockRow {
    pub article: ArticleRow,
    pub on_hand: Decimal,
    pub reserved: Decimal,
    /// Line of the reference warehouse, when the article is stocked there
    pub reference: Option<ReferenceStock>,
}

/// One article/warehouse stock line, warehouse exclusions already applied
#[derive(Debug, Clone, PartialEq)]
pub struct StockLineRow {
    pub warehouse_code: i32,
    pub warehouse_name: Option<String>,
    pub principal: bool,
    pub on_hand: Decimal,
    pub reserved: Decimal,
    pub min_threshold: Decimal,
}

// Sage pads text columns; blank means absent.
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn trimmed(value: Option<String>) -> String {
    clean(value).unwrap_or_default()
}

/// Read operations the stock service needs from the ERP
#[async_trait]
pub trait StockSource: Send + Sync {
    /// Cheap round trip proving the ERP answers
    async fn ping(&self) -> SourceResult<()>;

    /// Non-excluded warehouses, principal first then by name
    async fn warehouses(&self) -> SourceResult<Vec<Warehouse>>;

    /// Same ordering as [`StockSource::warehouses`], with article count and stock value
    async fn warehouses_with_stats(&self) -> SourceResult<Vec<WarehouseWithStats>>;

    /// Active articles of non-excluded families, newest first
    async fn articles(&self, filters: &ArticleFilters) -> SourceResult<RowPage<ArticleStockRow>>;

    /// Master record by exact reference, dormant or not
    async fn article(&self, reference: &str) -> SourceResult<Option<ArticleRow>>;

    /// Stock lines of one article, principal warehouse first then by name
    async fn article_stock_lines(&self, reference: &str) -> SourceResult<Vec<StockLineRow>>;

    /// Most recent positive unit price on a purchase document
    async fn last_purchase_price(&self, reference: &str) -> SourceResult<Option<Decimal>>;

    /// Stock held by one warehouse, ordered by article reference
    async fn warehouse_stock(
        &self,
        code: i32,
        filters: &WarehouseStockFilters,
    ) -> SourceResult<RowPage<WarehouseStockItem>>;

    /// Non-excluded families, ordered by display name
    async fn families(&self) -> SourceResult<Vec<Family>>;
}

/// Stand-in used when the ERP is not configured; every read fails with
/// [`SourceError::Configuration`].
pub struct DisabledSource;

#[async_trait]
impl StockSource for DisabledSource {
    async fn ping(&self) -> SourceResult<()> {
        Err(SourceError::Configuration)
    }

    async fn warehouses(&self) -> SourceResult<Vec<Warehouse>> {
        Err(SourceError::Configuration)
    }

    async fn warehouses_with_stats(&self) -> SourceResult<Vec<WarehouseWithStats>> {
        Err(SourceError::Configuration)
    }

    async fn articles(&self, _filters: &ArticleFilters) -> SourceResult<RowPage<ArticleStockRow>> {
        Err(SourceError::Configuration)
    }

    async fn article(&self, _reference: &str) -> SourceResult<Option<ArticleRow>> {
        Err(SourceError::Configuration)
    }

    async fn article_stock_lines(&self, _reference: &str) -> SourceResult<Vec<StockLineRow>> {
        Err(SourceError::Configuration)
    }

    async fn last_purchase_price(&self, _reference: &str) -> SourceResult<Option<Decimal>> {
        Err(SourceError::Configuration)
    }

    async fn warehouse_stock(
        &self,
        _code: i32,
        _filters: &WarehouseStockFilters,
    ) -> SourceResult<RowPage<WarehouseStockItem>> {
        Err(SourceError::Configuration)
    }

    async fn families(&self) -> SourceResult<Vec<Family>> {
        Err(SourceError::Configuration)
    }
}

/// Build the source described by the configuration.
///
/// A missing or unreadable configuration never stops the server: it falls back to
/// [`DisabledSource`] and every listing degrades to empty.
pub fn build_source(config: &ErpConfig) -> Arc<dyn StockSource> {
    if !config.is_valid() {
        tracing::warn!(
            enabled = config.enabled,
            "ERP not configured, serving empty results"
        );
        return Arc::new(DisabledSource);
    }

    match config.source {
        ErpSourceKind::Postgres => {
            tracing::info!(
                host = %config.host,
                database = %config.database,
                max_connections = config.max_connections,
                "using ERP read replica"
            );
            Arc::new(PgStockSource::new(config))
        }
        ErpSourceKind::Snapshot => {
            let path = config.snapshot_path.as_deref().unwrap_or_default();
            match SnapshotSource::from_file(path) {
                Ok(source) => {
                    tracing::info!(path = %path, "using ERP snapshot");
                    Arc::new(source)
                }
                Err(e) => {
                    tracing::error!(path = %path, error = %e, "ERP snapshot unusable");
                    Arc::new(DisabledSource)
                }
            }
        }
    }
}

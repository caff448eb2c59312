//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use sage_stock::cache::{CacheSettings, ResultCache};
use sage_stock::config::{
    AuthConfig, CacheConfig, Config, ErpConfig, JwtConfig, ServerConfig, UserEntry,
};
use sage_stock::erp::{
    ArticleRow, ArticleStockRow, RowPage, SnapshotSource, SourceResult, StockLineRow, StockSource,
};
use sage_stock::services::StockService;
use shared::{
    ArticleFilters, Family, Warehouse, WarehouseStockFilters, WarehouseStockItem,
    WarehouseWithStats,
};

pub const SNAPSHOT: &str = include_str!("../../fixtures/erp_snapshot.json");

pub const ADMIN_EMAIL: &str = "admin@kly.fr";
pub const USER_EMAIL: &str = "vendeur@kly.fr";
pub const PASSWORD: &str = "s3cret!";

pub fn d(v: i64) -> Decimal {
    Decimal::from(v)
}

pub fn snapshot_source() -> SnapshotSource {
    SnapshotSource::from_json(SNAPSHOT).expect("fixture snapshot parses")
}

pub fn stock_service() -> StockService {
    StockService::new(
        Arc::new(snapshot_source()),
        ResultCache::new(CacheSettings::default()),
    )
}

pub fn uncached_stock_service() -> StockService {
    StockService::new(Arc::new(snapshot_source()), ResultCache::disabled())
}

pub fn test_config() -> Config {
    let hash = bcrypt::hash(PASSWORD, 4).expect("hash");
    Config {
        environment: "test".into(),
        server: ServerConfig::default(),
        erp: ErpConfig::default(),
        cache: CacheConfig::default(),
        jwt: JwtConfig {
            secret: "integration-secret".into(),
            session_expiry: 3600,
        },
        auth: AuthConfig {
            users: vec![
                UserEntry {
                    email: ADMIN_EMAIL.into(),
                    password_hash: hash.clone(),
                    name: "Admin".into(),
                    role: "admin".into(),
                },
                UserEntry {
                    email: USER_EMAIL.into(),
                    password_hash: hash,
                    name: "Vendeur".into(),
                    role: "user".into(),
                },
            ],
            login_delay_ms: 0,
            ..AuthConfig::default()
        },
    }
}

/// Delegating source that counts the reads reaching it
pub struct CountingSource {
    inner: SnapshotSource,
    reads: AtomicUsize,
}

impl CountingSource {
    pub fn new() -> Self {
        Self {
            inner: snapshot_source(),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StockSource for CountingSource {
    async fn ping(&self) -> SourceResult<()> {
        self.inner.ping().await
    }

    async fn warehouses(&self) -> SourceResult<Vec<Warehouse>> {
        self.hit();
        self.inner.warehouses().await
    }

    async fn warehouses_with_stats(&self) -> SourceResult<Vec<WarehouseWithStats>> {
        self.hit();
        self.inner.warehouses_with_stats().await
    }

    async fn articles(&self, filters: &ArticleFilters) -> SourceResult<RowPage<ArticleStockRow>> {
        self.hit();
        self.inner.articles(filters).await
    }

    async fn article(&self, reference: &str) -> SourceResult<Option<ArticleRow>> {
        self.hit();
        self.inner.article(reference).await
    }

    async fn article_stock_lines(&self, reference: &str) -> SourceResult<Vec<StockLineRow>> {
        self.inner.article_stock_lines(reference).await
    }

    async fn last_purchase_price(&self, reference: &str) -> SourceResult<Option<Decimal>> {
        self.inner.last_purchase_price(reference).await
    }

    async fn warehouse_stock(
        &self,
        code: i32,
        filters: &WarehouseStockFilters,
    ) -> SourceResult<RowPage<WarehouseStockItem>> {
        self.hit();
        self.inner.warehouse_stock(code, filters).await
    }

    async fn families(&self) -> SourceResult<Vec<Family>> {
        self.hit();
        self.inner.families().await
    }
}

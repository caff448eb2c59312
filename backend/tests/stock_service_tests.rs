//! Stock aggregation tests against the fixture snapshot
//!
//! Unit scenarios for every service operation plus property tests for the
//! listing invariants (exclusions, pagination, cache transparency).

mod common;

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;

use sage_stock::cache::ResultCache;
use sage_stock::erp::DisabledSource;
use sage_stock::services::{StockError, StockService};
use shared::{
    ArticleFilters, DetailOptions, Pagination, StockLevel, WarehouseStockFilters, KLY_EXCLUSIONS,
};

use common::*;

fn filters() -> ArticleFilters {
    ArticleFilters::default()
}

// ============================================================================
// Warehouses
// ============================================================================

mod warehouses {
    use super::*;

    #[tokio::test]
    async fn excluded_warehouses_never_listed() {
        let service = stock_service();
        let warehouses = service.list_warehouses().await;
        let codes: Vec<i32> = warehouses.iter().map(|w| w.code).collect();

        // principal first, then by name, unnamed last
        assert_eq!(codes, vec![1, 2, 5]);
        assert_eq!(warehouses[2].name, "Dépôt 5");
        for w in &warehouses {
            assert!(!KLY_EXCLUSIONS.excludes_warehouse(w.code, &w.name));
        }
    }

    #[tokio::test]
    async fn stats_count_active_visible_articles_in_stock() {
        let service = stock_service();
        let stats = service.list_warehouses_with_stats().await;

        let gennevilliers = &stats[0];
        assert_eq!(gennevilliers.warehouse.code, 1);
        // CAF001, CAF002, BOI001 and the 25 catalogue articles
        assert_eq!(gennevilliers.article_count, 28);

        let lyon = &stats[1];
        assert_eq!(lyon.article_count, 3);
        // 15 x 9 + 200 x 4.9 + 12 x 2
        assert_eq!(lyon.stock_value, Decimal::new(1139, 0));
    }

    #[tokio::test]
    async fn warehouse_stock_is_ordered_by_reference() {
        let service = stock_service();
        let result = service
            .warehouse_stock(2, &WarehouseStockFilters::default())
            .await
            .unwrap();

        assert_eq!(result.warehouse.name, "KLY LYON");
        let refs: Vec<&str> = result
            .page
            .data
            .iter()
            .map(|i| i.article.reference.as_str())
            .collect();
        assert_eq!(refs, vec!["BOI002", "CAF001", "CAF002"]);
        assert_eq!(result.page.meta.total, 3);

        let caf002 = &result.page.data[2];
        assert_eq!(caf002.available, d(180));
    }

    #[tokio::test]
    async fn unknown_or_excluded_warehouse_is_not_found() {
        let service = stock_service();
        let filters = WarehouseStockFilters::default();
        assert_eq!(
            service.warehouse_stock(999, &filters).await.unwrap_err(),
            StockError::NotFound(999)
        );
        // GEODIS exists in the ERP but is excluded
        assert_eq!(
            service.warehouse_stock(3, &filters).await.unwrap_err(),
            StockError::NotFound(3)
        );
    }

    #[tokio::test]
    async fn warehouse_stock_can_include_empty_lines() {
        let service = stock_service();
        let with_empty = WarehouseStockFilters {
            has_stock: false,
            ..WarehouseStockFilters::default()
        };
        let all = service.warehouse_stock(1, &with_empty).await.unwrap();
        let in_stock = service
            .warehouse_stock(1, &WarehouseStockFilters::default())
            .await
            .unwrap();
        // CAF003 has a zero line at Gennevilliers
        assert_eq!(all.page.meta.total, in_stock.page.meta.total + 1);
    }
}

// ============================================================================
// Articles
// ============================================================================

mod articles {
    use super::*;

    #[tokio::test]
    async fn default_listing_is_newest_first() {
        let service = stock_service();
        let page = service.list_articles(&filters()).await;

        // 6 named articles + 25 catalogue; excluded families and dormant articles hidden
        assert_eq!(page.meta.total, 31);
        assert_eq!(page.meta.total_pages, 2);
        assert_eq!(page.data.len(), 20);
        assert_eq!(page.data[0].article.reference, "CAF001");
        assert!(page
            .data
            .iter()
            .all(|a| !["THE001", "ZZ0001", "DORM01"].contains(&a.article.reference.as_str())));
    }

    #[tokio::test]
    async fn aggregates_skip_excluded_warehouses() {
        let service = stock_service();
        let page = service
            .list_articles(&ArticleFilters {
                search: "CAF001".into(),
                ..filters()
            })
            .await;

        let caf001 = &page.data[0];
        assert_eq!(caf001.stock.on_hand, d(55));
        assert_eq!(caf001.stock.reserved, d(10));
        assert_eq!(caf001.stock.available, d(45));
        assert_eq!(caf001.level, StockLevel::Normal);
        assert_eq!(caf001.min_threshold, Some(d(20)));
    }

    #[tokio::test]
    async fn level_comes_from_reference_warehouse() {
        let service = stock_service();
        let page = service
            .list_articles(&ArticleFilters {
                family: Some("CAFE".into()),
                ..filters()
            })
            .await;
        let level = |reference: &str| {
            page.data
                .iter()
                .find(|a| a.article.reference == reference)
                .map(|a| a.level)
        };

        // 3 of 10 at Gennevilliers, 200 more in Lyon
        assert_eq!(level("CAF002"), Some(StockLevel::Low));
        assert_eq!(level("CAF003"), Some(StockLevel::OutOfStock));
    }

    #[tokio::test]
    async fn low_stock_only() {
        let service = stock_service();
        let page = service
            .list_articles(&ArticleFilters {
                low_stock_only: true,
                ..filters()
            })
            .await;
        let refs: Vec<&str> = page.data.iter().map(|a| a.article.reference.as_str()).collect();
        assert_eq!(refs, vec!["CAF002"]);
    }

    #[tokio::test]
    async fn reference_warehouse_only_restricts_aggregate() {
        let service = stock_service();
        let page = service
            .list_articles(&ArticleFilters {
                reference_warehouse_only: true,
                pagination: Pagination::new(1, 100),
                ..filters()
            })
            .await;

        assert_eq!(page.meta.total, 28);
        assert!(page.data.iter().all(|a| a.article.reference != "BOI002"));
        let caf001 = page
            .data
            .iter()
            .find(|a| a.article.reference == "CAF001")
            .unwrap();
        assert_eq!(caf001.stock.on_hand, d(40));
    }

    #[tokio::test]
    async fn has_stock_drops_empty_aggregates() {
        let service = stock_service();
        let page = service
            .list_articles(&ArticleFilters {
                has_stock: true,
                pagination: Pagination::new(1, 100),
                ..filters()
            })
            .await;

        assert_eq!(page.meta.total, 29);
        assert!(page.data.iter().all(|a| a.stock.on_hand > Decimal::ZERO));
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_paginated() {
        let service = stock_service();
        let first = service
            .list_articles(&ArticleFilters {
                search: "abc".into(),
                ..filters()
            })
            .await;
        let second = service
            .list_articles(&ArticleFilters {
                search: "abc".into(),
                pagination: Pagination::new(2, 20),
                ..filters()
            })
            .await;

        assert_eq!(first.meta.total, 25);
        assert_eq!(first.data.len(), 20);
        assert_eq!(second.data.len(), 5);
        for item in &second.data {
            assert!(first
                .data
                .iter()
                .all(|f| f.article.reference != item.article.reference));
        }
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty() {
        let service = stock_service();
        let page = service
            .list_articles(&ArticleFilters {
                pagination: Pagination::new(9, 20),
                ..filters()
            })
            .await;
        assert!(page.data.is_empty());
        assert_eq!(page.meta.total, 31);
    }
}

// ============================================================================
// Detail and families
// ============================================================================

mod detail {
    use super::*;

    #[tokio::test]
    async fn detail_has_breakdown_and_last_purchase_price() {
        let service = stock_service();
        let detail = service
            .article_detail("CAF001", DetailOptions::default())
            .await
            .unwrap();

        assert_eq!(detail.summary.stock.on_hand, d(55));
        assert_eq!(detail.summary.stock.available, d(45));
        let codes: Vec<i32> = detail.lines.iter().map(|l| l.warehouse_code).collect();
        assert_eq!(codes, vec![1, 2]);

        // most recent positive price on a purchase document
        assert_eq!(detail.last_purchase_price, Some(Decimal::new(65, 1)));
        assert_eq!(detail.summary.article.purchase_price, Some(Decimal::new(65, 1)));
    }

    #[tokio::test]
    async fn master_price_kept_without_purchase_history() {
        let service = stock_service();
        let detail = service
            .article_detail("CAF002", DetailOptions::default())
            .await
            .unwrap();
        assert_eq!(detail.last_purchase_price, None);
        assert_eq!(detail.summary.article.purchase_price, Some(Decimal::new(25, 1)));
        assert_eq!(detail.summary.level, StockLevel::Low);
    }

    #[tokio::test]
    async fn missing_and_excluded_articles_are_not_found() {
        let service = stock_service();
        let options = DetailOptions::default();
        assert!(service.article_detail("NOPE", options).await.is_none());
        assert!(service.article_detail("THE001", options).await.is_none());
        // exact, case-sensitive match
        assert!(service.article_detail("caf001", options).await.is_none());
    }

    #[tokio::test]
    async fn families_are_visible_and_sorted() {
        let service = stock_service();
        let families = service.list_families().await;
        let codes: Vec<&str> = families.iter().map(|f| f.code.as_str()).collect();
        assert_eq!(codes, vec!["BOIS", "CAFE"]);
    }
}

// ============================================================================
// Degraded ERP and caching
// ============================================================================

mod degraded {
    use super::*;

    fn unavailable() -> StockService {
        StockService::new(Arc::new(DisabledSource), ResultCache::disabled())
    }

    #[tokio::test]
    async fn unconfigured_erp_serves_empty_results() {
        let service = unavailable();
        assert!(!service.is_available().await);
        assert!(service.list_warehouses().await.is_empty());
        assert!(service.list_families().await.is_empty());

        let page = service.list_articles(&filters()).await;
        assert!(page.data.is_empty());
        assert_eq!(page.meta.total, 0);

        assert!(service
            .article_detail("CAF001", DetailOptions::default())
            .await
            .is_none());
        assert_eq!(
            service
                .warehouse_stock(1, &WarehouseStockFilters::default())
                .await
                .unwrap_err(),
            StockError::NotFound(1)
        );
    }

    #[tokio::test]
    async fn repeated_reads_hit_the_cache() {
        let source = Arc::new(CountingSource::new());
        let service = StockService::new(source.clone(), ResultCache::new(Default::default()));

        let first = service.list_articles(&filters()).await;
        let second = service.list_articles(&filters()).await;
        assert_eq!(first, second);
        assert_eq!(source.reads(), 1);

        service.list_families().await;
        service.list_families().await;
        assert_eq!(source.reads(), 2);
    }

    #[tokio::test]
    async fn fresh_detail_skips_the_cache_read() {
        let source = Arc::new(CountingSource::new());
        let service = StockService::new(source.clone(), ResultCache::new(Default::default()));

        service.article_detail("CAF001", DetailOptions::default()).await;
        service.article_detail("CAF001", DetailOptions::default()).await;
        assert_eq!(source.reads(), 1);

        service
            .article_detail("CAF001", DetailOptions { fresh: true })
            .await;
        assert_eq!(source.reads(), 2);
        // the fresh read refreshed the entry
        service.article_detail("CAF001", DetailOptions::default()).await;
        assert_eq!(source.reads(), 2);
    }

    #[tokio::test]
    async fn clearing_the_cache_forces_a_reload() {
        let source = Arc::new(CountingSource::new());
        let service = StockService::new(source.clone(), ResultCache::new(Default::default()));

        service.list_warehouses().await;
        assert_eq!(service.cache_stats().count, 1);
        assert_eq!(service.cache().clear(), 1);
        service.list_warehouses().await;
        assert_eq!(source.reads(), 2);
    }
}

// ============================================================================
// Property tests
// ============================================================================

fn article_filters_strategy() -> impl Strategy<Value = ArticleFilters> {
    (
        prop_oneof![Just(""), Just("caf"), Just("ABC-0"), Just("jus"), Just("zz")],
        prop_oneof![
            Just(None),
            Just(Some("CAFE".to_string())),
            Just(Some("BOIS".to_string())),
            Just(Some("ZZ".to_string())),
        ],
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        1u32..5,
        1u32..30,
    )
        .prop_map(
            |(search, family, has_stock, reference_only, low_only, page, limit)| ArticleFilters {
                search: search.to_string(),
                family,
                has_stock,
                reference_warehouse_only: reference_only,
                low_stock_only: low_only,
                pagination: Pagination::new(page, limit),
            },
        )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// No listed article belongs to an excluded family, whatever the filters
    #[test]
    fn prop_listings_respect_exclusions(filters in article_filters_strategy()) {
        let page = runtime().block_on(uncached_stock_service().list_articles(&filters));
        for item in &page.data {
            prop_assert!(!KLY_EXCLUSIONS.excludes_family(
                &item.article.family,
                item.article.family_name.as_deref()
            ));
            prop_assert!(item.article.active);
            if filters.requires_stock() {
                prop_assert!(item.stock.on_hand > Decimal::ZERO);
            }
            if filters.low_stock_only {
                prop_assert_eq!(item.level, StockLevel::Low);
            }
        }
    }

    /// Page sizes and meta agree with the total
    #[test]
    fn prop_pagination_is_consistent(filters in article_filters_strategy()) {
        let page = runtime().block_on(uncached_stock_service().list_articles(&filters));
        let limit = filters.pagination.limit as u64;
        let offset = filters.pagination.offset();
        let expected = page.meta.total.saturating_sub(offset).min(limit);

        prop_assert_eq!(page.data.len() as u64, expected);
        prop_assert_eq!(page.meta.total_pages, page.meta.total.div_ceil(limit));
    }

    /// Consecutive pages never overlap
    #[test]
    fn prop_pages_do_not_overlap(filters in article_filters_strategy()) {
        let service = uncached_stock_service();
        let next = ArticleFilters {
            pagination: Pagination::new(filters.pagination.page + 1, filters.pagination.limit),
            ..filters.clone()
        };
        let rt = runtime();
        let a = rt.block_on(service.list_articles(&filters));
        let b = rt.block_on(service.list_articles(&next));
        for item in &b.data {
            prop_assert!(a.data.iter().all(|x| x.article.reference != item.article.reference));
        }
    }

    /// The cache changes latency only, never results
    #[test]
    fn prop_cache_is_transparent(filters in article_filters_strategy()) {
        let rt = runtime();
        let cached = stock_service();
        let first = rt.block_on(cached.list_articles(&filters));
        let second = rt.block_on(cached.list_articles(&filters));
        let uncached = rt.block_on(uncached_stock_service().list_articles(&filters));
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&first, &uncached);
    }
}

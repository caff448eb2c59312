//! In-memory copy of the ERP tables
//!
//! Loaded from a JSON export and evaluated with the same rules as the SQL in
//! [`super::query`]: exclusions, ordering and pagination all match the replica.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shared::{
    available_quantity, default_warehouse_name, is_reference_warehouse, ArticleFilters,
    ArticleSummary, ExclusionRules, Family, Pagination, ReferenceStock, Warehouse,
    WarehouseStockFilters, WarehouseStockItem, WarehouseWithStats, DEFAULT_UNIT, KLY_EXCLUSIONS,
};

use super::query::PURCHASE_DOCUMENT_TYPES;
use super::{
    clean, trimmed, ArticleRow, ArticleStockRow, RowPage, SourceError, SourceResult,
    StockLineRow, StockSource,
};

/// `f_article`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotArticle {
    pub reference: String,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub family_code: Option<String>,
    #[serde(default)]
    pub purchase_price: Decimal,
    #[serde(default)]
    pub sale_price: Decimal,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub dormant: bool,
    pub created_at: NaiveDateTime,
}

/// `f_artstock`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotStock {
    pub reference: String,
    pub warehouse: i32,
    #[serde(default)]
    pub on_hand: Decimal,
    #[serde(default)]
    pub reserved: Decimal,
    #[serde(default)]
    pub min_threshold: Decimal,
}

/// `f_depot`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotWarehouse {
    pub code: i32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub principal: bool,
}

/// `f_famille`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFamily {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// `f_docligne`, purchase side only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPurchaseLine {
    pub reference: String,
    pub document_type: i16,
    pub unit_price: Decimal,
    #[serde(default)]
    pub delivered_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErpSnapshot {
    #[serde(default)]
    pub articles: Vec<SnapshotArticle>,
    #[serde(default)]
    pub stock: Vec<SnapshotStock>,
    #[serde(default)]
    pub warehouses: Vec<SnapshotWarehouse>,
    #[serde(default)]
    pub families: Vec<SnapshotFamily>,
    #[serde(default)]
    pub purchase_lines: Vec<SnapshotPurchaseLine>,
}

pub struct SnapshotSource {
    snapshot: ErpSnapshot,
    warehouses: HashMap<i32, SnapshotWarehouse>,
    family_names: HashMap<String, Option<String>>,
    rules: ExclusionRules,
}

impl SnapshotSource {
    pub fn new(snapshot: ErpSnapshot) -> Self {
        let warehouses = snapshot
            .warehouses
            .iter()
            .map(|w| (w.code, w.clone()))
            .collect();
        let family_names = snapshot
            .families
            .iter()
            .map(|f| (f.code.clone(), f.name.clone()))
            .collect();
        Self {
            snapshot,
            warehouses,
            family_names,
            rules: KLY_EXCLUSIONS,
        }
    }

    pub fn from_json(json: &str) -> SourceResult<Self> {
        let snapshot: ErpSnapshot =
            serde_json::from_str(json).map_err(|e| SourceError::Snapshot(e.to_string()))?;
        Ok(Self::new(snapshot))
    }

    pub fn from_file(path: impl AsRef<Path>) -> SourceResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SourceError::Snapshot(e.to_string()))?;
        Self::from_json(&json)
    }

    fn family_name(&self, code: Option<&str>) -> Option<&str> {
        code.and_then(|c| self.family_names.get(c))
            .and_then(|n| n.as_deref())
    }

    fn family_visible(&self, article: &SnapshotArticle) -> bool {
        let code = article.family_code.as_deref();
        !self
            .rules
            .excludes_family(code.unwrap_or_default(), self.family_name(code))
    }

    // Active and of a visible family; the base condition of every article listing.
    fn listable(&self, article: &SnapshotArticle) -> bool {
        !article.dormant && self.family_visible(article)
    }

    fn visible_warehouse(&self, code: i32) -> Option<&SnapshotWarehouse> {
        self.warehouses.get(&code).filter(|w| {
            !self
                .rules
                .excludes_warehouse(w.code, w.name.as_deref().unwrap_or_default())
        })
    }

    fn find_article(&self, reference: &str) -> Option<&SnapshotArticle> {
        self.snapshot
            .articles
            .iter()
            .find(|a| a.reference == reference)
    }

    fn article_row(&self, article: &SnapshotArticle) -> ArticleRow {
        ArticleRow {
            reference: article.reference.trim().to_string(),
            designation: trimmed(article.designation.clone()),
            family_code: trimmed(article.family_code.clone()),
            family_name: clean(
                self.family_name(article.family_code.as_deref())
                    .map(str::to_string),
            ),
            purchase_price: article.purchase_price,
            sale_price: article.sale_price,
            unit: clean(article.unit.clone()).unwrap_or_else(|| DEFAULT_UNIT.to_string()),
            barcode: clean(article.barcode.clone()),
            dormant: article.dormant,
        }
    }

    // Stock lines of one article in visible warehouses, with their warehouse row.
    fn lines_of<'a>(
        &'a self,
        reference: &'a str,
    ) -> impl Iterator<Item = (&'a SnapshotStock, &'a SnapshotWarehouse)> + 'a {
        self.snapshot
            .stock
            .iter()
            .filter(move |s| s.reference == reference)
            .filter_map(move |s| self.visible_warehouse(s.warehouse).map(|w| (s, w)))
    }

    fn stock_row(&self, article: &SnapshotArticle, reference_only: bool) -> ArticleStockRow {
        let mut on_hand = Decimal::ZERO;
        let mut reserved = Decimal::ZERO;
        let mut reference: Option<ReferenceStock> = None;

        for (line, warehouse) in self.lines_of(&article.reference) {
            let is_reference = is_reference_warehouse(warehouse.name.as_deref().unwrap_or_default());
            if is_reference {
                let r = reference.get_or_insert_with(ReferenceStock::default);
                r.on_hand += line.on_hand;
                r.threshold = r.threshold.max(line.min_threshold);
            }
            if !reference_only || is_reference {
                on_hand += line.on_hand;
                reserved += line.reserved;
            }
        }

        ArticleStockRow {
            article: self.article_row(article),
            on_hand,
            reserved,
            reference,
        }
    }

    fn warehouse(&self, w: &SnapshotWarehouse) -> Warehouse {
        Warehouse {
            code: w.code,
            name: clean(w.name.clone()).unwrap_or_else(|| default_warehouse_name(w.code)),
            address: clean(w.address.clone()),
            postal_code: clean(w.postal_code.clone()),
            city: clean(w.city.clone()),
            principal: w.principal,
        }
    }

    // Principal first, then by name with unnamed warehouses last.
    fn sorted_visible_warehouses(&self) -> Vec<&SnapshotWarehouse> {
        let mut warehouses: Vec<&SnapshotWarehouse> = self
            .snapshot
            .warehouses
            .iter()
            .filter(|w| self.visible_warehouse(w.code).is_some())
            .collect();
        warehouses.sort_by(|a, b| {
            (Reverse(a.principal), a.name.is_none(), &a.name).cmp(&(
                Reverse(b.principal),
                b.name.is_none(),
                &b.name,
            ))
        });
        warehouses
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn matches_search(article: &SnapshotArticle, search: &str) -> bool {
    if search.is_empty() {
        return true;
    }
    let needle = search.to_lowercase();
    contains_ci(&article.reference, &needle)
        || article
            .designation
            .as_deref()
            .map(|d| contains_ci(d, &needle))
            .unwrap_or(false)
}

fn page<T>(mut rows: Vec<T>, pagination: Pagination) -> RowPage<T> {
    let total = rows.len() as u64;
    let offset = usize::try_from(pagination.offset()).unwrap_or(usize::MAX);
    let rows = if offset >= rows.len() {
        Vec::new()
    } else {
        rows.drain(offset..)
            .take(pagination.limit as usize)
            .collect()
    };
    RowPage::new(total, rows)
}

#[async_trait]
impl StockSource for SnapshotSource {
    async fn ping(&self) -> SourceResult<()> {
        Ok(())
    }

    async fn warehouses(&self) -> SourceResult<Vec<Warehouse>> {
        Ok(self
            .sorted_visible_warehouses()
            .into_iter()
            .map(|w| self.warehouse(w))
            .collect())
    }

    async fn warehouses_with_stats(&self) -> SourceResult<Vec<WarehouseWithStats>> {
        let mut stats = Vec::new();
        for w in self.sorted_visible_warehouses() {
            let mut references = BTreeSet::new();
            let mut stock_value = Decimal::ZERO;
            for line in self
                .snapshot
                .stock
                .iter()
                .filter(|s| s.warehouse == w.code && s.on_hand > Decimal::ZERO)
            {
                let Some(article) = self.find_article(&line.reference) else {
                    continue;
                };
                if !self.listable(article) {
                    continue;
                }
                references.insert(line.reference.as_str());
                stock_value += line.on_hand * article.sale_price;
            }
            stats.push(WarehouseWithStats {
                warehouse: self.warehouse(w),
                article_count: references.len() as i64,
                stock_value,
            });
        }
        Ok(stats)
    }

    async fn articles(&self, filters: &ArticleFilters) -> SourceResult<RowPage<ArticleStockRow>> {
        let mut matching: Vec<(&SnapshotArticle, ArticleStockRow)> = self
            .snapshot
            .articles
            .iter()
            .filter(|a| self.listable(a))
            .filter(|a| matches_search(a, &filters.search))
            .filter(|a| match &filters.family {
                Some(family) => a.family_code.as_deref() == Some(family.as_str()),
                None => true,
            })
            .map(|a| (a, self.stock_row(a, filters.reference_warehouse_only)))
            .filter(|(_, row)| !filters.requires_stock() || row.on_hand > Decimal::ZERO)
            .filter(|(_, row)| {
                !filters.low_stock_only || row.reference.map(|r| r.is_low()).unwrap_or(false)
            })
            .collect();

        matching.sort_by(|(a, _), (b, _)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.reference.cmp(&b.reference))
        });

        let rows = matching.into_iter().map(|(_, row)| row).collect();
        Ok(page(rows, filters.pagination))
    }

    async fn article(&self, reference: &str) -> SourceResult<Option<ArticleRow>> {
        Ok(self.find_article(reference).map(|a| self.article_row(a)))
    }

    async fn article_stock_lines(&self, reference: &str) -> SourceResult<Vec<StockLineRow>> {
        let mut lines: Vec<(&SnapshotStock, &SnapshotWarehouse)> =
            self.lines_of(reference).collect();
        lines.sort_by(|(_, a), (_, b)| {
            (Reverse(a.principal), a.name.is_none(), &a.name).cmp(&(
                Reverse(b.principal),
                b.name.is_none(),
                &b.name,
            ))
        });
        Ok(lines
            .into_iter()
            .map(|(s, w)| StockLineRow {
                warehouse_code: w.code,
                warehouse_name: clean(w.name.clone()),
                principal: w.principal,
                on_hand: s.on_hand,
                reserved: s.reserved,
                min_threshold: s.min_threshold,
            })
            .collect())
    }

    async fn last_purchase_price(&self, reference: &str) -> SourceResult<Option<Decimal>> {
        Ok(self
            .snapshot
            .purchase_lines
            .iter()
            .filter(|l| l.reference == reference)
            .filter(|l| PURCHASE_DOCUMENT_TYPES.contains(&l.document_type))
            .filter(|l| l.unit_price > Decimal::ZERO)
            .max_by_key(|l| l.delivered_on)
            .map(|l| l.unit_price))
    }

    async fn warehouse_stock(
        &self,
        code: i32,
        filters: &WarehouseStockFilters,
    ) -> SourceResult<RowPage<WarehouseStockItem>> {
        let mut items: Vec<WarehouseStockItem> = self
            .snapshot
            .stock
            .iter()
            .filter(|s| s.warehouse == code)
            .filter(|s| !filters.has_stock || s.on_hand > Decimal::ZERO)
            .filter_map(|s| self.find_article(&s.reference).map(|a| (s, a)))
            .filter(|(_, a)| self.listable(a) && matches_search(a, &filters.search))
            .map(|(s, a)| WarehouseStockItem {
                article: ArticleSummary {
                    reference: a.reference.trim().to_string(),
                    designation: trimmed(a.designation.clone()),
                    family: trimmed(a.family_code.clone()),
                },
                on_hand: s.on_hand,
                reserved: s.reserved,
                available: available_quantity(s.on_hand, s.reserved),
                sale_price: a.sale_price,
            })
            .collect();
        items.sort_by(|a, b| a.article.reference.cmp(&b.article.reference));
        Ok(page(items, filters.pagination))
    }

    async fn families(&self) -> SourceResult<Vec<Family>> {
        let distinct: BTreeSet<(Option<String>, String)> = self
            .snapshot
            .families
            .iter()
            .filter(|f| !f.code.trim().is_empty())
            .filter(|f| !self.rules.excludes_family(&f.code, f.name.as_deref()))
            .map(|f| (clean(f.name.clone()), f.code.trim().to_string()))
            .collect();

        let mut families: Vec<Family> = distinct
            .into_iter()
            .map(|(name, code)| Family {
                name: name.unwrap_or_else(|| code.clone()),
                code,
            })
            .collect();
        families.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(families)
    }
}

//! Article read-models projected from the ERP article master and stock tables

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{StockLevel, WarehouseStockLine};

/// Unit of measure used when the ERP leaves it blank
pub const DEFAULT_UNIT: &str = "PCE";

/// An article from the ERP article master (`F_ARTICLE`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub reference: String,
    pub designation: String,
    #[serde(rename = "famille")]
    pub family: String,
    #[serde(rename = "familleIntitule", skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    /// Always filled by the stock service; removed at the boundary for non-admin roles
    #[serde(rename = "prixAchat", skip_serializing_if = "Option::is_none")]
    pub purchase_price: Option<Decimal>,
    #[serde(rename = "prixVente")]
    pub sale_price: Decimal,
    #[serde(rename = "unite")]
    pub unit: String,
    #[serde(rename = "codeBarres", skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    /// Derived from the ERP dormant flag
    #[serde(rename = "actif")]
    pub active: bool,
}

/// Aggregate quantities across the warehouses in scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StockTotals {
    #[serde(rename = "stockTotal")]
    pub on_hand: Decimal,
    #[serde(rename = "stockReserve")]
    pub reserved: Decimal,
    #[serde(rename = "stockDisponible")]
    pub available: Decimal,
}

impl StockTotals {
    pub fn new(on_hand: Decimal, reserved: Decimal) -> Self {
        Self {
            on_hand,
            reserved,
            available: available_quantity(on_hand, reserved),
        }
    }

    /// Sum of per-warehouse lines
    pub fn from_lines(lines: &[WarehouseStockLine]) -> Self {
        let on_hand = lines.iter().map(|l| l.on_hand).sum();
        let reserved = lines.iter().map(|l| l.reserved).sum();
        Self::new(on_hand, reserved)
    }
}

/// Available quantity, `on_hand - reserved`. May be negative when the ERP has
/// more prepared than on hand.
pub fn available_quantity(on_hand: Decimal, reserved: Decimal) -> Decimal {
    on_hand - reserved
}

/// Article with its aggregate stock and health classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleWithStock {
    #[serde(flatten)]
    pub article: Article,
    #[serde(flatten)]
    pub stock: StockTotals,
    #[serde(rename = "niveauStock")]
    pub level: StockLevel,
    /// Minimum threshold of the reference warehouse
    #[serde(rename = "seuilMini", skip_serializing_if = "Option::is_none")]
    pub min_threshold: Option<Decimal>,
}

/// Full article detail with the per-warehouse breakdown, principal warehouse first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub summary: ArticleWithStock,
    /// Most recent positive unit price from purchase documents
    #[serde(rename = "dernierPrixAchat", skip_serializing_if = "Option::is_none")]
    pub last_purchase_price: Option<Decimal>,
    #[serde(rename = "stockParDepot")]
    pub lines: Vec<WarehouseStockLine>,
}

impl ArticleDetail {
    pub fn reference(&self) -> &str {
        &self.summary.article.reference
    }
}

/// Minimal article identity used inside warehouse listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub reference: String,
    pub designation: String,
    #[serde(rename = "famille")]
    pub family: String,
}

/// Prefer the last purchase price when it is positive, else the master price
pub fn effective_purchase_price(master: Decimal, last_purchase: Option<Decimal>) -> Decimal {
    match last_purchase {
        Some(price) if price > Decimal::ZERO => price,
        _ => master,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn available_is_on_hand_minus_reserved() {
        let totals = StockTotals::new(d(55), d(10));
        assert_eq!(totals.available, d(45));
        assert_eq!(StockTotals::new(d(2), d(5)).available, d(-3));
    }

    #[test]
    fn last_purchase_price_overrides_only_when_positive() {
        assert_eq!(effective_purchase_price(d(4), Some(d(6))), d(6));
        assert_eq!(effective_purchase_price(d(4), Some(d(0))), d(4));
        assert_eq!(effective_purchase_price(d(4), None), d(4));
    }

    #[test]
    fn article_with_stock_flattens_to_front_end_names() {
        let item = ArticleWithStock {
            article: Article {
                reference: "ABC1".into(),
                designation: "Thé vert".into(),
                family: "BOIS".into(),
                family_name: None,
                purchase_price: Some(d(2)),
                sale_price: d(5),
                unit: DEFAULT_UNIT.into(),
                barcode: None,
                active: true,
            },
            stock: StockTotals::new(d(12), d(2)),
            level: StockLevel::Normal,
            min_threshold: None,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["reference"], "ABC1");
        assert_eq!(json["famille"], "BOIS");
        assert_eq!(json["stockDisponible"], 10.0);
        assert_eq!(json["niveauStock"], "normal");
        assert!(json.get("seuilMini").is_none());
        assert!(json.get("familleIntitule").is_none());
    }
}

//! Warehouse (dépôt) and family read-models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{available_quantity, ArticleSummary};

/// A warehouse from `F_DEPOT`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub code: i32,
    #[serde(rename = "intitule")]
    pub name: String,
    #[serde(rename = "adresse", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(rename = "codePostal", skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(rename = "ville", skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub principal: bool,
}

/// Display name used when the ERP leaves a warehouse unnamed
pub fn default_warehouse_name(code: i32) -> String {
    format!("Dépôt {}", code)
}

/// Warehouse with statistics over active, non-excluded articles in stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseWithStats {
    #[serde(flatten)]
    pub warehouse: Warehouse,
    /// Distinct articles with a positive on-hand quantity
    #[serde(rename = "nombreArticles")]
    pub article_count: i64,
    /// Sum of on-hand quantity times sale price
    #[serde(rename = "valeurStock")]
    pub stock_value: Decimal,
}

/// One (article, warehouse) stock line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseStockLine {
    #[serde(rename = "depotCode")]
    pub warehouse_code: i32,
    #[serde(rename = "depotIntitule")]
    pub warehouse_name: String,
    #[serde(rename = "quantite")]
    pub on_hand: Decimal,
    #[serde(rename = "quantiteReservee")]
    pub reserved: Decimal,
    #[serde(rename = "disponible")]
    pub available: Decimal,
    #[serde(rename = "stockMini")]
    pub min_threshold: Decimal,
}

impl WarehouseStockLine {
    pub fn new(
        warehouse_code: i32,
        warehouse_name: String,
        on_hand: Decimal,
        reserved: Decimal,
        min_threshold: Decimal,
    ) -> Self {
        Self {
            warehouse_code,
            warehouse_name,
            on_hand,
            reserved,
            available: available_quantity(on_hand, reserved),
            min_threshold,
        }
    }
}

/// An article's stock inside one warehouse listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseStockItem {
    pub article: ArticleSummary,
    #[serde(rename = "quantite")]
    pub on_hand: Decimal,
    #[serde(rename = "quantiteReservee")]
    pub reserved: Decimal,
    #[serde(rename = "disponible")]
    pub available: Decimal,
    #[serde(rename = "prixVente")]
    pub sale_price: Decimal,
}

/// Article family, used for filtering only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    pub code: String,
    #[serde(rename = "intitule")]
    pub name: String,
}

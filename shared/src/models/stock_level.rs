//! Stock health classification

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Surplus starts strictly above this multiple of the minimum threshold
pub const SURPLUS_FACTOR: u32 = 3;

/// Stock health category, computed on read and never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StockLevel {
    /// Nothing on hand
    #[serde(rename = "rupture")]
    OutOfStock,
    /// At or under the minimum threshold
    #[serde(rename = "bas")]
    Low,
    #[serde(rename = "normal")]
    Normal,
    /// More than three times the minimum threshold
    #[serde(rename = "surplus")]
    Surplus,
}

impl StockLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockLevel::OutOfStock => "rupture",
            StockLevel::Low => "bas",
            StockLevel::Normal => "normal",
            StockLevel::Surplus => "surplus",
        }
    }

    /// Label shown to warehouse staff
    pub fn label(&self) -> &'static str {
        match self {
            StockLevel::OutOfStock => "Rupture",
            StockLevel::Low => "Stock bas",
            StockLevel::Normal => "Disponible",
            StockLevel::Surplus => "Surplus",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "rupture" => Some(StockLevel::OutOfStock),
            "bas" => Some(StockLevel::Low),
            "normal" => Some(StockLevel::Normal),
            "surplus" => Some(StockLevel::Surplus),
            _ => None,
        }
    }

    /// Level of an article: out of stock when the aggregate is zero, otherwise the
    /// classification of the reference warehouse line.
    ///
    /// The reference line is used even when `aggregate_on_hand` spans every warehouse.
    /// An article with stock elsewhere but none (or no line) at the reference warehouse
    /// is `Normal`.
    pub fn for_article(aggregate_on_hand: Decimal, reference: Option<ReferenceStock>) -> Self {
        if aggregate_on_hand.is_zero() {
            return StockLevel::OutOfStock;
        }
        match reference {
            Some(r) if r.on_hand > Decimal::ZERO => classify(r.on_hand, r.threshold),
            _ => StockLevel::Normal,
        }
    }
}

impl std::fmt::Display for StockLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Classify an on-hand quantity against a minimum threshold.
///
/// A zero or unknown threshold never yields `Low` or `Surplus`.
pub fn classify(on_hand: Decimal, threshold: Decimal) -> StockLevel {
    if on_hand.is_zero() {
        return StockLevel::OutOfStock;
    }
    if on_hand > Decimal::ZERO && threshold > Decimal::ZERO {
        if on_hand <= threshold {
            return StockLevel::Low;
        }
        if on_hand > threshold * Decimal::from(SURPLUS_FACTOR) {
            return StockLevel::Surplus;
        }
    }
    StockLevel::Normal
}

/// On-hand quantity and minimum threshold of the reference warehouse line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReferenceStock {
    pub on_hand: Decimal,
    pub threshold: Decimal,
}

impl ReferenceStock {
    pub fn new(on_hand: Decimal, threshold: Decimal) -> Self {
        Self { on_hand, threshold }
    }

    /// `threshold > 0 AND on_hand > 0 AND on_hand <= threshold`, the "low stock only" predicate
    pub fn is_low(&self) -> bool {
        self.threshold > Decimal::ZERO && self.on_hand > Decimal::ZERO && self.on_hand <= self.threshold
    }

    /// Threshold as exposed to callers (`seuilMini`), absent when not configured
    pub fn published_threshold(&self) -> Option<Decimal> {
        (self.threshold > Decimal::ZERO).then_some(self.threshold)
    }
}

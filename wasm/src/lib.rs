//! WebAssembly module for the stock lookup front-end
//!
//! Provides client-side computation for:
//! - Stock level classification (same rules as the server)
//! - Stock level labels
//! - Quantity formatting (fr-FR)

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

pub use shared::models::*;

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Classify an on-hand quantity against a minimum threshold; returns the wire name
#[wasm_bindgen]
pub fn classify_stock_level(on_hand: f64, threshold: f64) -> String {
    classify(to_decimal(on_hand), to_decimal(threshold))
        .as_str()
        .to_string()
}

/// Label for a level wire name (`rupture`, `bas`, `normal`, `surplus`)
#[wasm_bindgen]
pub fn stock_level_label(level: &str) -> Result<String, JsValue> {
    StockLevel::parse(level)
        .map(|l| l.label().to_string())
        .ok_or_else(|| JsValue::from_str(&format!("Unknown stock level: {}", level)))
}

/// Available quantity, `on_hand - reserved`
#[wasm_bindgen]
pub fn available(on_hand: f64, reserved: f64) -> f64 {
    available_quantity(to_decimal(on_hand), to_decimal(reserved))
        .to_f64()
        .unwrap_or(0.0)
}

/// Format a quantity the French way, followed by its unit unless the unit is a
/// numeric ERP code or blank
#[wasm_bindgen]
pub fn format_quantity(quantity: f64, unit: Option<String>) -> String {
    let formatted = format_fr(to_decimal(quantity));
    match unit.as_deref().map(str::trim) {
        Some(u) if !u.is_empty() && !u.chars().all(|c| c.is_ascii_digit()) => {
            format!("{} {}", formatted, u)
        }
        _ => formatted,
    }
}

// Narrow no-break space as thousands separator, comma as decimal mark, at most 3 decimals.
fn format_fr(value: Decimal) -> String {
    let rounded = value.round_dp(3).normalize();
    let text = rounded.abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (text, None),
    };

    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('\u{202f}');
        }
        grouped.push(c);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{}{},{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_matches_server_rules() {
        assert_eq!(classify_stock_level(0.0, 10.0), "rupture");
        assert_eq!(classify_stock_level(10.0, 10.0), "bas");
        assert_eq!(classify_stock_level(31.0, 10.0), "surplus");
        assert_eq!(classify_stock_level(5.0, 0.0), "normal");
    }

    #[test]
    fn formats_thousands_and_decimals() {
        assert_eq!(format_quantity(1234567.0, None), "1\u{202f}234\u{202f}567");
        assert_eq!(format_quantity(12.5, Some("KG".into())), "12,5 KG");
        assert_eq!(format_quantity(-1500.25, None), "-1\u{202f}500,25");
    }

    #[test]
    fn numeric_units_are_hidden() {
        assert_eq!(format_quantity(3.0, Some("12".into())), "3");
        assert_eq!(format_quantity(3.0, Some("  ".into())), "3");
    }

    #[test]
    fn available_can_go_negative() {
        assert_eq!(available(2.0, 5.0), -3.0);
    }
}

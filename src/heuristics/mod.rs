// src/heuristics/mod.rs

mod nfe;

pub use nfe::{is_header, normalize_whitespace, segment_rows, truncate_at_embedded_unit, RowMatch};

use serde::Deserialize;
use serde::Serialize;

/// A candidate product recovered from one invoice row.
///
/// Nothing here is persisted; the caller curates these before saving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedItem {
    pub name: String,
    /// Always 1. Package-size digits in the name are not purchase quantities.
    pub quantity: u32,
    pub unit_price: f64,
    pub total: f64,
    /// Unit-of-sale code from the row anchor, upper-cased.
    pub unit: String,
    /// Raw matched text, kept for audit.
    pub original_line: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_category: Option<String>,
}

/// Extract candidate line items from extracted invoice text.
pub fn extract_items(text: &str) -> Vec<ParsedItem> {
    nfe::extract(text)
}

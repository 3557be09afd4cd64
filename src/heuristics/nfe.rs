//! Row heuristics for Brazilian NFe / NFCe style invoices.
//!
//! Text arrives as a whitespace-joined token stream, so column alignment is
//! gone. A row is recognised by its shape instead:
//!
//! ```text
//! 0001 7891000050 LEITE INTEGRAL 1L 02/05/2026 10,0000 5,99 59,90 UN
//! ^id  ^junk      ^description ...                                ^unit
//! ```

use super::ParsedItem;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use tracing::{debug, trace};

/// Names shorter than this (in characters) are noise.
const MIN_NAME_CHARS: usize = 3;

/// Numeric id token, non-letter junk, a description starting with a letter,
/// then the unit-of-sale column. The description is lazy so the first
/// standalone unit token closes the row. Group 1 is the row without the
/// leading whitespace.
static ID_ROW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:^|\s)(\d+\s[^\p{L}]*(\p{L}.*?)\s+(UND|UN|KG|LITRO|L|CX|PC|FD|GRAMAS|ML|M)\b)",
    )
    .expect("row anchor pattern is valid")
});

/// Same row shape without the id, for layouts that drop the item number.
static BARE_ROW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\b\p{L}.*?)\s+(UND|UN|KG|LITRO|L|CX|PC|FD|GRAMAS|ML|M)\b")
        .expect("bare row pattern is valid")
});

/// Next unit-of-sale token, used when a row closed on a package size.
static TERMINATOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(UND|UN|KG|LITRO|L|CX|PC|FD|GRAMAS|ML|M)\b")
        .expect("terminator pattern is valid")
});

/// Packaging size written inside a description: "2L", "170g", "600 ml".
static EMBEDDED_UNIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\d+(?:[.,]\d+)?\s?(?:MILILITROS|LITROS|GRAMAS|KG|ML|K|L|M|G)\b")
        .expect("embedded unit pattern is valid")
});

const HEADER_WORDS: &[&str] = &[
    "DESCRIÇÃO",
    "DESCRICAO",
    "PRODUTO",
    "PRODUTOS",
    "CÓDIGO",
    "CODIGO",
    "QTD",
    "QTDE",
    "QUANTIDADE",
    "VALOR",
    "TOTAL",
    "DETALHE",
    "UNITÁRIO",
    "UNITARIO",
    "ICMS",
];

const CONNECTORS: &[&str] = &["DE", "DO", "DA"];

/// Unit tokens that also describe a package size ("600 ml", "5 KG").
const SIZE_UNITS: &[&str] = &["KG", "LITRO", "L", "GRAMAS", "ML", "M"];

/// One anchored row, borrowed from the normalized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowMatch<'a> {
    /// Whole match, id and unit included.
    pub line: &'a str,
    /// Raw description, before embedded-unit truncation.
    pub name: &'a str,
    /// Terminating unit token as written.
    pub unit: &'a str,
}

pub fn extract(text: &str) -> Vec<ParsedItem> {
    let normalized = normalize_whitespace(text);

    let items: Vec<ParsedItem> = segment_rows(&normalized)
        .into_iter()
        .filter_map(|row| {
            let name = truncate_at_embedded_unit(row.name);
            if name.chars().count() < MIN_NAME_CHARS {
                trace!(name, "dropping short name");
                return None;
            }

            Some(ParsedItem {
                name: name.to_string(),
                quantity: 1,
                unit_price: 0.0,
                total: 0.0,
                unit: row.unit.to_uppercase(),
                original_line: row.line.to_string(),
                suggested_category: None,
            })
        })
        .collect();

    debug!(
        chars = normalized.len(),
        items = items.len(),
        "Line items extracted"
    );
    items
}

/// Collapse every whitespace run, newlines included, to a single space.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Byte ranges of one candidate row inside the scanned text.
#[derive(Debug, Clone)]
struct Span {
    line: Range<usize>,
    name: Range<usize>,
    unit: Range<usize>,
}

/// Scan `text` left to right for data rows, skipping table headers.
///
/// Rows anchored on a numeric id win over id-less matches that run into
/// them, so text before the table (title, issuer, CNPJ) never joins the
/// first item. Rows never overlap and rejected headers are skipped whole.
pub fn segment_rows(text: &str) -> Vec<RowMatch<'_>> {
    let mut rows = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
        let id_row = id_row_at(text, pos);
        let bare_row = bare_row_at(text, pos);

        let row = match (id_row, bare_row) {
            (Some(id), Some(bare)) if bare.line.end <= id.line.start => bare,
            (Some(id), _) => id,
            (None, Some(bare)) => bare,
            (None, None) => break,
        };
        let row = extend_past_package_size(text, row);
        pos = row.line.end;

        let name = &text[row.name.clone()];
        if is_header(name) {
            trace!(name, "skipping header row");
            continue;
        }

        rows.push(RowMatch {
            line: &text[row.line],
            name,
            unit: &text[row.unit],
        });
    }

    rows
}

fn id_row_at(text: &str, pos: usize) -> Option<Span> {
    let caps = ID_ROW_RE.captures_at(text, pos)?;
    Some(Span {
        line: caps.get(1)?.range(),
        name: caps.get(2)?.range(),
        unit: caps.get(3)?.range(),
    })
}

fn bare_row_at(text: &str, pos: usize) -> Option<Span> {
    let caps = BARE_ROW_RE.captures_at(text, pos)?;
    Some(Span {
        line: caps.get(0)?.range(),
        name: caps.get(1)?.range(),
        unit: caps.get(2)?.range(),
    })
}

/// A row that closed on "<integer> <size unit>" ("SUCO UVA 600 ml ...") hit
/// the packaging size, not the unit column. Push the end out to the next
/// unit token, as long as that stays before the next id-anchored row.
fn extend_past_package_size(text: &str, mut row: Span) -> Span {
    loop {
        let ends_with_count = text[row.name.clone()]
            .split_whitespace()
            .next_back()
            .is_some_and(|t| t.bytes().all(|b| b.is_ascii_digit()));
        let is_size = SIZE_UNITS.contains(&text[row.unit.clone()].to_uppercase().as_str());
        if !ends_with_count || !is_size {
            return row;
        }

        let Some(caps) = TERMINATOR_RE.captures_at(text, row.unit.end) else {
            return row;
        };
        let (Some(whole), Some(unit)) = (caps.get(0), caps.get(1)) else {
            return row;
        };
        let limit = ID_ROW_RE
            .find_at(text, row.unit.end)
            .map_or(text.len(), |m| m.start());
        if whole.end() > limit {
            return row;
        }

        row.name.end = whole.start();
        row.unit = unit.range();
        row.line.end = unit.end();
    }
}

/// True when `name` reads like table-header text rather than a product.
///
/// A header is either made only of header words (plus short connectors) or
/// mentions at least two distinct header words.
pub fn is_header(name: &str) -> bool {
    let words: Vec<String> = name
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_uppercase())
        .filter(|w| !w.is_empty())
        .collect();

    let mut hits: Vec<&str> = words
        .iter()
        .map(String::as_str)
        .filter(|w| HEADER_WORDS.contains(w))
        .collect();
    hits.sort_unstable();
    hits.dedup();

    if hits.is_empty() {
        return false;
    }

    let only_header = words
        .iter()
        .all(|w| HEADER_WORDS.contains(&w.as_str()) || CONNECTORS.contains(&w.as_str()));

    only_header || hits.len() >= 2
}

/// Cut `name` right after its first embedded unit ("Coca Cola 2L Promo" ->
/// "Coca Cola 2L"). Without one, the trimmed name is returned as is.
pub fn truncate_at_embedded_unit(name: &str) -> &str {
    match EMBEDDED_UNIT_RE.find(name) {
        Some(m) => name[..m.end()].trim(),
        None => name.trim(),
    }
}

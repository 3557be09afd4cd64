//! Invoice PDF import for Zero Perda.
//!
//! Extracts text from an invoice PDF, recovers candidate products with
//! row heuristics, and supports the human review step that decides what
//! gets saved.

pub mod config;
pub mod curation;
pub mod error;
pub mod heuristics;
pub mod import;
pub mod pdf_extract;
pub mod setup;

pub use curation::{ImportSession, ProductDraft};
pub use error::ImportError;
pub use heuristics::{extract_items, ParsedItem};
pub use import::{import_invoice, import_invoice_async, import_text, ImportReport};

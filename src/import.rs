// src/import.rs

use crate::error::ImportError;
use crate::heuristics::{self, ParsedItem};
use crate::pdf_extract::{self, ExtractedDocument};
use serde::Serialize;
use tracing::{info, warn};

/// Shown to the user when a readable document yields no rows.
pub const EMPTY_RESULT_HINT: &str = "No items detected. Try a different or clearer PDF.";

/// Outcome of one import: candidates plus enough context to audit them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub fingerprint: String,
    pub page_count: u32,
    pub likely_scanned: bool,
    pub items: Vec<ParsedItem>,
}

impl ImportReport {
    fn from_document(doc: &ExtractedDocument) -> Self {
        let items = heuristics::extract_items(&doc.text());

        if items.is_empty() {
            warn!(
                fingerprint = %doc.fingerprint,
                pages = doc.page_count,
                likely_scanned = doc.likely_scanned,
                "No line items found"
            );
        } else {
            info!(
                fingerprint = %doc.fingerprint,
                pages = doc.page_count,
                items = items.len(),
                "Line items found"
            );
        }

        ImportReport {
            fingerprint: doc.fingerprint.clone(),
            page_count: doc.page_count,
            likely_scanned: doc.likely_scanned,
            items,
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        self.items.is_empty().then_some(EMPTY_RESULT_HINT)
    }
}

/// Extract and parse an invoice PDF.
pub fn import_invoice(pdf_bytes: &[u8]) -> Result<ImportReport, ImportError> {
    let span = tracing::info_span!("import", bytes = pdf_bytes.len());
    let _guard = span.enter();

    let doc = pdf_extract::extract_document(pdf_bytes)?;
    Ok(ImportReport::from_document(&doc))
}

/// Async variant; page extraction runs on the blocking pool.
pub async fn import_invoice_async(pdf_bytes: Vec<u8>) -> Result<ImportReport, ImportError> {
    let bytes = pdf_bytes.len();
    let doc = pdf_extract::extract_document_async(pdf_bytes).await?;

    let span = tracing::info_span!("import", bytes);
    let _guard = span.enter();
    Ok(ImportReport::from_document(&doc))
}

/// Parse text that was already extracted elsewhere.
pub fn import_text(text: &str) -> Vec<ParsedItem> {
    heuristics::extract_items(text)
}

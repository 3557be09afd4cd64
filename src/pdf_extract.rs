// src/pdf_extract.rs

use crate::error::ImportError;
use crate::heuristics::normalize_whitespace;
use crate::setup;
use lopdf::Document;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Text of one page, tokens joined by single spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-indexed page number.
    pub number: u32,
    pub text: String,
}

/// Everything the importer needs from a PDF.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Pages in the PDF page tree. After the pdf-extract fallback `pages`
    /// holds a single entry, so the two can differ.
    pub page_count: u32,
    /// Page texts in ascending page order.
    pub pages: Vec<PageText>,
    /// SHA-256 of the raw bytes, hex encoded.
    pub fingerprint: String,
    /// Most pages carry images but no fonts. Informational only.
    pub likely_scanned: bool,
}

impl ExtractedDocument {
    /// All page texts, each terminated by a newline.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for page in &self.pages {
            out.push_str(&page.text);
            out.push('\n');
        }
        out
    }
}

type PageResult = (u32, Result<String, lopdf::Error>);

/// Extract page texts from raw PDF bytes, one page at a time.
pub fn extract_document(pdf_bytes: &[u8]) -> Result<ExtractedDocument, ImportError> {
    let doc = load(pdf_bytes)?;

    let results: Vec<PageResult> = doc
        .get_pages()
        .keys()
        .map(|&number| (number, doc.extract_text(&[number])))
        .collect();

    assemble(&doc, pdf_bytes, results)
}

/// Same as [`extract_document`], but runs on tokio's blocking pool.
///
/// With `parallel_pages` enabled every page gets its own blocking task;
/// results are put back in page order before assembly.
pub async fn extract_document_async(pdf_bytes: Vec<u8>) -> Result<ExtractedDocument, ImportError> {
    let settings = setup::extractor_settings();
    let bytes = Arc::new(pdf_bytes);

    if !settings.parallel_pages {
        return tokio::task::spawn_blocking(move || extract_document(&bytes))
            .await
            .map_err(|e| ImportError::unreadable(e.to_string()))?;
    }

    let doc = {
        let bytes = Arc::clone(&bytes);
        tokio::task::spawn_blocking(move || load(&bytes))
            .await
            .map_err(|e| ImportError::unreadable(e.to_string()))??
    };
    let doc = Arc::new(doc);

    let mut tasks = JoinSet::new();
    for &number in doc.get_pages().keys() {
        let doc = Arc::clone(&doc);
        tasks.spawn_blocking(move || (number, doc.extract_text(&[number])));
    }

    let mut results: Vec<PageResult> = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let result = joined.map_err(|e| {
            warn!(error = %e, "Page extraction task failed");
            ImportError::unreadable(e.to_string())
        })?;
        results.push(result);
    }
    debug!(pages = results.len(), "Page tasks joined");

    tokio::task::spawn_blocking(move || assemble(&doc, &bytes, results))
        .await
        .map_err(|e| ImportError::unreadable(e.to_string()))?
}

/// SHA-256 of the document bytes, used to tie a report to its source file.
pub fn fingerprint(pdf_bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pdf_bytes);
    format!("{:x}", hasher.finalize())
}

fn load(pdf_bytes: &[u8]) -> Result<Document, ImportError> {
    let doc = Document::load_mem(pdf_bytes).map_err(|e| {
        warn!(error = %e, "Failed to parse PDF");
        ImportError::from(e)
    })?;

    if doc.is_encrypted() {
        warn!("PDF is encrypted");
        return Err(ImportError::unreadable("document is encrypted"));
    }

    Ok(doc)
}

fn assemble(
    doc: &Document,
    pdf_bytes: &[u8],
    mut results: Vec<PageResult>,
) -> Result<ExtractedDocument, ImportError> {
    results.sort_by_key(|(number, _)| *number);
    let page_count = doc.get_pages().len() as u32;

    let mut pages = Vec::with_capacity(results.len());
    for (number, result) in results {
        match result {
            Ok(raw) => pages.push(PageText {
                number,
                text: normalize_whitespace(&raw),
            }),
            Err(e) => {
                warn!(page = number, error = %e, "lopdf could not read page, trying pdf-extract");
                pages = fallback_pages(pdf_bytes)?;
                break;
            }
        }
    }

    let chars: usize = pages.iter().map(|p| p.text.len()).sum();
    let likely_scanned = looks_like_scanned(doc);
    info!(
        pages = page_count,
        texts = pages.len(),
        chars,
        likely_scanned,
        "Text extracted"
    );

    Ok(ExtractedDocument {
        page_count,
        pages,
        fingerprint: fingerprint(pdf_bytes),
        likely_scanned,
    })
}

/// Whole-document extraction with pdf-extract, reported as a single page.
fn fallback_pages(pdf_bytes: &[u8]) -> Result<Vec<PageText>, ImportError> {
    let text = pdf_extract::extract_text_from_mem(pdf_bytes).map_err(|e| {
        warn!(error = %e, "pdf-extract failed as well");
        ImportError::unreadable(e.to_string())
    })?;

    Ok(vec![PageText {
        number: 1,
        text: normalize_whitespace(&text),
    }])
}

/// Heuristic: inspect the PDF object tree for signs that the pages
/// are just images with no text operators.
///
/// A page with XObject images but **no** Font resources is almost
/// certainly scanned; at 80% such pages the whole document is.
pub fn looks_like_scanned(doc: &Document) -> bool {
    let pages = doc.get_pages();
    if pages.is_empty() {
        return false;
    }

    let mut image_only_pages = 0;

    for object_id in pages.values() {
        let Ok(page_dict) = doc.get_dictionary(*object_id) else {
            continue;
        };

        let resources = page_dict
            .get(b"Resources")
            .ok()
            .and_then(|r| doc.dereference(r).ok())
            .and_then(|(_, resolved)| resolved.as_dict().ok());

        let has_entries = |key: &[u8]| {
            resources
                .and_then(|res| res.get(key).ok())
                .and_then(|o| doc.dereference(o).ok())
                .and_then(|(_, resolved)| resolved.as_dict().ok())
                .is_some_and(|dict| !dict.is_empty())
        };

        if has_entries(b"XObject") && !has_entries(b"Font") {
            image_only_pages += 1;
        }
    }

    let ratio = image_only_pages as f64 / pages.len() as f64;
    debug!(
        total_pages = pages.len(),
        image_only = image_only_pages,
        ratio = format!("{ratio:.2}"),
        "Scanned-page analysis"
    );

    ratio >= 0.8
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// Builds a PDF with one line of Courier text per page.
    pub(crate) fn sample_pdf(lines: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for line in lines {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 10.into()]),
                    Operation::new("Td", vec![40.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    /// One image-only page per entry in `with_font`; `true` adds a font too.
    fn image_pages(with_font: &[bool]) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![0],
        ));
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });

        let mut kids: Vec<Object> = Vec::new();
        for &font in with_font {
            let mut resources = dictionary! {
                "XObject" => dictionary! { "Im1" => image_id },
            };
            if font {
                resources.set("Font", dictionary! { "F1" => font_id });
            }
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                b"q 595 0 0 842 0 0 cm /Im1 Do Q".to_vec(),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    #[test]
    fn test_garbage_bytes() {
        let result = extract_document(b"this is not a pdf");
        assert!(matches!(result, Err(ImportError::UnreadableDocument { .. })));
    }

    #[test]
    fn test_empty_bytes() {
        let result = extract_document(&[]);
        assert!(matches!(result, Err(ImportError::UnreadableDocument { .. })));
    }

    #[test]
    fn test_pages_in_ascending_order() {
        let pdf = sample_pdf(&[
            "0001 789 LEITE INTEGRAL 1L 5,99 UN",
            "0002 789 ARROZ BRANCO 5KG 20,00 KG",
        ]);

        let doc = extract_document(&pdf).unwrap();
        assert_eq!(doc.page_count, 2);
        assert_eq!(
            doc.pages.iter().map(|p| p.number).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert!(doc.pages[0].text.contains("LEITE INTEGRAL 1L"));
        assert!(doc.pages[1].text.contains("ARROZ BRANCO 5KG"));
        assert!(!doc.likely_scanned);

        let text = doc.text();
        assert!(text.ends_with('\n'));
        assert_eq!(text.lines().count(), 2);
        assert!(text.find("LEITE").unwrap() < text.find("ARROZ").unwrap());
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let pdf = sample_pdf(&["0001 789 SAL REFINADO 1KG 2,49 UN"]);
        let first = extract_document(&pdf).unwrap();
        let second = extract_document(&pdf).unwrap();

        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(first.fingerprint, fingerprint(&pdf));
        assert_eq!(first.fingerprint.len(), 64);
        assert_ne!(fingerprint(b"a"), fingerprint(b"b"));
    }

    #[tokio::test]
    async fn test_async_matches_sync() {
        let pdf = sample_pdf(&[
            "0001 789 CAFE 500G 1 UN",
            "0002 789 ACUCAR 1KG 4,20 KG",
            "0003 789 OLEO SOJA 900ML 7,80 UN",
        ]);

        let sync = extract_document(&pdf).unwrap();
        let parallel = extract_document_async(pdf).await.unwrap();
        assert_eq!(sync.pages, parallel.pages);
        assert_eq!(sync.fingerprint, parallel.fingerprint);
    }

    #[tokio::test]
    async fn test_async_garbage_bytes() {
        let result = extract_document_async(b"not a pdf at all".to_vec()).await;
        assert!(matches!(result, Err(ImportError::UnreadableDocument { .. })));
    }

    #[test]
    fn test_encrypted_document_is_unreadable() {
        let pdf = sample_pdf(&["0001 789 LEITE INTEGRAL 1L 5,99 UN"]);
        let mut doc = Document::load_mem(&pdf).unwrap();
        doc.trailer.set(
            "Encrypt",
            dictionary! {
                "Filter" => "Standard",
                "V" => 1,
                "R" => 2,
                "Length" => 40,
                "P" => -4,
            },
        );
        let mut encrypted = Vec::new();
        doc.save_to(&mut encrypted).unwrap();

        let result = extract_document(&encrypted);
        assert!(matches!(result, Err(ImportError::UnreadableDocument { .. })));
    }

    #[test]
    fn test_scanned_pages_detected() {
        assert!(looks_like_scanned(&image_pages(&[false, false])));
        // 4 of 5 pages image-only is still a scan.
        assert!(looks_like_scanned(&image_pages(&[false, false, false, false, true])));
        assert!(!looks_like_scanned(&image_pages(&[false, true])));
        assert!(!looks_like_scanned(&image_pages(&[])));

        let text_pdf = sample_pdf(&["0001 789 SAL REFINADO 1KG 2,49 UN"]);
        assert!(!looks_like_scanned(&Document::load_mem(&text_pdf).unwrap()));
    }

    #[test]
    fn test_fallback_reports_single_page() {
        let pdf = sample_pdf(&[
            "0001 789 LEITE INTEGRAL 1L 5,99 UN",
            "0002 789 ARROZ BRANCO 5KG 20,00 KG",
        ]);

        let pages = fallback_pages(&pdf).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, 1);

        let err = fallback_pages(b"this is not a pdf").unwrap_err();
        assert!(matches!(err, ImportError::UnreadableDocument { .. }));
    }

    #[test]
    fn test_page_count_follows_page_tree() {
        let pdf = sample_pdf(&["0001 789 CAFE 500G 1 UN", "0002 789 SAL 1KG 2,49 UN"]);
        let doc = Document::load_mem(&pdf).unwrap();

        let extracted = assemble(&doc, &pdf, Vec::new()).unwrap();
        assert_eq!(extracted.page_count, 2);
        assert!(extracted.pages.is_empty());
    }
}

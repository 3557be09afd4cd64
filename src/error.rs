// src/error.rs

/// Errors surfaced to callers of the import pipeline.
///
/// Low-level decoding failures never leak out directly; they are folded into
/// `UnreadableDocument` and kept only as the error source for logging.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("could not read the file; confirm it is a valid PDF")]
    UnreadableDocument {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("select at least one item to save")]
    NothingSelected,
}

impl ImportError {
    pub(crate) fn unreadable(reason: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        ImportError::UnreadableDocument {
            source: reason.into(),
        }
    }
}

impl From<lopdf::Error> for ImportError {
    fn from(e: lopdf::Error) -> Self {
        ImportError::unreadable(e.to_string())
    }
}

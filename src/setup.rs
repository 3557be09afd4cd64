//! Process-wide initialization.
//!
//! Call [`init`] once from the binary (or test harness) before the first
//! import. Repeated calls are harmless: the tracing subscriber is installed
//! at most once and the first extractor settings stay in effect. Imports run
//! before `init` use [`ExtractorSettings::default`].

use crate::config::Config;
use once_cell::sync::OnceCell;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractorSettings {
    /// Extract pages concurrently in `extract_document_async`.
    pub parallel_pages: bool,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            parallel_pages: true,
        }
    }
}

static EXTRACTOR: OnceCell<ExtractorSettings> = OnceCell::new();

pub fn init(config: &Config) {
    let installed = tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(config.log_filter.as_str())
        .try_init();
    if installed.is_err() {
        debug!("Tracing subscriber already installed");
    }

    let wanted = ExtractorSettings {
        parallel_pages: config.import.parallel_pages,
    };
    let active = *EXTRACTOR.get_or_init(|| wanted);
    if active != wanted {
        debug!(?active, ?wanted, "Extractor already configured, keeping first settings");
    }
}

/// Settings fixed by [`init`], or the defaults if it never ran.
pub fn extractor_settings() -> ExtractorSettings {
    EXTRACTOR.get().copied().unwrap_or_default()
}

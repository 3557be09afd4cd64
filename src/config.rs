use serde::Deserialize;
use std::{fs, path::Path};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub import: ImportConfig,
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_section() -> String {
    "IMPORTADOS".to_string()
}

fn default_parallel_pages() -> bool {
    true
}

/// Settings for the PDF import flow.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// Section assigned to curated items that never got a category.
    #[serde(default = "default_section")]
    pub default_section: String,
    /// Expiration offset (in days) proposed for the first stock batch.
    #[serde(default)]
    pub default_expiry_days: Option<u32>,
    /// Extract pages concurrently on the blocking pool.
    #[serde(default = "default_parallel_pages")]
    pub parallel_pages: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            default_section: default_section(),
            default_expiry_days: None,
            parallel_pages: default_parallel_pages(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            import: ImportConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

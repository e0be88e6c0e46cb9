//! Runtime configuration for the mapping engine.
//!
//! Only two concerns live here: which locales exist (and which one is the
//! default), and how the engine should treat configurations without
//! localization at all. Everything else the engine needs comes from the
//! schema registry.

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::MappingResult;

/// Locale requested as `"all"` disables locale equality constraints and makes
/// reads return every stored locale.
pub const ALL_LOCALES: &str = "all";

/// Localization settings shared by the path resolver and the row transformer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalizationConfig {
    /// Locale codes in declaration order, e.g. `["en", "es"]`.
    pub locales: Vec<String>,
    /// Locale used when a has-many field has no stored rows.
    pub default_locale: String,
}

impl LocalizationConfig {
    pub fn new(locales: Vec<String>, default_locale: impl Into<String>) -> Self {
        Self {
            locales,
            default_locale: default_locale.into(),
        }
    }

    /// True if `code` is one of the configured locale codes.
    pub fn has_locale(&self, code: &str) -> bool {
        self.locales.iter().any(|l| l == code)
    }
}

/// Top-level engine configuration, loadable from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MappingConfig {
    /// Absent means localization is disabled: localized flags on fields are
    /// ignored and no `_locales` tables are ever joined.
    pub localization: Option<LocalizationConfig>,
}

impl MappingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_localization(mut self, localization: LocalizationConfig) -> Self {
        self.localization = Some(localization);
        self
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> MappingResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&contents)?;
        info!(
            "Loaded mapping config from {} ({} locales)",
            path.as_ref().display(),
            config
                .localization
                .as_ref()
                .map(|l| l.locales.len())
                .unwrap_or(0)
        );
        Ok(config)
    }

    /// The configured locales, if localization is enabled.
    pub fn localization(&self) -> Option<&LocalizationConfig> {
        self.localization.as_ref()
    }
}

//! Key/value parameters the scenarios read
//!
//! Values come from a parameter file (format inferred from its extension:
//! toml, ini, json or yaml) and can be overridden per key through the
//! environment, either under the bare key name (`webUrl=...`) or as
//! `STOREFRONT_PARAM_<KEY>` (`STOREFRONT_PARAM_WEBURL=...`), the latter
//! taking precedence.

use crate::{Error, Result};
use config::{Config as Settings, File};
use std::path::Path;
use tracing::debug;

/// Prefix for per-key environment overrides
pub const ENV_PREFIX: &str = "STOREFRONT_PARAM_";

/// Storefront entry URL
pub const WEB_URL: &str = "webUrl";
/// Browser to drive
pub const BROWSER_NAME: &str = "browserName";
/// Login submitted by the authorization check
pub const LOGIN: &str = "login";
/// Password submitted by the authorization check
pub const PASSWORD: &str = "password";
/// Title the start page is expected to have
pub const CORRECT_TITLE: &str = "correctTitle";
/// Deliberately wrong title
pub const WRONG_TITLE: &str = "wrongTitle";
/// Query typed into the search box
pub const SEARCH_QUERY: &str = "searchQuery";

/// Read-only view over the suite parameters
#[derive(Debug, Clone)]
pub struct ParametersProvider {
    settings: Settings,
    source: String,
}

impl ParametersProvider {
    /// Load parameters from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("parameter file not found: {}", path.display()),
            )));
        }

        let settings = Settings::builder()
            .add_source(File::from(path))
            .build()
            .map_err(|e| {
                Error::configuration(format!("Failed to load {}: {}", path.display(), e))
            })?;

        debug!("Loaded parameters from {}", path.display());

        Ok(Self {
            settings,
            source: path.display().to_string(),
        })
    }

    /// Build parameters from literal pairs, mostly for tests and dry runs
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut builder = Settings::builder();
        for (key, value) in pairs {
            builder = builder
                .set_override(key.as_ref(), value.into())
                .map_err(|e| Error::configuration(e.to_string()))?;
        }

        let settings = builder
            .build()
            .map_err(|e| Error::configuration(e.to_string()))?;

        Ok(Self {
            settings,
            source: "<inline>".to_string(),
        })
    }

    /// Look up a parameter; missing keys fail with `ConfigKeyMissing`
    pub fn get_property(&self, key: &str) -> Result<String> {
        if let Ok(value) = std::env::var(format!("{}{}", ENV_PREFIX, key.to_uppercase())) {
            return Ok(value);
        }

        if let Ok(value) = std::env::var(key) {
            return Ok(value);
        }

        self.settings
            .get_string(key)
            .or_else(|_| self.settings.get_string(&key.to_lowercase()))
            .map_err(|_| {
                Error::config_key_missing(format!("{} (source: {})", key, self.source))
            })
    }

    /// Look up an optional parameter
    pub fn get_optional(&self, key: &str) -> Result<Option<String>> {
        match self.get_property(key) {
            Ok(value) => Ok(Some(value)),
            Err(Error::ConfigKeyMissing(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Where the parameters were loaded from
    pub fn source(&self) -> &str {
        &self.source
    }
}

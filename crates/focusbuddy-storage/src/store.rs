//! JSON-file stores for user settings and category rules.

use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{AppSettings, CategoryRule};

pub const SETTINGS_FILE: &str = "settings.json";
pub const RULES_FILE: &str = "category-rules.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
}

/// Write through a sibling temp file so readers never see a half-written file.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let raw = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, raw).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)
}

/// Reads and writes `settings.json`
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    #[must_use]
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SETTINGS_FILE),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, writing the defaults on first use
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or (on first use) written
    pub fn load(&self) -> Result<AppSettings, StoreError> {
        if let Some(settings) = read_json(&self.path)? {
            return Ok(settings);
        }

        let defaults = AppSettings::default();
        self.save(&defaults)?;
        log::info!("Wrote default settings to {}", self.path.display());
        Ok(defaults)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save(&self, settings: &AppSettings) -> Result<(), StoreError> {
        write_json(&self.path, settings)
    }
}

/// Reads and writes `category-rules.json`
#[derive(Debug, Clone)]
pub struct RuleStore {
    path: PathBuf,
}

impl RuleStore {
    #[must_use]
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(RULES_FILE),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the ordered rule list; a missing file means no rules
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn load(&self) -> Result<Vec<CategoryRule>, StoreError> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save(&self, rules: &[CategoryRule]) -> Result<(), StoreError> {
        write_json(&self.path, &rules)
    }
}

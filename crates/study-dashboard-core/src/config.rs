//! Dashboard configuration file.
//!
//! A small JSON document naming the dataset and (optionally) a separate note
//! file. Relative paths are resolved against the directory holding the config.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current config version. Each bump needs a step in [`migrate`].
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(
        "config_version {found} is newer than this build supports ({})",
        CURRENT_CONFIG_VERSION
    )]
    UnsupportedVersion { found: u32 },

    #[error("Config is not a JSON object")]
    NotAnObject,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Missing or 0 means a pre-versioned config
    #[serde(default)]
    pub config_version: u32,
    /// Patient dataset file
    pub data_path: PathBuf,
    /// Note file. Defaults to the dataset file itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes_path: Option<PathBuf>,
}

impl DashboardConfig {
    /// Config for a dataset whose notes are stored in the same file.
    pub fn for_data<P: Into<PathBuf>>(data_path: P) -> Self {
        Self {
            config_version: CURRENT_CONFIG_VERSION,
            data_path: data_path.into(),
            notes_path: None,
        }
    }

    pub fn with_notes<P: Into<PathBuf>>(mut self, notes_path: P) -> Self {
        self.notes_path = Some(notes_path.into());
        self
    }

    /// Where notes are read and written.
    pub fn notes_path(&self) -> &Path {
        self.notes_path.as_deref().unwrap_or(&self.data_path)
    }

    /// Read a config file, migrating older versions.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let json: serde_json::Value = serde_json::from_str(&contents)?;
        let on_disk_version = json
            .get("config_version")
            .and_then(|v| v.as_u64())
            .map_or(0, |v| u32::try_from(v).unwrap_or(u32::MAX));

        let mut config: Self = serde_json::from_value(migrate(json, on_disk_version)?)?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.data_path = resolve(base, &config.data_path);
        config.notes_path = config.notes_path.map(|p| resolve(base, &p));

        tracing::debug!(path = %path.display(), data = %config.data_path.display(), "config loaded");
        Ok(config)
    }

    /// Write the config, stamped with the current version.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let path = path.as_ref();
        let io_err = |source: io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut stamped = self.clone();
        stamped.config_version = CURRENT_CONFIG_VERSION;
        let json = serde_json::to_string_pretty(&stamped)?;

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(io_err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;

        tracing::info!(path = %path.display(), "config saved");
        Ok(())
    }
}

/// Sequential migrations from `from_version` up to [`CURRENT_CONFIG_VERSION`].
fn migrate(mut json: serde_json::Value, from_version: u32) -> ConfigResult<serde_json::Value> {
    if from_version > CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion {
            found: from_version,
        });
    }

    // v0 -> v1: `csv_file` renamed to `data_path`
    if from_version < 1 {
        let obj = json.as_object_mut().ok_or(ConfigError::NotAnObject)?;
        if let Some(old) = obj.remove("csv_file") {
            obj.entry("data_path").or_insert(old);
        }
        obj.insert("config_version".to_string(), serde_json::Value::from(1));
        tracing::info!("migrated config v0 -> v1 (csv_file renamed to data_path)");
    }

    Ok(json)
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

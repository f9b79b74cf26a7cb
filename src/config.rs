// Configuration loaded from a YAML file

use crate::slots::{FileSlots, SlotBackend, SqliteSlots};
use crate::store::TaskStore;
use crate::view::DEFAULT_PAGE_SIZE;
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{Level, debug};

/// Where the task slots are kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// `taskboard.db` in the data directory
    #[default]
    Sqlite,
    /// One `<slot>.json` file per slot in the data directory
    Json,
}

/// Settings for the CLI. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub backend: Backend,
    pub page_size: usize,
    /// One of trace, debug, info, warn, error
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: Backend::default(),
            page_size: DEFAULT_PAGE_SIZE,
            log_level: "warn".to_string(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskboard")
}

impl Config {
    /// `<config dir>/taskboard/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("taskboard").join("config.yaml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the default location is
    /// tried and a missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => {
                    debug!("No config file, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let raw = fs::read_to_string(&path).with_context(|| format!("Failed to read config file {:?}", path))?;
        let config = Self::from_yaml(&raw).with_context(|| format!("Invalid config file {:?}", path))?;
        debug!(path = ?path, ?config, "Loaded config");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(raw).context("Failed to parse YAML")?;
        if config.page_size == 0 {
            return Err(eyre!("page_size must be at least 1"));
        }
        Ok(config)
    }

    /// Log level, falling back to WARN for unknown names
    pub fn log_level(&self) -> Level {
        Level::from_str(self.log_level.trim()).unwrap_or(Level::WARN)
    }

    /// Open the configured slot backend
    pub fn open_slots(&self) -> Result<Box<dyn SlotBackend>> {
        let slots: Box<dyn SlotBackend> = match self.backend {
            Backend::Sqlite => Box::new(SqliteSlots::open(&self.data_dir)?),
            Backend::Json => Box::new(FileSlots::open(&self.data_dir)?),
        };
        Ok(slots)
    }

    /// Open the task store on the configured backend
    pub fn open_store(&self) -> Result<TaskStore> {
        Ok(TaskStore::open(self.open_slots()?))
    }
}

//! Client configuration, read from an optional RON file.
//!
//! Every field may be omitted; omitted fields keep the transport defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;
use translator_engine::{SettingsError, TransportSettings};
use translator_logging::LogDestination;

const DEFAULT_LOG_FILE: &str = "./translator.log";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("unknown log level {0:?}")]
    InvalidLevel(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum LogTarget {
    #[default]
    Terminal,
    File,
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub target: LogTarget,
    pub file: Option<PathBuf>,
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            target: LogTarget::Terminal,
            file: None,
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub upload_chunk_size: Option<usize>,
    pub artifact_content_markers: Option<Vec<String>>,
    pub log: LogConfig,
}

impl ClientConfig {
    pub fn transport_settings(&self) -> Result<TransportSettings, ConfigError> {
        let mut settings = TransportSettings::default();
        if let Some(base_url) = self.base_url.as_deref() {
            settings = settings.with_base_url(base_url)?;
        }
        if let Some(secs) = self.connect_timeout_secs {
            settings.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.request_timeout_secs {
            settings.request_timeout = Duration::from_secs(secs);
        }
        if let Some(size) = self.upload_chunk_size {
            settings.upload_chunk_size = size.max(1);
        }
        if let Some(markers) = self.artifact_content_markers.as_ref() {
            if !markers.is_empty() {
                settings.artifact_content_markers = markers.clone();
            }
        }
        Ok(settings)
    }

    pub fn log_level(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(self.log.level.trim())
            .map_err(|_| ConfigError::InvalidLevel(self.log.level.clone()))
    }

    pub fn log_destination(&self) -> LogDestination {
        let file = || {
            self.log
                .file
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
        };
        match self.log.target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File(file()),
            LogTarget::Both => LogDestination::Both(file()),
        }
    }

    /// Installs the process logger; `false` if one was already installed.
    pub fn init_logging(&self) -> Result<bool, ConfigError> {
        let level = self.log_level()?;
        Ok(translator_logging::initialize(self.log_destination(), level))
    }
}

pub fn parse_config(text: &str) -> Result<ClientConfig, ConfigError> {
    Ok(ron::from_str(text)?)
}

pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text)
}

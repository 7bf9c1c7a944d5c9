//! Configuration types for the audit agent
//!
//! Defines the resolved run configuration and the optional TOML settings
//! file. Command-line flags take precedence over the settings file, which
//! takes precedence over the built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use audit_kit::discovery::DEFAULT_SUFFIX;

/// System-wide bus policy directory
pub const DEFAULT_ETC_DIR: &str = "/etc/dbus-1/system.d";

/// Vendor bus policy directory
pub const DEFAULT_USR_DIR: &str = "/usr/share/dbus-1/system.d";

/// Default dpkg-query timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: f64 = 5.0;

/// Output format for audit results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable findings, printed as files are processed
    Text,
    /// Single JSON document printed after the scan
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Configuration for an audit run
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// System-wide policy directory
    pub etc_dir: PathBuf,

    /// Vendor policy directory
    pub usr_dir: PathBuf,

    /// File name suffix of policy files
    pub suffix: String,

    /// Output format
    pub output_format: OutputFormat,

    /// Keep only flagged and erroring records in JSON results
    pub only_flagged: bool,

    /// Timeout for each package ownership query
    pub timeout: Duration,
}

impl AuditConfig {
    /// Candidate directories in scan order
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        vec![self.etc_dir.clone(), self.usr_dir.clone()]
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            etc_dir: PathBuf::from(DEFAULT_ETC_DIR),
            usr_dir: PathBuf::from(DEFAULT_USR_DIR),
            suffix: DEFAULT_SUFFIX.to_string(),
            output_format: OutputFormat::Text,
            only_flagged: false,
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Settings read from a TOML file; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSettings {
    pub etc_dir: Option<PathBuf>,
    pub usr_dir: Option<PathBuf>,
    pub suffix: Option<String>,
    pub timeout: Option<f64>,
    pub json: Option<bool>,
    pub only_flagged: Option<bool>,
}

impl FileSettings {
    /// Read and parse a settings file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Validate a timeout in seconds and convert it to a `Duration`
pub fn timeout_from_secs(secs: f64) -> Result<Duration, ConfigError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ConfigError::InvalidTimeout(secs));
    }
    Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidTimeout(secs))
}

/// Errors while building the run configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid timeout {0}: must be a positive number of seconds")]
    InvalidTimeout(f64),

    #[error("file suffix must not be empty")]
    EmptySuffix,
}

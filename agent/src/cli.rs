//! Command-line interface parsing
//!
//! Handles argument parsing and merges flags with the optional settings file.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{
    timeout_from_secs, AuditConfig, ConfigError, FileSettings, OutputFormat, DEFAULT_TIMEOUT_SECS,
};

#[derive(Parser, Debug)]
#[command(
    name = "check_dbus_system_conf",
    version,
    about = "Scan D-Bus system bus .conf files and report <allow own> under default policy.",
    after_help = "EXIT CODES:\n    0    No file produced an error\n    1    A file could not be analyzed, or the scan could not run\n    2    Invalid usage or settings file\n    127  dpkg-query not found in PATH"
)]
pub struct Cli {
    /// D-Bus system.d directory [default: /etc/dbus-1/system.d]
    #[arg(long, value_name = "DIR")]
    pub etc_dir: Option<PathBuf>,

    /// D-Bus system.d directory [default: /usr/share/dbus-1/system.d]
    #[arg(long, value_name = "DIR")]
    pub usr_dir: Option<PathBuf>,

    /// Output JSON to stdout (useful for CI pipelines)
    #[arg(long)]
    pub json: bool,

    /// Only include flagged records (and errors) in JSON results
    #[arg(long)]
    pub only_flagged: bool,

    /// dpkg-query timeout seconds [default: 5]
    #[arg(long, value_name = "SECONDS", value_parser = parse_timeout)]
    pub timeout: Option<f64>,

    /// Policy file name suffix [default: .conf]
    #[arg(long, value_name = "SUFFIX")]
    pub suffix: Option<String>,

    /// TOML settings file; command-line flags override its values
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Resolve flags, settings file and defaults into a run configuration
    pub fn into_config(self) -> Result<AuditConfig, ConfigError> {
        let settings = match &self.config {
            Some(path) => FileSettings::load(path)?,
            None => FileSettings::default(),
        };
        self.merge(settings)
    }

    fn merge(self, settings: FileSettings) -> Result<AuditConfig, ConfigError> {
        let defaults = AuditConfig::default();

        let suffix = self
            .suffix
            .or(settings.suffix)
            .unwrap_or(defaults.suffix);
        if suffix.is_empty() {
            return Err(ConfigError::EmptySuffix);
        }

        let timeout_secs = self
            .timeout
            .or(settings.timeout)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let json = self.json || settings.json.unwrap_or(false);

        Ok(AuditConfig {
            etc_dir: self.etc_dir.or(settings.etc_dir).unwrap_or(defaults.etc_dir),
            usr_dir: self.usr_dir.or(settings.usr_dir).unwrap_or(defaults.usr_dir),
            suffix,
            output_format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            only_flagged: self.only_flagged || settings.only_flagged.unwrap_or(false),
            timeout: timeout_from_secs(timeout_secs)?,
        })
    }
}

fn parse_timeout(value: &str) -> Result<f64, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    timeout_from_secs(secs).map_err(|e| e.to_string())?;
    Ok(secs)
}

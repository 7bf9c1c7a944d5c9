//! Core audit logic
//!
//! Drives discovery, per-file analysis and package attribution, then renders
//! the report. A failure on one file is recorded as that file's result and the
//! loop moves on; only a broken environment (missing `dpkg-query`) or an
//! unusable search path aborts the run.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use audit_kit::collectors::{OwnerLookup, OwnerLookupError, PackageOwnerCollector};
use audit_kit::discovery::{self, DiscoveryError};
use audit_kit::policy;

use crate::config::{AuditConfig, OutputFormat};
use crate::output;
use crate::report::{AuditReport, FileResult};

/// Run an audit with the given configuration
///
/// Text output is written to `out` as files complete; diagnostics go to
/// `err`. In JSON mode a single document is written to `out` at the end and
/// nothing is written to `err`.
pub fn run_audit<L: OwnerLookup>(
    config: &AuditConfig,
    owners: &mut PackageOwnerCollector<L>,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<AuditReport, AuditError> {
    let discovered = discovery::discover_conf_files(&config.search_dirs(), &config.suffix)?;

    log::info!(
        "Starting audit of {} file(s), output {}",
        discovered.files.len(),
        config.output_format
    );

    if config.output_format == OutputFormat::Text {
        for directory in &discovered.missing_dirs {
            output::print_missing_dir(err, directory)?;
        }
    }

    let results = execute_audit(&discovered.files, owners, config.output_format, out, err)?;
    let report = AuditReport::new(results, discovered.missing_dirs);

    match config.output_format {
        OutputFormat::Json => {
            let json = output::render_json(&report, config.only_flagged)?;
            writeln!(out, "{}", json)?;
        }
        OutputFormat::Text => {
            if report.results.len() > 1 {
                writeln!(out)?;
                output::print_summary_line(out, &report.summary)?;
            }
        }
    }

    log::info!(
        "Audit completed: total={} ok={} error={} flagged={} findings={}",
        report.summary.total,
        report.summary.ok,
        report.summary.error,
        report.summary.flagged,
        report.summary.findings
    );

    Ok(report)
}

/// Audit every file in order, streaming text findings as they complete
fn execute_audit<L: OwnerLookup>(
    conf_files: &[PathBuf],
    owners: &mut PackageOwnerCollector<L>,
    format: OutputFormat,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<Vec<FileResult>, AuditError> {
    let mut results = Vec::with_capacity(conf_files.len());
    let mut printed_findings = 0;

    for conf_file in conf_files {
        let result = audit_file(conf_file, owners)?;

        if format == OutputFormat::Text {
            if let Some(message) = result.error_message() {
                output::print_file_error(err, message)?;
            } else if result.is_flagged() {
                if printed_findings > 0 {
                    writeln!(out)?;
                }
                output::print_finding(out, &result)?;
                printed_findings += 1;
            } else if conf_files.len() == 1 {
                output::print_clean_file(out, conf_file)?;
            }
        }

        results.push(result);
    }

    Ok(results)
}

/// Analyze one file and, if it has grants, attribute it to its packages
fn audit_file<L: OwnerLookup>(
    conf_file: &Path,
    owners: &mut PackageOwnerCollector<L>,
) -> Result<FileResult, AuditError> {
    let allow_own = match policy::analyze_file(conf_file) {
        Ok(allow_own) => allow_own,
        Err(e) => {
            log::debug!("{}: {}", conf_file.display(), e);
            return Ok(FileResult::error(conf_file, e.to_string()));
        }
    };

    if allow_own.is_empty() {
        return Ok(FileResult::clean(conf_file));
    }

    match owners.resolve(conf_file) {
        Ok(packages) => Ok(FileResult::flagged(conf_file, allow_own, packages)),
        Err(OwnerLookupError::ToolMissing(tool)) => Err(AuditError::ToolMissing(tool)),
        Err(e) => {
            log::debug!("{}: owner lookup failed: {}", conf_file.display(), e);
            Ok(FileResult::error(conf_file, e.to_string()))
        }
    }
}

/// Errors that abort an audit run
#[derive(Debug, Error)]
pub enum AuditError {
    /// No files to scan because the search path is wrong
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Required external tool is missing from the environment
    #[error("{0} not found in PATH")]
    ToolMissing(String),

    /// Failed to write the report
    #[error("failed to write report: {0}")]
    Write(#[from] io::Error),

    /// Failed to serialize the JSON report
    #[error("failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AuditError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            AuditError::ToolMissing(_) => 127,
            _ => 1,
        }
    }
}

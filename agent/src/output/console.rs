//! Console output formatting
//!
//! Line-oriented text report. Findings go to stdout, warnings and per-file
//! errors to stderr.

use std::io::{self, Write};
use std::path::Path;

use crate::report::{FileResult, RunSummary};

/// Space-joined values, or `empty` when there are none
pub fn format_list(values: &[String], empty: &str) -> String {
    if values.is_empty() {
        empty.to_string()
    } else {
        values.join(" ")
    }
}

/// Print the finding block of a flagged file
pub fn print_finding(out: &mut dyn Write, result: &FileResult) -> io::Result<()> {
    writeln!(out, "ConfFile: {}", result.conf_file.display())?;
    writeln!(
        out,
        "Packages: {}",
        format_list(result.packages(), "(unknown)")
    )?;
    writeln!(
        out,
        "AllowOwnInDefaultPolicy: {}",
        format_list(result.allow_own(), "(none)")
    )
}

/// Print the verdict for a lone clean file
pub fn print_clean_file(out: &mut dyn Write, conf_file: &Path) -> io::Result<()> {
    writeln!(out, "ConfFile: {}", conf_file.display())?;
    writeln!(out, "Findings: (none)")
}

pub fn print_summary_line(out: &mut dyn Write, summary: &RunSummary) -> io::Result<()> {
    writeln!(
        out,
        "Summary: total={} ok={} error={} flagged={} findings={}",
        summary.total, summary.ok, summary.error, summary.flagged, summary.findings
    )
}

pub fn print_missing_dir(err: &mut dyn Write, directory: &Path) -> io::Result<()> {
    writeln!(err, "WARNING: directory not found: {}", directory.display())
}

pub fn print_file_error(err: &mut dyn Write, message: &str) -> io::Result<()> {
    writeln!(err, "ERROR: {}", message)
}

//! Audit result model
//!
//! One [`FileResult`] per discovered file, and a [`RunSummary`] derived from
//! all of them once the per-file loop has finished.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Outcome of auditing a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// File was analyzed; `packages` is empty unless `allow_own` is not
    Ok {
        allow_own: Vec<String>,
        packages: Vec<String>,
    },
    /// File could not be analyzed or attributed
    Error { message: String },
}

/// Audit record for one configuration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResult {
    pub conf_file: PathBuf,
    pub status: FileStatus,
}

impl FileResult {
    /// A file with no default-context own grants
    pub fn clean(conf_file: &Path) -> Self {
        Self {
            conf_file: conf_file.to_path_buf(),
            status: FileStatus::Ok {
                allow_own: Vec::new(),
                packages: Vec::new(),
            },
        }
    }

    /// A file with grants, attributed to its owning packages
    pub fn flagged(conf_file: &Path, allow_own: Vec<String>, packages: Vec<String>) -> Self {
        Self {
            conf_file: conf_file.to_path_buf(),
            status: FileStatus::Ok {
                allow_own,
                packages,
            },
        }
    }

    pub fn error(conf_file: &Path, message: impl Into<String>) -> Self {
        Self {
            conf_file: conf_file.to_path_buf(),
            status: FileStatus::Error {
                message: message.into(),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.status, FileStatus::Ok { .. })
    }

    pub fn is_flagged(&self) -> bool {
        self.findings_count() > 0
    }

    pub fn findings_count(&self) -> usize {
        self.allow_own().len()
    }

    pub fn allow_own(&self) -> &[String] {
        match &self.status {
            FileStatus::Ok { allow_own, .. } => allow_own,
            FileStatus::Error { .. } => &[],
        }
    }

    pub fn packages(&self) -> &[String] {
        match &self.status {
            FileStatus::Ok { packages, .. } => packages,
            FileStatus::Error { .. } => &[],
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            FileStatus::Error { message } => Some(message),
            FileStatus::Ok { .. } => None,
        }
    }
}

/// Aggregate counts over all file results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub ok: usize,
    pub error: usize,
    pub flagged: usize,
    pub findings: usize,
}

impl RunSummary {
    pub fn from_results(results: &[FileResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };

        for result in results {
            if result.is_ok() {
                summary.ok += 1;
            } else {
                summary.error += 1;
            }

            if result.is_flagged() {
                summary.flagged += 1;
                summary.findings += result.findings_count();
            }
        }

        summary
    }

    /// Exit code for a completed run: findings alone do not fail it
    pub fn exit_code(&self) -> i32 {
        if self.error > 0 {
            1
        } else {
            0
        }
    }
}

/// Everything produced by one audit run
#[derive(Debug, Clone)]
pub struct AuditReport {
    pub results: Vec<FileResult>,
    pub missing_dirs: Vec<PathBuf>,
    pub summary: RunSummary,
}

impl AuditReport {
    pub fn new(results: Vec<FileResult>, missing_dirs: Vec<PathBuf>) -> Self {
        let summary = RunSummary::from_results(&results);
        Self {
            results,
            missing_dirs,
            summary,
        }
    }
}

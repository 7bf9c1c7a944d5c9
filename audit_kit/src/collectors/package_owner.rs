//! # Package Ownership Collector
//!
//! Maps a file back to the installed package(s) that shipped it using the
//! dpkg reverse file-ownership query (`dpkg-query -S <path>`).
//!
//! A file that no package owns is a normal outcome and yields an empty set.
//! A missing `dpkg-query` binary is reported as [`OwnerLookupError::ToolMissing`]
//! so callers can abort instead of recording the same failure for every file.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::commands::{
    create_dpkg_command_executor, format_seconds, CommandError, CommandOutput,
    SystemCommandExecutor, DPKG_QUERY,
};
use crate::sanitize::sanitized_lines;

/// Default timeout for a single ownership query
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Phrases dpkg-query prints when a path belongs to no package
const NOT_FOUND_PHRASES: [&str; 2] = ["no path found", "no packages found"];

/// Errors from an ownership lookup
#[derive(Debug, Error)]
pub enum OwnerLookupError {
    /// The query tool itself is missing; no other file can succeed either
    #[error("{0} not found in PATH")]
    ToolMissing(String),

    /// Query exceeded its timeout
    #[error("command timed out after {}s", format_seconds(.timeout.as_secs_f64()))]
    Timeout { timeout: Duration },

    /// Query ran and failed; carries the tool's diagnostic text
    #[error("{0}")]
    QueryFailed(String),
}

impl From<CommandError> for OwnerLookupError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::NotFound(command) => Self::ToolMissing(command),
            CommandError::Timeout { timeout, .. } => Self::Timeout { timeout },
            other => Self::QueryFailed(other.to_string()),
        }
    }
}

/// Reverse file-ownership query
pub trait OwnerLookup {
    /// Sorted, de-duplicated names of the packages owning `path`
    fn owners_of(&self, path: &Path, timeout: Duration) -> Result<Vec<String>, OwnerLookupError>;
}

/// [`OwnerLookup`] backed by `dpkg-query -S`
#[derive(Debug, Clone)]
pub struct DpkgOwnerLookup {
    executor: SystemCommandExecutor,
}

impl DpkgOwnerLookup {
    pub fn new() -> Self {
        Self {
            executor: create_dpkg_command_executor(DEFAULT_QUERY_TIMEOUT),
        }
    }
}

impl Default for DpkgOwnerLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl OwnerLookup for DpkgOwnerLookup {
    fn owners_of(&self, path: &Path, timeout: Duration) -> Result<Vec<String>, OwnerLookupError> {
        let path_arg = path.to_string_lossy();
        let output = self
            .executor
            .execute(DPKG_QUERY, &["-S", path_arg.as_ref()], Some(timeout))?;
        interpret_dpkg_output(&output)
    }
}

/// Turn a finished `dpkg-query -S` run into an owner set
///
/// Exit 0 parses the owner lines. A non-zero exit that reports "no path
/// found" / "no packages found" means the file is unowned. Any other
/// non-zero exit is an error carrying the tool's diagnostic text.
pub fn interpret_dpkg_output(output: &CommandOutput) -> Result<Vec<String>, OwnerLookupError> {
    if output.success() {
        return Ok(parse_dpkg_owner_lines(&output.stdout));
    }

    let combined = output.combined().to_lowercase();
    if NOT_FOUND_PHRASES
        .iter()
        .any(|phrase| combined.contains(phrase))
    {
        return Ok(Vec::new());
    }

    let stderr = output.stderr.trim();
    let stdout = output.stdout.trim();
    let message = if !stderr.is_empty() {
        stderr.to_string()
    } else if !stdout.is_empty() {
        stdout.to_string()
    } else {
        format!("{} -S failed", DPKG_QUERY)
    };
    Err(OwnerLookupError::QueryFailed(message))
}

/// Parse `pkg[, pkg...]: path` lines into a sorted, de-duplicated name list
///
/// Diversion notices are skipped. Arch-qualified names (`libfoo:amd64`) are
/// kept whole because the owner list ends at the first `": "`.
pub fn parse_dpkg_owner_lines(stdout: &str) -> Vec<String> {
    let mut packages = BTreeSet::new();

    for line in sanitized_lines(stdout) {
        if line.starts_with("diversion by ") || line.starts_with("local diversion") {
            continue;
        }

        let owners = match line.split_once(": ").or_else(|| line.split_once(':')) {
            Some((owners, _path)) => owners,
            None => continue,
        };

        packages.extend(
            owners
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        );
    }

    packages.into_iter().collect()
}

/// Resolves package owners per path, querying each path at most once
///
/// Only successful lookups are remembered; a failed lookup is retried the
/// next time the same path is requested.
pub struct PackageOwnerCollector<L: OwnerLookup> {
    lookup: L,
    timeout: Duration,
    cache: HashMap<PathBuf, Vec<String>>,
}

impl<L: OwnerLookup> PackageOwnerCollector<L> {
    pub fn new(lookup: L, timeout: Duration) -> Self {
        Self {
            lookup,
            timeout,
            cache: HashMap::new(),
        }
    }

    /// Owners of `path`, reusing a previous answer for the same path
    pub fn resolve(&mut self, path: &Path) -> Result<Vec<String>, OwnerLookupError> {
        if let Some(packages) = self.cache.get(path) {
            log::debug!("Owner cache hit for {}", path.display());
            return Ok(packages.clone());
        }

        let packages = self.lookup.owners_of(path, self.timeout)?;
        log::debug!("{} owned by {:?}", path.display(), packages);
        self.cache.insert(path.to_path_buf(), packages.clone());
        Ok(packages)
    }

    /// Number of paths with a remembered answer
    #[cfg(test)]
    pub fn cached_paths(&self) -> usize {
        self.cache.len()
    }

    /// The underlying lookup; test support for inspecting injected fakes
    pub fn lookup(&self) -> &L {
        &self.lookup
    }
}

//! Configuration file discovery
//!
//! Walks the candidate policy directories and collects configuration files.
//! A candidate directory that does not exist is recorded, not fatal, as long
//! as some other candidate produced at least one file.

use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

/// Default suffix of bus configuration files
pub const DEFAULT_SUFFIX: &str = ".conf";

/// Result of a discovery pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredFiles {
    /// Matching files, sorted byte-wise and de-duplicated
    pub files: Vec<PathBuf>,

    /// Candidate directories that do not exist, in candidate order
    pub missing_dirs: Vec<PathBuf>,
}

/// Errors that can occur during file discovery
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Nothing to scan, and at least one candidate directory was missing
    #[error("no {suffix} files found; directories not found: {}", join_paths(.missing_dirs))]
    NoConfigFiles {
        suffix: String,
        missing_dirs: Vec<PathBuf>,
    },
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Discover every file ending with `suffix` below the candidate directories
///
/// Fails only when no file was found *and* some candidate was missing, which
/// points at a misconfigured search path rather than a clean system.
pub fn discover_conf_files(
    directories: &[PathBuf],
    suffix: &str,
) -> Result<DiscoveredFiles, DiscoveryError> {
    let mut discovered = DiscoveredFiles::default();

    for directory in directories {
        if !directory.is_dir() {
            log::debug!("Candidate directory missing: {}", directory.display());
            discovered.missing_dirs.push(directory.clone());
            continue;
        }

        let root = std::path::absolute(directory).unwrap_or_else(|_| directory.clone());
        let before = discovered.files.len();
        collect_recursive(&root, suffix, &mut discovered.files);
        log::debug!(
            "Found {} {} file(s) in {}",
            discovered.files.len() - before,
            suffix,
            root.display()
        );
    }

    discovered
        .files
        .sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    discovered.files.dedup();

    if discovered.files.is_empty() && !discovered.missing_dirs.is_empty() {
        return Err(DiscoveryError::NoConfigFiles {
            suffix: suffix.to_string(),
            missing_dirs: discovered.missing_dirs,
        });
    }

    log::info!(
        "Discovered {} configuration file(s), {} missing director(ies)",
        discovered.files.len(),
        discovered.missing_dirs.len()
    );
    Ok(discovered)
}

/// Walk `root`, pushing every non-directory entry whose name ends with `suffix`
///
/// Symlinked subdirectories are not descended into. Unreadable entries are
/// skipped.
fn collect_recursive(root: &Path, suffix: &str, files: &mut Vec<PathBuf>) {
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };

        if entry.file_type().is_dir() {
            continue;
        }
        if entry.path_is_symlink() && entry.path().is_dir() {
            continue;
        }

        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(suffix));
        if matches {
            files.push(entry.into_path());
        }
    }
}

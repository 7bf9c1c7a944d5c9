//! Default-context ownership analysis
//!
//! Flags bus names that any client may own because an `<allow own="...">`
//! rule sits inside `<policy context="default">`.
//!
//! The search runs in two passes: first every default-context policy block is
//! located, then each block is searched without further constraints for
//! `allow` elements. Results are unioned and sorted, so the outcome does not
//! depend on where in the file the grants appear.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::document::{DocumentError, PolicyDocument, PolicyElement};
use crate::sanitize::strip_bom;

const POLICY_TAG: &str = "policy";
const ALLOW_TAG: &str = "allow";
const CONTEXT_ATTR: &str = "context";
const OWN_ATTR: &str = "own";
const DEFAULT_CONTEXT: &str = "default";

/// Errors from analyzing a single configuration file
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// File could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File content is not well-formed XML
    #[error("xml parse error: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Whether `element` is a `<policy>` whose trimmed `context` is exactly `default`
pub fn is_default_policy(element: &PolicyElement) -> bool {
    element.local_name() == POLICY_TAG
        && element
            .attribute(CONTEXT_ATTR)
            .is_some_and(|context| context.trim() == DEFAULT_CONTEXT)
}

/// All default-context policy blocks, at any depth
pub fn default_policy_blocks(document: &PolicyDocument) -> Vec<&PolicyElement> {
    document
        .elements()
        .filter(|element| is_default_policy(element))
        .collect()
}

/// Trimmed, non-empty `own` values of every `allow` element below `block`
pub fn allow_own_grants(block: &PolicyElement) -> impl Iterator<Item = &str> {
    block
        .descendants()
        .filter(|element| element.local_name() == ALLOW_TAG)
        .filter_map(|element| element.attribute(OWN_ATTR))
        .map(str::trim)
        .filter(|own| !own.is_empty())
}

/// Sorted, de-duplicated bus names owned under the default context
pub fn find_allow_own_in_default_policy(document: &PolicyDocument) -> Vec<String> {
    let owns: BTreeSet<&str> = default_policy_blocks(document)
        .into_iter()
        .flat_map(allow_own_grants)
        .collect();
    owns.into_iter().map(str::to_string).collect()
}

/// Analyze XML text
pub fn analyze_str(text: &str) -> Result<Vec<String>, DocumentError> {
    let document = PolicyDocument::parse(strip_bom(text))?;
    Ok(find_allow_own_in_default_policy(&document))
}

/// Read and analyze one configuration file
pub fn analyze_file(path: &Path) -> Result<Vec<String>, AnalysisError> {
    let bytes = fs::read(path).map_err(|source| AnalysisError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let text = String::from_utf8(bytes).map_err(|e| AnalysisError::Parse {
        path: path.to_path_buf(),
        message: format!("invalid UTF-8: {}", e.utf8_error()),
    })?;

    let owns = analyze_str(&text).map_err(|e| AnalysisError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    log::debug!(
        "{}: {} default-context own grant(s)",
        path.display(),
        owns.len()
    );
    Ok(owns)
}

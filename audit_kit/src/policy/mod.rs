//! # Policy Documents
//!
//! Parsing of bus configuration files and the default-context ownership rule.
//!
//! - `document` - Owned element tree with namespace-agnostic name matching
//! - `analyzer` - Finds `<allow own="...">` grants under `<policy context="default">`

pub mod analyzer;
pub mod document;

pub use analyzer::{
    allow_own_grants, analyze_file, analyze_str, default_policy_blocks,
    find_allow_own_in_default_policy, is_default_policy, AnalysisError,
};
pub use document::{
    local_name, DocumentError, PolicyDocument, PolicyElement, MAX_NESTING_DEPTH,
};

//! # D-Bus Audit Kit
//!
//! Building blocks for auditing the D-Bus system bus policy configuration.
//! Provides file discovery, policy document analysis, package attribution
//! and the command execution plumbing those rely on.
//!
//! ## Modules
//!
//! - `sanitize` - Line normalization for command output and documents
//! - `commands` - Allow-listed command execution with timeouts
//! - `collectors` - Data collection from the system (package ownership)
//! - `discovery` - Configuration file discovery
//! - `policy` - Policy document parsing and the default-context own rule
//! - `logging` - Global logger setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use audit_kit::collectors::{DpkgOwnerLookup, PackageOwnerCollector};
//! use audit_kit::{discovery, policy};
//!
//! let scan = discovery::discover_conf_files(&dirs, ".conf")?;
//! let mut owners = PackageOwnerCollector::new(DpkgOwnerLookup::new(), timeout);
//!
//! for conf_file in &scan.files {
//!     let names = policy::analyze_file(conf_file)?;
//!     if !names.is_empty() {
//!         let packages = owners.resolve(conf_file)?;
//!         println!("{}: {:?} {:?}", conf_file.display(), names, packages);
//!     }
//! }
//! ```

pub mod collectors;
pub mod commands;
pub mod discovery;
pub mod logging;
pub mod policy;
pub mod sanitize;

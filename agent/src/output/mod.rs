//! Output generation module
//!
//! Provides the two report renderings:
//! - Console (human-readable, streamed while files are processed)
//! - JSON (one machine-readable document, built after the scan)

mod console;
mod json;

pub use console::{
    print_clean_file, print_file_error, print_finding, print_missing_dir, print_summary_line,
};
pub use json::render_json;

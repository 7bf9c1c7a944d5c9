//! # D-Bus System Bus Policy Audit
//!
//! Flags `<allow own="...">` rules inside `<policy context="default">` blocks
//! of the system bus configuration, and names the package that installed each
//! offending file.
//!
//! ## Usage
//!
//! ```bash
//! # Scan the standard system.d directories
//! check_dbus_system_conf
//!
//! # JSON for CI, flagged records only
//! check_dbus_system_conf --json --only-flagged
//!
//! # Scan another tree
//! check_dbus_system_conf --etc-dir /mnt/image/etc/dbus-1/system.d
//! ```
//!
//! ## Exit Codes
//!
//! - **0**: every file was analyzed (findings do not change the status)
//! - **1**: a file could not be analyzed, or no files were found
//! - **2**: invalid usage or settings file
//! - **127**: `dpkg-query` is not available

mod cli;
mod config;
mod output;
mod report;
mod scanner;

use std::io::{self, Write};

use clap::Parser;

use audit_kit::collectors::{DpkgOwnerLookup, PackageOwnerCollector};
use audit_kit::logging;

use cli::Cli;

fn main() {
    if let Err(e) = logging::init_global_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(2);
    }

    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(2);
        }
    };

    let exit_code = run(&config);
    std::process::exit(exit_code);
}

/// Run the audit and map the outcome to an exit code
fn run(config: &config::AuditConfig) -> i32 {
    let mut owners = PackageOwnerCollector::new(DpkgOwnerLookup::new(), config.timeout);

    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut out = stdout.lock();
    let mut err = stderr.lock();

    let exit_code = match scanner::run_audit(config, &mut owners, &mut out, &mut err) {
        Ok(report) => report.summary.exit_code(),
        Err(e) => {
            let _ = out.flush();
            let _ = writeln!(err, "ERROR: {}", e);
            e.exit_code()
        }
    };

    let _ = out.flush();
    exit_code
}

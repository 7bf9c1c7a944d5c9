//! dpkg command executor configuration
//!
//! Provides a whitelisted command executor for package ownership queries.

use std::time::Duration;

use super::SystemCommandExecutor;

/// Debian package database query tool
pub const DPKG_QUERY: &str = "dpkg-query";

/// Create command executor configured for package ownership lookups
///
/// Whitelist includes:
/// - dpkg-query: reverse file-ownership queries (`dpkg-query -S <path>`)
pub fn create_dpkg_command_executor(timeout: Duration) -> SystemCommandExecutor {
    let mut executor = SystemCommandExecutor::with_timeout(timeout);
    executor.allow_commands(&[DPKG_QUERY]);
    executor
}

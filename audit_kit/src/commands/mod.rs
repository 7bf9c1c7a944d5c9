//! Command execution for system queries
//!
//! Provides an allow-listed command executor and the executor configurations
//! used by the collectors.

pub mod dpkg;
pub mod executor;

pub use dpkg::{create_dpkg_command_executor, DPKG_QUERY};
pub use executor::{format_seconds, CommandError, CommandOutput, SystemCommandExecutor};

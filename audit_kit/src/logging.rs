//! Global logger setup
//!
//! Log records go to stderr through `env_logger`. The filter is read from
//! `DBUS_AUDIT_LOG` and defaults to `warn`, which keeps the report streams
//! clean unless diagnostics are asked for.

use env_logger::{Builder, Env, Target};

/// Environment variable holding the log filter (e.g. `debug`, `audit_kit=trace`)
pub const LOG_ENV_VAR: &str = "DBUS_AUDIT_LOG";

/// Default filter when `DBUS_AUDIT_LOG` is unset
pub const DEFAULT_FILTER: &str = "warn";

/// Initialize the process-wide logger
///
/// Fails if a logger has already been installed.
pub fn init_global_logging() -> Result<(), log::SetLoggerError> {
    Builder::from_env(Env::default().filter_or(LOG_ENV_VAR, DEFAULT_FILTER))
        .target(Target::Stderr)
        .format_timestamp(None)
        .try_init()
}

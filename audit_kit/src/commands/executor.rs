//! Allow-listed system command executor
//!
//! Runs external commands with captured stdout/stderr and a wall-clock
//! timeout. A non-zero exit status is *not* an error here: callers decide what
//! an exit code means. The executor only fails when the command could not be
//! run at all, was not allowed, or exceeded its timeout.
//!
//! ## Usage
//!
//! ```ignore
//! let mut executor = SystemCommandExecutor::with_timeout(Duration::from_secs(5));
//! executor.allow_commands(&["dpkg-query"]);
//!
//! let output = executor.execute("dpkg-query", &["-S", "/etc/dbus-1/system.d/x.conf"], None)?;
//! if output.success() {
//!     println!("{}", output.stdout);
//! }
//! ```

use std::collections::HashSet;
use std::io::{self, Read};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

/// How often a running child is polled for completion
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (-1 when the process was terminated by a signal)
    pub exit_code: i32,

    /// Captured standard output (lossy UTF-8)
    pub stdout: String,

    /// Captured standard error (lossy UTF-8)
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command exited with status 0
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Standard error followed by standard output
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stderr, self.stdout)
    }
}

/// Errors that prevent a command from producing a [`CommandOutput`]
#[derive(Debug, Error)]
pub enum CommandError {
    /// Command is not on the executor's allow list
    #[error("command '{0}' is not in the allowed command list")]
    NotAllowed(String),

    /// Executable could not be located
    #[error("{0} not found in PATH")]
    NotFound(String),

    /// Command did not finish within its timeout and was killed
    #[error("command timed out after {}s", format_seconds(.timeout.as_secs_f64()))]
    Timeout { command: String, timeout: Duration },

    /// Any other failure to start or wait for the process
    #[error("failed to run {command}: {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },
}

/// Executes allow-listed commands with a timeout
#[derive(Debug, Clone)]
pub struct SystemCommandExecutor {
    allowed: HashSet<String>,
    default_timeout: Duration,
}

impl SystemCommandExecutor {
    /// Create an executor with an empty allow list and the given default timeout
    pub fn with_timeout(default_timeout: Duration) -> Self {
        Self {
            allowed: HashSet::new(),
            default_timeout,
        }
    }

    /// Add commands to the allow list
    pub fn allow_commands(&mut self, commands: &[&str]) {
        self.allowed
            .extend(commands.iter().map(|command| command.to_string()));
    }

    /// Whether `command` may be executed
    pub fn is_allowed(&self, command: &str) -> bool {
        self.allowed.contains(command)
    }

    /// Timeout used when `execute` is called without one
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Run `command` with `args`, waiting at most `timeout` (or the default)
    pub fn execute(
        &self,
        command: &str,
        args: &[&str],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, CommandError> {
        if !self.is_allowed(command) {
            return Err(CommandError::NotAllowed(command.to_string()));
        }

        let timeout = timeout.unwrap_or(self.default_timeout);
        log::debug!("Executing {} {:?} (timeout {:?})", command, args, timeout);

        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => CommandError::NotFound(command.to_string()),
                _ => CommandError::Io {
                    command: command.to_string(),
                    source: e,
                },
            })?;

        // Drain both pipes concurrently so a chatty child cannot block on a full pipe
        let stdout_rx = child.stdout.take().map(spawn_reader);
        let stderr_rx = child.stderr.take().map(spawn_reader);

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    log::debug!("{} timed out after {:?}", command, timeout);
                    return Err(timed_out(command, timeout));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    return Err(CommandError::Io {
                        command: command.to_string(),
                        source: e,
                    });
                }
            }
        };

        // A background process that inherited the pipes keeps them open past
        // the child's exit; the same deadline bounds reading them.
        let (Some(stdout), Some(stderr)) = (
            receive_output(stdout_rx, deadline),
            receive_output(stderr_rx, deadline),
        ) else {
            log::debug!("{} output still open after {:?}", command, timeout);
            return Err(timed_out(command, timeout));
        };

        Ok(CommandOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout,
            stderr,
        })
    }
}

/// Shortest round-trip seconds with a signed two-digit exponent (`5.0`, `0.25`, `1e-07`)
pub fn format_seconds(secs: f64) -> String {
    let text = format!("{:?}", secs);
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => text,
    }
}

fn timed_out(command: &str, timeout: Duration) -> CommandError {
    CommandError::Timeout {
        command: command.to_string(),
        timeout,
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Captured pipe text, or `None` if the pipe is still open at `deadline`
fn receive_output(receiver: Option<Receiver<String>>, deadline: Instant) -> Option<String> {
    let Some(receiver) = receiver else {
        return Some(String::new());
    };
    match receiver.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(text) => Some(text),
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

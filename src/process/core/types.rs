/*!
 * Process Types
 * Errors, lifecycle states and exit status of supervised processes
 */

use crate::core::config::ConfigError;
use miette::Diagnostic;
use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Process operation result
///
/// # Must Use
/// Process operations can fail and must be handled to prevent leaked children
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Handshake protocol violations
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum HandshakeError {
    #[error("malformed handshake message: {0}")]
    #[diagnostic(code(handshake::malformed))]
    Malformed(String),

    #[error("unexpected task '{name}' in handshake (expected one of: {})", .expected.join(", "))]
    #[diagnostic(
        code(handshake::unexpected_task),
        help("The component reported a task it does not declare. Check the name mappings.")
    )]
    UnexpectedTask { name: String, expected: Vec<String> },

    #[error("handshake message exceeds {limit} bytes")]
    #[diagnostic(code(handshake::too_large))]
    TooLarge { limit: usize },
}

/// Process errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ProcessError {
    #[error("failed to spawn {name}: {reason}")]
    #[diagnostic(
        code(process::spawn_failed),
        help("Check that the binary exists, is executable and that its wrapper is installed.")
    )]
    SpawnFailed { name: String, reason: String },

    #[error("process {name} died before it was running ({})", describe_status(.status))]
    #[diagnostic(
        code(process::crashed),
        help("Inspect the process output. A signal usually means a crash in component code.")
    )]
    ProcessCrashed {
        name: String,
        status: Option<ExitStatus>,
    },

    #[error("process {name} did not report its tasks within {timeout:?}")]
    #[diagnostic(
        code(process::handshake_timeout),
        help("Kill the process and spawn it again with a longer timeout.")
    )]
    HandshakeTimeout { name: String, timeout: Duration },

    #[error("process {name} sent an invalid handshake: {source}")]
    #[diagnostic(code(process::invalid_handshake))]
    InvalidHandshakeMessage {
        name: String,
        #[source]
        source: HandshakeError,
    },

    #[error("process {0} was never started")]
    #[diagnostic(code(process::not_started))]
    NotStarted(String),

    #[error("process {0} has not reported its tasks yet")]
    #[diagnostic(
        code(process::not_running),
        help("Call wait_running before accessing the tasks of a process.")
    )]
    NotRunning(String),

    #[error("process {name} has no task named '{task}'")]
    #[diagnostic(code(process::unknown_task))]
    UnknownTask { name: String, task: String },

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    #[diagnostic(code(process::invalid_state_transition))]
    InvalidStateTransition {
        from: ProcessState,
        to: ProcessState,
    },

    #[error("Configuration error: {0}")]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error on {name}: {reason}")]
    #[diagnostic(code(process::io))]
    Io { name: String, reason: String },
}

impl ProcessError {
    pub(crate) fn io(name: &str, err: impl fmt::Display) -> Self {
        ProcessError::Io {
            name: name.to_string(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn spawn_failed(name: &str, err: impl fmt::Display) -> Self {
        ProcessError::SpawnFailed {
            name: name.to_string(),
            reason: err.to_string(),
        }
    }
}

fn describe_status(status: &Option<ExitStatus>) -> String {
    match status {
        Some(status) => status.to_string(),
        None => "exit status unknown".to_string(),
    }
}

/// Lifecycle of a supervised process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// Descriptor exists, nothing spawned
    NotStarted,
    /// Child spawned, handshake not complete
    Starting,
    /// Handshake complete, handles known
    Running,
    /// Child is alive but misbehaved (invalid handshake)
    RuntimeError,
    /// Child reaped
    Terminated,
}

impl ProcessState {
    /// Whether `self -> to` is a legal transition
    #[inline]
    #[must_use]
    pub const fn can_transition_to(self, to: ProcessState) -> bool {
        use ProcessState::*;
        matches!(
            (self, to),
            (NotStarted, Starting)
                | (Starting, Running)
                | (Starting, RuntimeError)
                | (Starting, Terminated)
                | (Running, RuntimeError)
                | (Running, Terminated)
                | (RuntimeError, Terminated)
        )
    }

    /// Whether the OS process may still exist
    #[inline]
    #[must_use]
    pub const fn is_alive(self) -> bool {
        matches!(
            self,
            ProcessState::Starting | ProcessState::Running | ProcessState::RuntimeError
        )
    }
}

/// How a process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExitStatus {
    pub exited: bool,
    pub exit_code: Option<i32>,
    pub signaled: bool,
    pub termsig: Option<i32>,
}

impl ExitStatus {
    #[inline]
    #[must_use]
    pub const fn exited(code: i32) -> Self {
        Self {
            exited: true,
            exit_code: Some(code),
            signaled: false,
            termsig: None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn signaled(signal: i32) -> Self {
        Self {
            exited: false,
            exit_code: None,
            signaled: true,
            termsig: Some(signal),
        }
    }

    /// Normal exit with code 0
    #[inline]
    #[must_use]
    pub fn success(&self) -> bool {
        self.exited && self.exit_code == Some(0)
    }

    /// The terminating signal, if it is one nix knows
    pub fn signal(&self) -> Option<Signal> {
        self.termsig.and_then(|sig| Signal::try_from(sig).ok())
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;

        match (status.code(), status.signal()) {
            (Some(code), _) => ExitStatus::exited(code),
            (None, Some(sig)) => ExitStatus::signaled(sig),
            (None, None) => ExitStatus {
                exited: false,
                exit_code: None,
                signaled: false,
                termsig: None,
            },
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.exit_code, self.termsig) {
            (Some(code), _) if self.exited => write!(f, "exited with code {}", code),
            (_, Some(sig)) if self.signaled => match self.signal() {
                Some(signal) => write!(f, "killed by signal {}", signal.as_str()),
                None => write!(f, "killed by signal {}", sig),
            },
            _ => write!(f, "terminated abnormally"),
        }
    }
}

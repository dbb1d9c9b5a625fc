/*!
 * Supervisor Configuration
 * Process-wide defaults, loadable from the environment
 */

use crate::core::limits::{
    DEFAULT_KILL_GRACE, DEFAULT_WAIT_RUNNING_TIMEOUT, SLOW_OPERATION_THRESHOLD,
};
use crate::process::options::LogLevel;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ConfigError {
    #[error("Invalid log level '{0}'")]
    #[diagnostic(
        code(config::invalid_log_level),
        help("Use one of: never, fatal, critical, error, warning, info, debug, realtime.")
    )]
    InvalidLogLevel(String),

    #[error("Invalid value '{value}' for {key}")]
    #[diagnostic(
        code(config::invalid_value),
        help("Check the environment variable and its expected format.")
    )]
    InvalidValue { key: String, value: String },

    #[error("Invalid wrapper configuration: {0}")]
    #[diagnostic(
        code(config::invalid_wrapper),
        help("A wrapper needs a program to run. Only one wrapper can be active.")
    )]
    InvalidWrapper(String),
}

/// Supervisor-wide defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "snake_case")]
pub struct SupervisorConfig {
    /// Deadline used by `wait_running` callers that do not pass their own
    pub wait_running_timeout: Duration,
    /// How long a waited soft kill may take before it is escalated to SIGKILL
    pub kill_grace: Duration,
    /// Log level applied to spawned processes without an explicit one
    pub default_log_level: Option<LogLevel>,
    /// Output template (`%m` = process name, `%p` = pid) for spawned processes
    pub output: Option<String>,
    /// Working directory for spawned processes
    pub working_directory: Option<PathBuf>,
    /// Operations slower than this are reported as slow
    pub slow_operation_threshold: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            wait_running_timeout: DEFAULT_WAIT_RUNNING_TIMEOUT,
            kill_grace: DEFAULT_KILL_GRACE,
            default_log_level: None,
            output: None,
            working_directory: None,
            slow_operation_threshold: SLOW_OPERATION_THRESHOLD,
        }
    }
}

impl SupervisorConfig {
    /// Load the configuration from the environment
    ///
    /// Environment variables:
    /// - TASKHOST_WAIT_TIMEOUT_MS: default wait_running deadline
    /// - TASKHOST_KILL_GRACE_MS: grace period before a waited kill escalates
    /// - TASKHOST_LOG_LEVEL: default component log level
    /// - TASKHOST_OUTPUT: output template
    /// - TASKHOST_WORKDIR: working directory of spawned processes
    /// - TASKHOST_SLOW_OP_MS: slow operation threshold
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = lookup("TASKHOST_WAIT_TIMEOUT_MS") {
            config.wait_running_timeout = parse_millis("TASKHOST_WAIT_TIMEOUT_MS", &ms)?;
        }
        if let Some(ms) = lookup("TASKHOST_KILL_GRACE_MS") {
            config.kill_grace = parse_millis("TASKHOST_KILL_GRACE_MS", &ms)?;
        }
        if let Some(level) = lookup("TASKHOST_LOG_LEVEL") {
            config.default_log_level = Some(level.parse()?);
        }
        if let Some(output) = lookup("TASKHOST_OUTPUT") {
            config.output = Some(output);
        }
        if let Some(dir) = lookup("TASKHOST_WORKDIR") {
            config.working_directory = Some(PathBuf::from(dir));
        }
        if let Some(ms) = lookup("TASKHOST_SLOW_OP_MS") {
            config.slow_operation_threshold = parse_millis("TASKHOST_SLOW_OP_MS", &ms)?;
        }

        Ok(config)
    }
}

fn parse_millis(key: &str, value: &str) -> ConfigResult<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

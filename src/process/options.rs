/*!
 * Spawn Options
 * Per-process launch configuration
 */

use crate::core::config::{ConfigError, SupervisorConfig};
use crate::core::limits::DEFAULT_GDB_PORT;
use crate::core::serialization::{is_empty_map, is_none};
use crate::core::types::NameMappings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Component log level, passed to the child through its environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Never,
    Fatal,
    Critical,
    Error,
    Warning,
    Info,
    Debug,
    RealTime,
}

impl LogLevel {
    pub const ALL: [LogLevel; 8] = [
        LogLevel::Never,
        LogLevel::Fatal,
        LogLevel::Critical,
        LogLevel::Error,
        LogLevel::Warning,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::RealTime,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Never => "never",
            LogLevel::Fatal => "fatal",
            LogLevel::Critical => "critical",
            LogLevel::Error => "error",
            LogLevel::Warning => "warning",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::RealTime => "realtime",
        }
    }

    /// Numeric level understood by the component runtime
    #[inline]
    pub const fn as_env_value(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['_', '-'], "");
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == wanted)
            .ok_or_else(|| ConfigError::InvalidLogLevel(s.to_string()))
    }
}

/// Program the component is started under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Wrapper {
    /// `gdbserver localhost:PORT`
    Gdb {
        #[serde(default = "default_gdb_port")]
        port: u16,
        #[serde(default)]
        options: Vec<String>,
    },
    Valgrind {
        #[serde(default)]
        options: Vec<String>,
    },
    Custom {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

fn default_gdb_port() -> u16 {
    DEFAULT_GDB_PORT
}

impl Wrapper {
    pub fn gdb(port: u16) -> Self {
        Wrapper::Gdb {
            port,
            options: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Wrapper::Custom { program, .. } if program.trim().is_empty() => Err(
                ConfigError::InvalidWrapper("custom wrapper without a program".to_string()),
            ),
            Wrapper::Gdb { port: 0, .. } => Err(ConfigError::InvalidWrapper(
                "gdbserver needs a non-zero port".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Words placed before the component binary
    pub fn prefix(&self) -> Vec<String> {
        match self {
            Wrapper::Gdb { port, options } => {
                let mut words = vec!["gdbserver".to_string()];
                words.extend(options.iter().cloned());
                words.push(format!("localhost:{}", port));
                words
            }
            Wrapper::Valgrind { options } => {
                let mut words = vec!["valgrind".to_string()];
                words.extend(options.iter().cloned());
                words
            }
            Wrapper::Custom { program, args } => {
                let mut words = vec![program.clone()];
                words.extend(args.iter().cloned());
                words
            }
        }
    }
}

/// Value of an extra command-line option
///
/// `null` renders as a bare `--opt`, a string as `--opt=value` and an array
/// as one `--opt=value` per element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CmdArg {
    Values(Vec<String>),
    Value(String),
    Flag,
}

impl CmdArg {
    pub fn render(&self, option: &str) -> Vec<String> {
        match self {
            CmdArg::Flag => vec![format!("--{}", option)],
            CmdArg::Value(value) => vec![format!("--{}={}", option, value)],
            CmdArg::Values(values) => values
                .iter()
                .map(|value| format!("--{}={}", option, value))
                .collect(),
        }
    }
}

/// Launch options of one process
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SpawnOptions {
    #[serde(skip_serializing_if = "is_none")]
    pub working_directory: Option<PathBuf>,
    #[serde(skip_serializing_if = "is_none")]
    pub log_level: Option<LogLevel>,
    /// Output file template, `%m` = process name, `%p` = pid
    #[serde(skip_serializing_if = "is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "is_none")]
    pub wrapper: Option<Wrapper>,
    #[serde(skip_serializing_if = "is_empty_map")]
    pub name_mappings: NameMappings,
    #[serde(skip_serializing_if = "is_empty_map")]
    pub cmdline_args: BTreeMap<String, CmdArg>,
    /// Shared library preloaded into the component for tracing
    #[serde(skip_serializing_if = "is_none")]
    pub tracing_library: Option<PathBuf>,
}

impl SpawnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_output(mut self, template: impl Into<String>) -> Self {
        self.output = Some(template.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_wrapper(mut self, wrapper: Wrapper) -> Self {
        self.wrapper = Some(wrapper);
        self
    }

    /// Deploy the declared task `from` as `to`
    #[inline]
    #[must_use]
    pub fn with_name_mapping(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.name_mappings.insert(from.into(), to.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_arg(mut self, option: impl Into<String>, value: CmdArg) -> Self {
        self.cmdline_args.insert(option.into(), value);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_tracing_library(mut self, library: impl Into<PathBuf>) -> Self {
        self.tracing_library = Some(library.into());
        self
    }

    /// Fill unset fields from the supervisor defaults
    #[must_use]
    pub fn with_defaults(mut self, config: &SupervisorConfig) -> Self {
        if self.log_level.is_none() {
            self.log_level = config.default_log_level;
        }
        if self.output.is_none() {
            self.output = config.output.clone();
        }
        if self.working_directory.is_none() {
            self.working_directory = config.working_directory.clone();
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(wrapper) = &self.wrapper {
            wrapper.validate()?;
        }
        for option in self.cmdline_args.keys() {
            if option.is_empty() || option.starts_with('-') || option.contains('=') {
                return Err(ConfigError::InvalidValue {
                    key: "cmdline_args".to_string(),
                    value: option.clone(),
                });
            }
        }
        Ok(())
    }
}

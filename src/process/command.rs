/*!
 * Command Line Construction
 * Renders spawn options into the argv and environment of a component
 */

use super::options::SpawnOptions;
use crate::core::config::ConfigError;
use crate::core::limits::{HANDSHAKE_FD_ARG, HANDSHAKE_FD_ENV, LOG_LEVEL_ENV, RENAME_ARG};
use crate::core::types::Pid;
use std::ffi::OsString;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};

/// Program, arguments and extra environment of one launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub env: Vec<(String, OsString)>,
}

impl CommandLine {
    /// Build the command line of `binary` with `options`
    ///
    /// `handshake_fd` is the descriptor number the child inherits as the
    /// write end of its handshake channel.
    pub fn build(
        binary: &Path,
        options: &SpawnOptions,
        handshake_fd: RawFd,
    ) -> Result<Self, ConfigError> {
        options.validate()?;

        let mut words: Vec<OsString> = options
            .wrapper
            .as_ref()
            .map(|wrapper| wrapper.prefix().into_iter().map(OsString::from).collect())
            .unwrap_or_default();
        words.push(binary.as_os_str().to_owned());

        for (from, to) in &options.name_mappings {
            words.push(format!("--{}={}:{}", RENAME_ARG, from, to).into());
        }
        for (option, value) in &options.cmdline_args {
            words.extend(value.render(option).into_iter().map(OsString::from));
        }
        words.push(format!("--{}={}", HANDSHAKE_FD_ARG, handshake_fd).into());

        let mut env = vec![(HANDSHAKE_FD_ENV.to_string(), handshake_fd.to_string().into())];
        if let Some(level) = options.log_level {
            env.push((
                LOG_LEVEL_ENV.to_string(),
                level.as_env_value().to_string().into(),
            ));
        }
        if let Some(library) = &options.tracing_library {
            env.push((
                "LD_PRELOAD".to_string(),
                preload_with(library, std::env::var_os("LD_PRELOAD")),
            ));
        }

        let program = words.remove(0);
        Ok(Self {
            program,
            args: words,
            env,
        })
    }
}

/// Prepend `library` to an existing `LD_PRELOAD` value
fn preload_with(library: &Path, existing: Option<OsString>) -> OsString {
    let mut value = library.as_os_str().to_owned();
    if let Some(existing) = existing.filter(|e| !e.is_empty()) {
        value.push(":");
        value.push(existing);
    }
    value
}

/// Expand an output template: `%m` is the process name, `%p` its pid
pub fn render_output(template: &str, name: &str, pid: Pid) -> PathBuf {
    PathBuf::from(
        template
            .replace("%m", name)
            .replace("%p", &pid.to_string()),
    )
}

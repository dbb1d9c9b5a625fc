/*!
 * Error Types
 * Crate-wide error handling with thiserror, miette and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::core::config::ConfigError;
pub use crate::naming::types::RegistryError;
pub use crate::process::core::types::{HandshakeError, ProcessError};

/// Unified error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum TaskhostError {
    #[error("Process error: {0}")]
    #[diagnostic(transparent)]
    Process(#[from] ProcessError),

    #[error("Registry error: {0}")]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error("Configuration error: {0}")]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    #[diagnostic(
        code(taskhost::io_error),
        help("Filesystem or descriptor operation failed. Check permissions and paths.")
    )]
    Io(String),
}

impl From<std::io::Error> for TaskhostError {
    fn from(err: std::io::Error) -> Self {
        TaskhostError::Io(err.to_string())
    }
}

/// Serializable error representation for machine-readable output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SerializableError {
    pub error_type: String,
    pub message: String,
}

impl SerializableError {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
        }
    }
}

impl From<&TaskhostError> for SerializableError {
    fn from(err: &TaskhostError) -> Self {
        let error_type = match err {
            TaskhostError::Process(_) => "process_error",
            TaskhostError::Registry(_) => "registry_error",
            TaskhostError::Config(_) => "config_error",
            TaskhostError::Io(_) => "io_error",
        };
        SerializableError::new(error_type, err.to_string())
    }
}

/*!
 * Naming Types
 * Error types for name resolution
 */

use miette::Diagnostic;
use thiserror::Error;

/// Registry operation result
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Name resolution errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum RegistryError {
    #[error("{}", not_found_message(.name, .consulted))]
    #[diagnostic(
        code(registry::not_found),
        help("The task may not be started yet. Retry later or add a registry that knows it.")
    )]
    NotFound { name: String, consulted: Vec<String> },

    #[error("{backend} is unreachable: {reason}")]
    #[diagnostic(
        code(registry::remote_unreachable),
        help("The directory or the task behind it cannot be contacted. Check that it is running.")
    )]
    RemoteUnreachable { backend: String, reason: String },

    #[error("'{name}' matches {count} different announcements")]
    #[diagnostic(
        code(registry::ambiguous),
        help("Several processes announce the same name. Stop the duplicates or use a more specific name.")
    )]
    Ambiguous { name: String, count: usize },

    #[error("namespace '{expected}' was expected but got '{got}' for name '{name}'")]
    #[diagnostic(code(registry::namespace_mismatch))]
    NamespaceMismatch {
        expected: String,
        got: String,
        name: String,
    },

    #[error("invalid namespace '{0}': namespaces cannot contain '/'")]
    #[diagnostic(code(registry::invalid_namespace))]
    InvalidNamespace(String),
}

impl RegistryError {
    pub(crate) fn unreachable(backend: impl Into<String>, reason: impl ToString) -> Self {
        RegistryError::RemoteUnreachable {
            backend: backend.into(),
            reason: reason.to_string(),
        }
    }
}

fn not_found_message(name: &str, consulted: &[String]) -> String {
    if consulted.is_empty() {
        format!(
            "the task {} could not be resolved, because no registry accepted the name",
            name
        )
    } else {
        format!(
            "the task {} could not be resolved using the following registries (in priority order): {}",
            name,
            consulted.join(", ")
        )
    }
}

/*!
 * Namespaces
 *
 * Names may be qualified as `namespace/basename`. A backend with a namespace
 * only answers for names that are unqualified or qualified with its own
 * namespace; the namespace is everything before the last delimiter.
 */

use super::types::{RegistryError, RegistryResult};
use crate::core::limits::NAMESPACE_DELIMITER;

/// Split a name into its namespace and basename
///
/// An empty namespace (`/camera`) is treated as no namespace.
pub fn split_name(name: &str) -> (Option<&str>, &str) {
    match name.rfind(NAMESPACE_DELIMITER) {
        Some(idx) => {
            let ns = &name[..idx];
            let base = &name[idx + NAMESPACE_DELIMITER.len_utf8()..];
            if ns.is_empty() {
                (None, base)
            } else {
                (Some(ns), base)
            }
        }
        None => (None, name),
    }
}

/// The name without its namespace
#[inline]
pub fn basename(name: &str) -> &str {
    split_name(name).1
}

/// Join a namespace and a basename
pub fn join_name(namespace: Option<&str>, basename: &str) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{}{}{}", ns, NAMESPACE_DELIMITER, basename),
        _ => basename.to_string(),
    }
}

/// Check that a string can be used as a namespace
pub fn validate_namespace(namespace: &str) -> RegistryResult<()> {
    if namespace.contains(NAMESPACE_DELIMITER) {
        return Err(RegistryError::InvalidNamespace(namespace.to_string()));
    }
    Ok(())
}

/// True if `name` belongs to `namespace`
///
/// Unqualified names and namespace-less backends always match.
pub fn same_namespace(namespace: Option<&str>, name: &str) -> bool {
    match (split_name(name).0, namespace) {
        (Some(ns), Some(own)) => ns == own,
        _ => true,
    }
}

/// Fail with `NamespaceMismatch` unless `name` belongs to `namespace`
pub fn verify_same_namespace(namespace: Option<&str>, name: &str) -> RegistryResult<()> {
    if same_namespace(namespace, name) {
        return Ok(());
    }
    Err(RegistryError::NamespaceMismatch {
        expected: namespace.unwrap_or_default().to_string(),
        got: split_name(name).0.unwrap_or_default().to_string(),
        name: name.to_string(),
    })
}

/// Re-qualify a name into `namespace`, replacing any namespace it had
pub fn map_to_namespace(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(_) => join_name(namespace, basename(name)),
        None => name.to_string(),
    }
}

/*!
 * Handle
 * Opaque, addressable reference to a task exposed by some process
 */

use super::namespace;
use crate::core::serialization::is_none;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Handles of one process, keyed by deployed task name
pub type HandleMap = BTreeMap<String, Handle>;

/// Address of a remote task plus the name it was resolved under
///
/// Two handles are equal iff their addresses are equal. A handle does not
/// own the task; it is the capability string the RPC layer connects with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Handle {
    address: String,
    logical_name: String,
    #[serde(default, skip_serializing_if = "is_none")]
    namespace: Option<String>,
}

impl Handle {
    #[inline]
    #[must_use]
    pub fn new(address: impl Into<String>, logical_name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            logical_name: logical_name.into(),
            namespace: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace.filter(|ns| !ns.is_empty());
        self
    }

    #[inline]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[inline]
    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    #[inline]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// `namespace/logical_name`, or the bare logical name without namespace
    pub fn qualified_name(&self) -> String {
        namespace::join_name(self.namespace(), &self.logical_name)
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Handle {}

impl Hash for Handle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.qualified_name(), self.address)
    }
}

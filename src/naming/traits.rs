/*!
 * Registry Traits
 * Common interface of every name resolution backend
 */

use super::handle::Handle;
use super::types::RegistryResult;
use async_trait::async_trait;

/// A backend that maps logical task names to handles
///
/// `get` returns `Ok(None)` when the backend simply does not know the name;
/// errors are reserved for backends that could not answer at all.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Human-readable backend name, used in logs and `NotFound` messages
    fn name(&self) -> String;

    /// Whether this backend may answer for `name`
    fn same_namespace(&self, _name: &str) -> bool {
        true
    }

    /// Resolve `name` into a handle
    async fn get(&self, name: &str) -> RegistryResult<Option<Handle>>;

    /// Every name this backend currently knows
    async fn names(&self) -> RegistryResult<Vec<String>>;

    /// Make `handle` resolvable as `name`
    async fn register(&self, name: &str, handle: &Handle) -> RegistryResult<()>;

    /// Remove `name`, returning whether it was known
    async fn deregister(&self, name: &str) -> RegistryResult<bool>;

    /// Drop entries whose task no longer responds, returning how many
    async fn cleanup(&self) -> RegistryResult<usize> {
        Ok(0)
    }

    /// Whether the task known as `name` can currently be reached
    async fn task_reachable(&self, name: &str) -> bool {
        matches!(self.get(name).await, Ok(Some(_)))
    }
}


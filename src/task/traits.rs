/*!
 * Task Traits
 * Narrow interface onto the RPC layer that talks to resolved tasks
 */

use super::types::RemoteError;
use crate::naming::Handle;
use async_trait::async_trait;

/// Operations the supervisor and the registries need from the RPC layer
///
/// Implementations own the connection handling; every call is expected to
/// return (successfully or not) within the RPC layer's own call timeout.
#[async_trait]
pub trait TaskRuntime: Send + Sync {
    /// Check that the task behind `handle` answers
    async fn ping(&self, handle: &Handle) -> Result<(), RemoteError>;

    /// Ask the task to stop and clean up
    async fn shutdown(&self, handle: &Handle) -> Result<(), RemoteError>;

    /// Drop every data connection of the task
    async fn disconnect(&self, handle: &Handle) -> Result<(), RemoteError>;
}

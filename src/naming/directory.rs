/*!
 * Remote Directory
 * Registry backed by a remote naming service
 *
 * The directory is namespaced by the host it runs on: every name it lists
 * is reported as `namespace/basename`, and lookups strip the namespace
 * before asking the service.
 */

use super::handle::Handle;
use super::namespace::{
    basename, map_to_namespace, same_namespace, validate_namespace, verify_same_namespace,
};
use super::traits::Registry;
use super::types::{RegistryError, RegistryResult};
use crate::task::{RemoteError, TaskRuntime};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Client side of the naming service protocol
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Where the service lives, for logs
    fn endpoint(&self) -> String;

    /// Address bound to `name`, or `None` when nothing is bound
    async fn resolve(&self, name: &str) -> Result<Option<String>, RemoteError>;

    async fn bind(&self, name: &str, address: &str) -> Result<(), RemoteError>;

    /// Returns whether something was bound to `name`
    async fn unbind(&self, name: &str) -> Result<bool, RemoteError>;

    /// Every bound name
    async fn list(&self) -> Result<Vec<String>, RemoteError>;
}

/// Registry view of a remote naming service
pub struct RemoteDirectory {
    client: Arc<dyn DirectoryClient>,
    namespace: Option<String>,
    runtime: Option<Arc<dyn TaskRuntime>>,
}

impl RemoteDirectory {
    pub fn new(client: Arc<dyn DirectoryClient>) -> Self {
        Self {
            client,
            namespace: None,
            runtime: None,
        }
    }

    /// Answer only for names in `namespace`
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> RegistryResult<Self> {
        let namespace = namespace.into();
        validate_namespace(&namespace)?;
        self.namespace = Some(namespace).filter(|ns| !ns.is_empty());
        Ok(self)
    }

    /// Validate resolved addresses with a live round-trip
    #[must_use]
    pub fn with_runtime(mut self, runtime: Arc<dyn TaskRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    fn unreachable(&self, err: RemoteError) -> RegistryError {
        RegistryError::unreachable(self.name(), err)
    }
}

#[async_trait]
impl Registry for RemoteDirectory {
    fn name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("Directory:{}", ns),
            None => format!("Directory:{}", self.client.endpoint()),
        }
    }

    fn same_namespace(&self, name: &str) -> bool {
        same_namespace(self.namespace(), name)
    }

    async fn get(&self, name: &str) -> RegistryResult<Option<Handle>> {
        verify_same_namespace(self.namespace(), name)?;
        let base = basename(name);

        let address = match self.client.resolve(base).await {
            Ok(Some(address)) => address,
            Ok(None) => return Ok(None),
            Err(e) => return Err(self.unreachable(e)),
        };

        let handle = Handle::new(address, base).with_namespace(self.namespace.clone());
        if let Some(runtime) = &self.runtime {
            runtime
                .ping(&handle)
                .await
                .map_err(|e| self.unreachable(e))?;
        }

        debug!(backend = %self.name(), task = %name, "resolved through directory");
        Ok(Some(handle))
    }

    async fn names(&self) -> RegistryResult<Vec<String>> {
        let names = self.client.list().await.map_err(|e| self.unreachable(e))?;
        Ok(names
            .iter()
            .map(|name| map_to_namespace(self.namespace(), name))
            .collect())
    }

    async fn register(&self, name: &str, handle: &Handle) -> RegistryResult<()> {
        verify_same_namespace(self.namespace(), name)?;
        self.client
            .bind(basename(name), handle.address())
            .await
            .map_err(|e| self.unreachable(e))
    }

    async fn deregister(&self, name: &str) -> RegistryResult<bool> {
        verify_same_namespace(self.namespace(), name)?;
        self.client
            .unbind(basename(name))
            .await
            .map_err(|e| self.unreachable(e))
    }

    async fn cleanup(&self) -> RegistryResult<usize> {
        let Some(runtime) = &self.runtime else {
            return Ok(0);
        };

        let names = self.client.list().await.map_err(|e| self.unreachable(e))?;
        let mut removed = 0;
        for name in names {
            let reachable = match self.client.resolve(&name).await {
                Ok(Some(address)) => runtime
                    .ping(&Handle::new(address, name.as_str()))
                    .await
                    .is_ok(),
                Ok(None) => continue,
                Err(e) => return Err(self.unreachable(e)),
            };
            if reachable {
                continue;
            }

            warn!(backend = %self.name(), task = %name, "unbinding unreachable task");
            match self.client.unbind(&name).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(backend = %self.name(), task = %name, error = %e, "failed to unbind task");
                }
            }
        }

        if removed > 0 {
            info!(backend = %self.name(), removed, "directory cleanup");
        }
        Ok(removed)
    }

    async fn task_reachable(&self, name: &str) -> bool {
        // get() already pings when a runtime is attached
        matches!(self.get(name).await, Ok(Some(_)))
    }
}

/*!
 * Resolver
 * Priority-ordered chain of registries
 *
 * The front of the list has the highest priority. Lookups go through the
 * backends in order and the first one that knows the name wins; backends
 * that cannot answer are logged and skipped.
 */

use super::handle::Handle;
use super::traits::Registry;
use super::types::{RegistryError, RegistryResult};
use crate::monitoring::span_operation;
use crate::task::TaskRuntime;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Ordered set of registries, without duplicates by identity
#[derive(Default)]
pub struct Resolver {
    backends: RwLock<Vec<Arc<dyn Registry>>>,
    runtime: Option<Arc<dyn TaskRuntime>>,
}

fn same_backend(a: &Arc<dyn Registry>, b: &Arc<dyn Registry>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the runtime used by `each_reachable`
    #[must_use]
    pub fn with_runtime(mut self, runtime: Arc<dyn TaskRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Append a backend with the lowest priority; no-op if already present
    pub fn add(&self, backend: Arc<dyn Registry>) {
        let mut backends = self.backends.write();
        if backends.iter().any(|b| same_backend(b, &backend)) {
            return;
        }
        debug!(backend = %backend.name(), "adding registry");
        backends.push(backend);
    }

    /// Insert a backend with the highest priority, moving it if present
    pub fn add_front(&self, backend: Arc<dyn Registry>) {
        let mut backends = self.backends.write();
        backends.retain(|b| !same_backend(b, &backend));
        debug!(backend = %backend.name(), "adding registry in front");
        backends.insert(0, backend);
    }

    /// Remove a backend, returning whether it was present
    pub fn remove(&self, backend: &Arc<dyn Registry>) -> bool {
        let mut backends = self.backends.write();
        let before = backends.len();
        backends.retain(|b| !same_backend(b, backend));
        backends.len() != before
    }

    pub fn clear(&self) {
        self.backends.write().clear();
    }

    /// Backends in priority order
    pub fn backends(&self) -> Vec<Arc<dyn Registry>> {
        self.backends.read().clone()
    }

    pub fn len(&self) -> usize {
        self.backends.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.read().is_empty()
    }

    /// Resolve `name` through the first backend that knows it
    pub async fn get(&self, name: &str) -> RegistryResult<Handle> {
        let span = span_operation("resolve", name);
        let mut consulted = Vec::new();

        for backend in self.backends() {
            if !backend.same_namespace(name) {
                continue;
            }
            let backend_name = backend.name();
            match backend.get(name).await {
                Ok(Some(handle)) => {
                    debug!(backend = %backend_name, task = %name, address = %handle.address(), "resolved");
                    span.record_result(true);
                    return Ok(handle);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(backend = %backend_name, task = %name, error = %e, "registry failed, skipping");
                }
            }
            consulted.push(backend_name);
        }

        let err = RegistryError::NotFound {
            name: name.to_string(),
            consulted,
        };
        span.record_error(&err);
        Err(err)
    }

    /// Union of the names known to every reachable backend
    pub async fn names(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        for backend in self.backends() {
            match backend.names().await {
                Ok(found) => names.extend(found),
                Err(e) => {
                    warn!(backend = %backend.name(), error = %e, "cannot list registry");
                }
            }
        }
        names.into_iter().collect()
    }

    /// Let every backend drop its unreachable entries
    ///
    /// Returns the total number of entries removed.
    pub async fn cleanup(&self) -> usize {
        let mut removed = 0;
        for backend in self.backends() {
            match backend.cleanup().await {
                Ok(count) => removed += count,
                Err(e) => {
                    warn!(backend = %backend.name(), error = %e, "registry cleanup failed");
                }
            }
        }
        removed
    }

    /// Names whose task currently answers
    ///
    /// With a runtime attached, every name is resolved through the chain and
    /// pinged; otherwise each backend decides for its own names.
    pub async fn each_reachable(&self) -> Vec<String> {
        let mut reachable = Vec::new();
        match &self.runtime {
            Some(runtime) => {
                for name in self.names().await {
                    if let Ok(handle) = self.get(&name).await {
                        if runtime.ping(&handle).await.is_ok() {
                            reachable.push(name);
                        }
                    }
                }
            }
            None => {
                let mut seen = BTreeSet::new();
                for backend in self.backends() {
                    let Ok(names) = backend.names().await else {
                        continue;
                    };
                    for name in names {
                        if seen.contains(&name) {
                            continue;
                        }
                        if backend.task_reachable(&name).await {
                            seen.insert(name.clone());
                            reachable.push(name);
                        }
                    }
                }
                reachable.sort();
            }
        }
        reachable
    }
}

/*!
 * Local Registry
 * In-process table of handles and task objects, with an alias map
 *
 * Lookup order: aliases first, then the primary list scanned by full name
 * and by basename. Entries never expire on their own; `cleanup` drops the
 * ones whose task stops answering pings when a runtime is attached.
 */

use super::handle::{Handle, HandleMap};
use super::namespace::basename;
use super::traits::Registry;
use super::types::RegistryResult;
use crate::task::{TaskRef, TaskRuntime};
use ahash::RandomState;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a local entry points to
#[derive(Debug, Clone)]
pub enum LocalTarget {
    Handle(Handle),
    Task(Arc<TaskRef>),
}

impl LocalTarget {
    pub fn handle(&self) -> &Handle {
        match self {
            LocalTarget::Handle(handle) => handle,
            LocalTarget::Task(task) => task.handle(),
        }
    }

    /// The name the target calls itself
    pub fn own_name(&self) -> &str {
        match self {
            LocalTarget::Handle(handle) => handle.logical_name(),
            LocalTarget::Task(task) => task.name(),
        }
    }

    fn task(&self) -> Option<Arc<TaskRef>> {
        match self {
            LocalTarget::Task(task) => Some(Arc::clone(task)),
            LocalTarget::Handle(_) => None,
        }
    }
}

/// Which of the two maps an entry lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Primary,
    Alias,
}

/// Registry over objects known to this process
pub struct LocalRegistry {
    entries: RwLock<Vec<LocalTarget>>,
    aliases: DashMap<String, LocalTarget, RandomState>,
    runtime: Option<Arc<dyn TaskRuntime>>,
}

impl LocalRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            aliases: DashMap::with_hasher(RandomState::new()),
            runtime: None,
        }
    }

    /// Seed the registry with the handles reported by a process
    pub fn from_handles(handles: &HandleMap) -> Self {
        let registry = Self::new();
        for (name, handle) in handles {
            registry.insert(name, LocalTarget::Handle(handle.clone()));
        }
        registry
    }

    /// Attach the runtime used by `cleanup` and `task_reachable`
    #[must_use]
    pub fn with_runtime(mut self, runtime: Arc<dyn TaskRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Register a task object under its own name
    pub fn register_task(&self, task: Arc<TaskRef>) {
        let name = task.name().to_string();
        self.insert(&name, LocalTarget::Task(task));
    }

    /// Register a task object as `name`
    pub fn register_task_as(&self, name: &str, task: Arc<TaskRef>) {
        self.insert(name, LocalTarget::Task(task));
    }

    /// Fetch the task object registered as `name`, if it is one
    pub fn get_task(&self, name: &str) -> Option<Arc<TaskRef>> {
        self.lookup(name).and_then(|target| target.task())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len() + self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, name: &str, target: LocalTarget) {
        if target.own_name() == name {
            let mut entries = self.entries.write();
            entries.retain(|entry| entry.own_name() != name);
            entries.push(target);
        } else {
            debug!(alias = %name, target = %target.own_name(), "registering local alias");
            self.aliases.insert(name.to_string(), target);
        }
    }

    /// Remove `name` from the map it was found in, if it still points to `handle`
    fn remove_stale(&self, slot: Slot, name: &str, handle: &Handle) -> bool {
        match slot {
            Slot::Primary => {
                let mut entries = self.entries.write();
                let before = entries.len();
                entries.retain(|entry| entry.own_name() != name || entry.handle() != handle);
                entries.len() != before
            }
            Slot::Alias => self
                .aliases
                .remove_if(name, |_, target| target.handle() == handle)
                .is_some(),
        }
    }

    fn lookup(&self, name: &str) -> Option<LocalTarget> {
        if let Some(target) = self.aliases.get(name) {
            return Some(target.value().clone());
        }
        let base = basename(name);
        self.entries
            .read()
            .iter()
            .find(|entry| entry.own_name() == name || entry.own_name() == base)
            .cloned()
    }
}

impl Default for LocalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Registry for LocalRegistry {
    fn name(&self) -> String {
        "Local".to_string()
    }

    async fn get(&self, name: &str) -> RegistryResult<Option<Handle>> {
        Ok(self.lookup(name).map(|target| target.handle().clone()))
    }

    async fn names(&self) -> RegistryResult<Vec<String>> {
        let mut names: BTreeSet<String> = self
            .entries
            .read()
            .iter()
            .map(|entry| entry.own_name().to_string())
            .collect();
        names.extend(self.aliases.iter().map(|entry| entry.key().clone()));
        Ok(names.into_iter().collect())
    }

    async fn register(&self, name: &str, handle: &Handle) -> RegistryResult<()> {
        self.insert(name, LocalTarget::Handle(handle.clone()));
        Ok(())
    }

    async fn deregister(&self, name: &str) -> RegistryResult<bool> {
        let aliased = self.aliases.remove(name).is_some();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|entry| entry.own_name() != name);
        Ok(aliased || entries.len() != before)
    }

    async fn cleanup(&self) -> RegistryResult<usize> {
        let Some(runtime) = &self.runtime else {
            return Ok(0);
        };

        let snapshot: Vec<(Slot, String, Handle)> = self
            .entries
            .read()
            .iter()
            .map(|entry| (Slot::Primary, entry.own_name().to_string(), entry.handle().clone()))
            .chain(self.aliases.iter().map(|entry| {
                (Slot::Alias, entry.key().clone(), entry.value().handle().clone())
            }))
            .collect();

        let mut removed = 0;
        for (slot, name, handle) in snapshot {
            if let Err(e) = runtime.ping(&handle).await {
                warn!(task = %name, slot = ?slot, error = %e, "removing unreachable local entry");
                if self.remove_stale(slot, &name, &handle) {
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            info!(removed, "local registry cleanup");
        }
        Ok(removed)
    }

    async fn task_reachable(&self, name: &str) -> bool {
        let Some(target) = self.lookup(name) else {
            return false;
        };
        match &self.runtime {
            Some(runtime) => runtime.ping(target.handle()).await.is_ok(),
            None => true,
        }
    }
}

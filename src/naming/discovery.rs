/*!
 * Discovery Registry
 * Registry over a service-announcement mechanism
 *
 * Several announcements can match one name (the same task seen on several
 * interfaces, or genuinely different processes using the same name).
 * Announcements of the same address collapse into one; distinct addresses
 * are reported as `Ambiguous`.
 */

use super::handle::Handle;
use super::traits::Registry;
use super::types::{RegistryError, RegistryResult};
use crate::task::{RemoteError, TaskRuntime};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One service announcement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub interface: Option<String>,
}

impl Announcement {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            interface: None,
        }
    }
}

/// Client side of the announcement service
#[async_trait]
pub trait DiscoveryBrowser: Send + Sync {
    fn domain(&self) -> String;

    /// Announcements currently matching `name`
    async fn find(&self, name: &str) -> Result<Vec<Announcement>, RemoteError>;

    /// Every current announcement
    async fn all(&self) -> Result<Vec<Announcement>, RemoteError>;

    async fn publish(&self, announcement: &Announcement) -> Result<(), RemoteError>;

    async fn retract(&self, name: &str) -> Result<(), RemoteError>;
}

/// Registry view of a discovery browser
pub struct DiscoveryRegistry {
    browser: Arc<dyn DiscoveryBrowser>,
    runtime: Option<Arc<dyn TaskRuntime>>,
    published: Mutex<BTreeSet<String>>,
}

impl DiscoveryRegistry {
    pub fn new(browser: Arc<dyn DiscoveryBrowser>) -> Self {
        Self {
            browser,
            runtime: None,
            published: Mutex::new(BTreeSet::new()),
        }
    }

    #[must_use]
    pub fn with_runtime(mut self, runtime: Arc<dyn TaskRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Names this registry announced itself
    pub fn published(&self) -> Vec<String> {
        self.published.lock().iter().cloned().collect()
    }

    fn unreachable(&self, err: RemoteError) -> RegistryError {
        RegistryError::unreachable(self.name(), err)
    }
}

/// Distinct non-empty addresses among `announcements`, in announcement order
fn distinct_addresses(announcements: &[Announcement]) -> Vec<&str> {
    let mut seen = BTreeSet::new();
    announcements
        .iter()
        .map(|a| a.address.as_str())
        .filter(|address| !address.is_empty() && seen.insert(*address))
        .collect()
}

#[async_trait]
impl Registry for DiscoveryRegistry {
    fn name(&self) -> String {
        format!("Discovery:{}", self.browser.domain())
    }

    async fn get(&self, name: &str) -> RegistryResult<Option<Handle>> {
        let announcements = self
            .browser
            .find(name)
            .await
            .map_err(|e| self.unreachable(e))?;

        let addresses = distinct_addresses(&announcements);
        match addresses.as_slice() {
            [] => Ok(None),
            [address] => {
                debug!(backend = %self.name(), task = %name, "resolved through discovery");
                Ok(Some(Handle::new(*address, name)))
            }
            _ => {
                warn!(
                    backend = %self.name(),
                    task = %name,
                    count = addresses.len(),
                    "more than one announcement matches"
                );
                Err(RegistryError::Ambiguous {
                    name: name.to_string(),
                    count: addresses.len(),
                })
            }
        }
    }

    async fn names(&self) -> RegistryResult<Vec<String>> {
        let announcements = self.browser.all().await.map_err(|e| self.unreachable(e))?;
        let names: BTreeSet<String> = announcements
            .into_iter()
            .filter(|a| !a.address.is_empty())
            .map(|a| a.name)
            .collect();
        Ok(names.into_iter().collect())
    }

    async fn register(&self, name: &str, handle: &Handle) -> RegistryResult<()> {
        self.browser
            .publish(&Announcement::new(name, handle.address()))
            .await
            .map_err(|e| self.unreachable(e))?;
        self.published.lock().insert(name.to_string());
        Ok(())
    }

    async fn deregister(&self, name: &str) -> RegistryResult<bool> {
        if !self.published.lock().contains(name) {
            return Ok(false);
        }
        self.browser
            .retract(name)
            .await
            .map_err(|e| self.unreachable(e))?;
        self.published.lock().remove(name);
        Ok(true)
    }

    async fn cleanup(&self) -> RegistryResult<usize> {
        let Some(runtime) = &self.runtime else {
            return Ok(0);
        };

        let mut removed = 0;
        for name in self.published() {
            let reachable = match self.get(&name).await {
                Ok(Some(handle)) => runtime.ping(&handle).await.is_ok(),
                Ok(None) => false,
                Err(e) => {
                    warn!(backend = %self.name(), task = %name, error = %e, "skipping cleanup");
                    continue;
                }
            };
            if !reachable {
                warn!(backend = %self.name(), task = %name, "retracting unreachable task");
                if self.deregister(&name).await? {
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            info!(backend = %self.name(), removed, "discovery cleanup");
        }
        Ok(removed)
    }

    async fn task_reachable(&self, name: &str) -> bool {
        match (self.get(name).await, &self.runtime) {
            (Ok(Some(handle)), Some(runtime)) => runtime.ping(&handle).await.is_ok(),
            (Ok(Some(_)), None) => true,
            _ => false,
        }
    }
}

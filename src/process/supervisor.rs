/*!
 * Supervisor
 * Context shared by every supervised process, and its builder
 *
 * The context replaces process-wide globals: it owns the configuration,
 * the optional RPC runtime, the directory dangling names are retracted
 * from, and the pid registry of live children.
 */

use super::core::types::ProcessResult;
use super::descriptor::ProcessDescriptor;
use super::options::SpawnOptions;
use super::supervised::{KillOptions, Process, ProcessInner};
use crate::core::config::SupervisorConfig;
use crate::core::types::Pid;
use crate::monitoring::{span_operation, OperationSpan};
use crate::naming::Registry;
use crate::task::TaskRuntime;
use ahash::RandomState;
use dashmap::DashMap;
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid as NixPid;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// State shared by the supervisor and its processes
pub struct SupervisorContext {
    config: SupervisorConfig,
    runtime: Option<Arc<dyn TaskRuntime>>,
    publish: Option<Arc<dyn Registry>>,
    processes: DashMap<Pid, Weak<ProcessInner>, RandomState>,
}

impl SupervisorContext {
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn runtime(&self) -> Option<Arc<dyn TaskRuntime>> {
        self.runtime.clone()
    }

    pub fn publish_directory(&self) -> Option<Arc<dyn Registry>> {
        self.publish.clone()
    }

    /// Operation span using the configured slow-operation threshold
    pub(crate) fn span(&self, operation: &str, subject: &str) -> OperationSpan {
        span_operation(operation, subject).with_threshold(self.config.slow_operation_threshold)
    }

    pub(crate) fn track(&self, pid: Pid, process: &Arc<ProcessInner>) {
        self.processes.insert(pid, Arc::downgrade(process));
    }

    /// Drop the entry for `pid` if it still belongs to `process`
    ///
    /// A recycled pid may already be tracked for a newer child.
    pub(crate) fn untrack(&self, pid: Pid, process: &Weak<ProcessInner>) {
        if self
            .processes
            .remove_if(&pid, |_, tracked| Weak::ptr_eq(tracked, process))
            .is_some()
        {
            debug!(pid, "removed from pid registry");
        }
    }

    /// Live process with OS pid `pid`
    pub fn find(&self, pid: Pid) -> Option<Process> {
        self.processes
            .get(&pid)
            .and_then(|entry| entry.value().upgrade())
            .map(Process::from_inner)
    }

    /// Every live process still referenced somewhere
    pub fn live(&self) -> Vec<Process> {
        self.processes
            .iter()
            .filter_map(|entry| entry.value().upgrade())
            .map(Process::from_inner)
            .collect()
    }

    /// Number of entries in the pid registry
    pub fn tracked(&self) -> usize {
        self.processes.len()
    }
}

/// Entry point for spawning and supervising component processes
#[derive(Clone)]
pub struct Supervisor {
    context: Arc<SupervisorContext>,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        SupervisorBuilder::new().with_config(config).build()
    }

    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::new()
    }

    pub fn context(&self) -> &Arc<SupervisorContext> {
        &self.context
    }

    pub fn config(&self) -> &SupervisorConfig {
        self.context.config()
    }

    /// Spawn one process; returns once the child exists
    pub async fn spawn(
        &self,
        descriptor: ProcessDescriptor,
        options: SpawnOptions,
    ) -> ProcessResult<Process> {
        Process::spawn(&self.context, descriptor, options).await
    }

    pub fn find(&self, pid: Pid) -> Option<Process> {
        self.context.find(pid)
    }

    pub fn processes(&self) -> Vec<Process> {
        self.context.live()
    }

    /// Kill every live process (hard, waited) and clear the pid registry
    ///
    /// Children whose `Process` handles were all dropped are still killed
    /// through their pid. Returns the number of processes that were killed.
    pub async fn shutdown(&self) -> usize {
        let tracked: Vec<(Pid, Option<Process>)> = self
            .context
            .processes
            .iter()
            .map(|entry| (*entry.key(), entry.value().upgrade().map(Process::from_inner)))
            .collect();

        let mut killed = 0;
        for (pid, process) in tracked {
            match process {
                Some(process) if process.is_alive() => {
                    match process.kill(KillOptions::hard()).await {
                        Ok(_) => killed += 1,
                        Err(e) => {
                            warn!(process = %process.name(), error = %e, "failed to kill during shutdown")
                        }
                    }
                }
                Some(_) => {}
                None => match killpg(NixPid::from_raw(pid as i32), Signal::SIGKILL) {
                    Ok(()) => killed += 1,
                    Err(Errno::ESRCH) => {}
                    Err(e) => warn!(pid, error = %e, "failed to kill orphaned process"),
                },
            }
        }
        self.context.processes.clear();
        info!(killed, "supervisor shut down");
        killed
    }
}

/// Builder for Supervisor
pub struct SupervisorBuilder {
    config: SupervisorConfig,
    runtime: Option<Arc<dyn TaskRuntime>>,
    publish: Option<Arc<dyn Registry>>,
}

impl SupervisorBuilder {
    pub fn new() -> Self {
        Self {
            config: SupervisorConfig::default(),
            runtime: None,
            publish: None,
        }
    }

    pub fn with_config(mut self, config: SupervisorConfig) -> Self {
        self.config = config;
        self
    }

    /// RPC layer used for the graceful shutdown sweep
    pub fn with_runtime(mut self, runtime: Arc<dyn TaskRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Directory the names of dead processes are retracted from
    pub fn with_publish_directory(mut self, directory: Arc<dyn Registry>) -> Self {
        self.publish = Some(directory);
        self
    }

    pub fn build(self) -> Supervisor {
        info!(
            runtime = self.runtime.is_some(),
            publish = self.publish.is_some(),
            "building supervisor"
        );
        Supervisor {
            context: Arc::new(SupervisorContext {
                config: self.config,
                runtime: self.runtime,
                publish: self.publish,
                processes: DashMap::with_hasher(RandomState::new()),
            }),
        }
    }
}

impl Default for SupervisorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

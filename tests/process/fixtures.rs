/*!
 * Process Test Fixtures
 * Shell-script components that speak the handshake protocol
 */

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;
use taskhost::{
    DeploymentModel, Handle, ProcessDescriptor, RemoteError, SupervisorConfig, TaskModel,
    TaskRuntime,
};
use tempfile::TempDir;

/// Directory holding generated component scripts
pub struct Components {
    pub dir: TempDir,
}

impl Components {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Write an executable shell script (bash: dash cannot redirect to fds above 9)
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, format!("#!/usr/bin/env bash\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Descriptor for the script `name` declaring `tasks`
    pub fn descriptor(&self, name: &str, body: &str, tasks: &[&str]) -> ProcessDescriptor {
        let binary = self.script(name, body);
        let model = tasks
            .iter()
            .fold(DeploymentModel::new(name, binary), |model, task| {
                model.with_task(TaskModel::new(*task))
            });
        ProcessDescriptor::new(model)
    }
}

/// Shell snippet writing `message` to the handshake channel and closing it
pub fn report(message: &str) -> String {
    format!(
        "printf '%s' '{}' >&\"$TASKHOST_HANDSHAKE_FD\"\neval \"exec $TASKHOST_HANDSHAKE_FD>&-\"",
        message
    )
}

/// Configuration with short grace periods
pub fn quick_config() -> SupervisorConfig {
    SupervisorConfig {
        wait_running_timeout: Duration::from_secs(5),
        kill_grace: Duration::from_secs(2),
        ..SupervisorConfig::default()
    }
}

/// RPC fake recording calls; shutdown fails for the listed tasks
#[derive(Default)]
pub struct RecordingRuntime {
    pub failing: Vec<String>,
    pub calls: Mutex<Vec<String>>,
}

impl RecordingRuntime {
    pub fn failing_for(tasks: &[&str]) -> Self {
        Self {
            failing: tasks.iter().map(|t| t.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl TaskRuntime for RecordingRuntime {
    async fn ping(&self, _handle: &Handle) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn shutdown(&self, handle: &Handle) -> Result<(), RemoteError> {
        self.calls
            .lock()
            .push(format!("shutdown:{}", handle.logical_name()));
        if self.failing.iter().any(|t| t == handle.logical_name()) {
            return Err(RemoteError::Communication("task does not answer".into()));
        }
        Ok(())
    }

    async fn disconnect(&self, handle: &Handle) -> Result<(), RemoteError> {
        self.calls
            .lock()
            .push(format!("disconnect:{}", handle.logical_name()));
        Ok(())
    }
}

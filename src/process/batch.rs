/*!
 * Batch Start
 * Start several processes as one unit
 *
 * Either every process of the batch reaches RUNNING, or every process that
 * was started is killed (hard, waited) and the first error is returned.
 */

use super::core::types::{ProcessError, ProcessResult};
use super::descriptor::ProcessDescriptor;
use super::options::SpawnOptions;
use super::supervised::{KillOptions, Process};
use super::supervisor::Supervisor;
use futures::future::join_all;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// One process of a batch
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub descriptor: ProcessDescriptor,
    pub options: SpawnOptions,
}

impl SpawnRequest {
    pub fn new(descriptor: ProcessDescriptor, options: SpawnOptions) -> Self {
        Self {
            descriptor,
            options,
        }
    }
}

impl Supervisor {
    /// Spawn every request, then wait until all of them are running
    ///
    /// `timeout` bounds the whole wait, not each process. `None` waits
    /// forever; a zero timeout fails unless every handshake is already
    /// complete.
    pub async fn run(
        &self,
        batch: Vec<SpawnRequest>,
        timeout: Option<Duration>,
    ) -> ProcessResult<Vec<Process>> {
        let span = self
            .context()
            .span("run", &format!("{} processes", batch.len()))
            .with_threshold(timeout.unwrap_or(Duration::MAX));
        let mut started = Vec::with_capacity(batch.len());

        for request in batch {
            match self.spawn(request.descriptor, request.options).await {
                Ok(process) => started.push(process),
                Err(e) => {
                    span.record_error(&e);
                    rollback(&started).await;
                    return Err(e);
                }
            }
        }

        let deadline = timeout.map(|limit| (Instant::now() + limit, limit));
        for process in &started {
            let remaining = deadline.map(|(at, _)| at.saturating_duration_since(Instant::now()));
            let outcome = match process.wait_running(remaining).await {
                Ok(Some(_)) => Ok(()),
                // report the batch budget, not what was left of it
                Ok(None) | Err(ProcessError::HandshakeTimeout { .. }) => {
                    Err(ProcessError::HandshakeTimeout {
                        name: process.name().to_string(),
                        timeout: deadline.map(|(_, limit)| limit).unwrap_or_default(),
                    })
                }
                Err(e) => Err(e),
            };
            if let Err(e) = outcome {
                span.record_error(&e);
                rollback(&started).await;
                return Err(e);
            }
        }

        info!(processes = started.len(), "batch running");
        span.record_result(true);
        Ok(started)
    }
}

/// Kill every process started so far, concurrently
async fn rollback(started: &[Process]) {
    warn!(processes = started.len(), "rolling back batch start");
    let kills = started.iter().map(|process| async move {
        if let Err(e) = process.kill(KillOptions::hard()).await {
            warn!(process = %process.name(), error = %e, "rollback kill failed");
        }
    });
    join_all(kills).await;
}

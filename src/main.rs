/*!
 * Taskhost - Main Entry Point
 *
 * Starts the components given on the command line, prints the handles they
 * report as JSON and keeps them running until Ctrl-C.
 *
 * Usage: taskhost PATH[:TASK,TASK...]...
 */

use anyhow::{bail, Context, Result};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

use taskhost::{
    init_tracing, DeploymentModel, ProcessDescriptor, SerializableError, SpawnOptions,
    SpawnRequest, Supervisor, SupervisorConfig, TaskModel, TaskhostError,
};

/// Parse `PATH[:TASK,TASK...]` into a deployment
fn parse_deployment(arg: &str) -> Result<DeploymentModel> {
    let (path, tasks) = match arg.rsplit_once(':') {
        Some((path, tasks)) if !path.is_empty() => (path, Some(tasks)),
        _ => (arg, None),
    };

    let binary = PathBuf::from(path);
    let name = binary
        .file_stem()
        .and_then(|stem| stem.to_str())
        .with_context(|| format!("cannot derive a process name from '{}'", path))?
        .to_string();

    let mut model = DeploymentModel::new(name.clone(), binary);
    match tasks {
        Some(tasks) => {
            for task in tasks.split(',').filter(|t| !t.is_empty()) {
                model = model.with_task(TaskModel::new(task));
            }
        }
        // components without declared tasks report one named after themselves
        None => model = model.with_task(TaskModel::new(name)),
    }
    Ok(model)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        bail!("usage: taskhost PATH[:TASK,TASK...]...");
    }

    let config = SupervisorConfig::from_env().map_err(TaskhostError::from)?;
    let timeout = config.wait_running_timeout;
    let supervisor = Supervisor::new(config);

    let batch = args
        .iter()
        .map(|arg| {
            parse_deployment(arg)
                .map(|model| SpawnRequest::new(ProcessDescriptor::new(model), SpawnOptions::new()))
        })
        .collect::<Result<Vec<_>>>()?;

    info!(processes = batch.len(), "starting components");
    let processes = match supervisor.run(batch, Some(timeout)).await {
        Ok(processes) => processes,
        Err(e) => {
            let error = TaskhostError::from(e);
            eprintln!("{}", serde_json::to_string_pretty(&SerializableError::from(&error))?);
            return Err(error.into());
        }
    };

    let report: serde_json::Map<String, serde_json::Value> = processes
        .iter()
        .map(|process| {
            (
                process.name().to_string(),
                json!({
                    "pid": process.pid(),
                    "handles": process.handles().unwrap_or_default(),
                }),
            )
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&report)?);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("interrupted, stopping components");

    let killed = supervisor.shutdown().await;
    info!(killed, "components stopped");
    Ok(())
}

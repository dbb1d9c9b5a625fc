/*!
 * Batch Tests
 * All-or-nothing start of several processes
 */

use super::fixtures::{quick_config, report, Components};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::time::{Duration, Instant};
use taskhost::{ProcessError, ProcessState, SpawnOptions, SpawnRequest, Supervisor};

#[tokio::test]
#[serial]
async fn test_batch_starts_every_process() {
    let components = Components::new();
    let supervisor = Supervisor::new(quick_config());
    let batch = vec![
        SpawnRequest::new(
            components.descriptor(
                "left",
                &format!("{}\nexec sleep 30", report(r#"{"left":"IOR:l"}"#)),
                &["left"],
            ),
            SpawnOptions::new(),
        ),
        SpawnRequest::new(
            components.descriptor(
                "right",
                &format!("sleep 0.2\n{}\nexec sleep 30", report(r#"{"right":"IOR:r"}"#)),
                &["right"],
            ),
            SpawnOptions::new(),
        ),
    ];

    let processes = supervisor
        .run(batch, Some(Duration::from_secs(5)))
        .await
        .unwrap();

    let names: Vec<_> = processes.iter().map(|p| p.name().to_string()).collect();
    assert_eq!(names, vec!["left", "right"]);
    assert!(processes
        .iter()
        .all(|p| p.state() == ProcessState::Running));
    assert_eq!(processes[1].handles().unwrap()["right"].address(), "IOR:r");

    assert_eq!(supervisor.shutdown().await, 2);
    assert!(processes
        .iter()
        .all(|p| p.state() == ProcessState::Terminated));
}

#[tokio::test]
#[serial]
async fn test_batch_rolls_back_on_crash() {
    let components = Components::new();
    let supervisor = Supervisor::new(quick_config());
    let healthy = components.descriptor(
        "healthy",
        &format!("{}\nexec sleep 30", report(r#"{"healthy":"IOR:h"}"#)),
        &["healthy"],
    );
    let batch = vec![
        SpawnRequest::new(healthy, SpawnOptions::new()),
        SpawnRequest::new(
            components.descriptor("doomed", "sleep 0.2\nkill -SEGV $$", &["doomed"]),
            SpawnOptions::new(),
        ),
    ];

    let err = supervisor
        .run(batch, Some(Duration::from_secs(5)))
        .await
        .unwrap_err();

    assert!(matches!(err, ProcessError::ProcessCrashed { ref name, .. } if name == "doomed"));
    assert_eq!(supervisor.context().tracked(), 0);
    assert!(supervisor.processes().is_empty());
}

#[tokio::test]
#[serial]
async fn test_batch_rolls_back_on_spawn_failure() {
    let components = Components::new();
    let supervisor = Supervisor::new(quick_config());
    let batch = vec![
        SpawnRequest::new(
            components.descriptor("first", "exec sleep 30", &["first"]),
            SpawnOptions::new(),
        ),
        SpawnRequest::new(
            taskhost::ProcessDescriptor::new(taskhost::DeploymentModel::new(
                "missing",
                components.dir.path().join("missing"),
            )),
            SpawnOptions::new(),
        ),
    ];

    let err = supervisor.run(batch, None).await.unwrap_err();

    assert!(matches!(err, ProcessError::SpawnFailed { ref name, .. } if name == "missing"));
    assert_eq!(supervisor.context().tracked(), 0);
}

#[tokio::test]
#[serial]
async fn test_batch_timeout_is_shared() {
    let components = Components::new();
    let supervisor = Supervisor::new(quick_config());
    let batch = ["one", "two", "three"]
        .into_iter()
        .map(|name| {
            SpawnRequest::new(
                components.descriptor(name, "exec sleep 30", &[name]),
                SpawnOptions::new(),
            )
        })
        .collect();

    let limit = Duration::from_millis(300);
    let started = Instant::now();
    let err = supervisor.run(batch, Some(limit)).await.unwrap_err();

    assert!(matches!(err, ProcessError::HandshakeTimeout { timeout, .. } if timeout == limit));
    assert!(started.elapsed() < limit * 3, "took {:?}", started.elapsed());
    assert_eq!(supervisor.context().tracked(), 0);
}

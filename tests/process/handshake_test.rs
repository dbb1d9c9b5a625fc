/*!
 * Handshake Tests
 * Spawning real components and consuming their handshake
 */

use super::fixtures::{quick_config, report, Components};
use nix::sys::signal::Signal;
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::time::{Duration, Instant};
use taskhost::process::HandshakeError;
use taskhost::{
    KillOptions, LogLevel, Member, ProcessError, ProcessState, SpawnOptions, Supervisor,
};

#[tokio::test]
#[serial]
async fn test_subset_handshake_is_accepted() {
    let components = Components::new();
    let supervisor = Supervisor::new(quick_config());
    let descriptor = components.descriptor(
        "pair",
        &format!("{}\nexec sleep 30", report(r#"{"a":"IOR:a"}"#)),
        &["a", "b"],
    );

    let process = supervisor
        .spawn(descriptor, SpawnOptions::new())
        .await
        .unwrap();
    assert!(process.pid().is_some());
    assert_eq!(supervisor.context().tracked(), 1);

    let handles = process
        .wait_running(Some(Duration::from_secs(5)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(handles.keys().collect::<Vec<_>>(), vec!["a"]);
    assert_eq!(handles["a"].address(), "IOR:a");
    assert_eq!(process.state(), ProcessState::Running);

    // cached: a second call does not touch the channel again
    let again = process.wait_running(Some(Duration::ZERO)).await.unwrap();
    assert_eq!(again, Some(handles));

    process.kill(KillOptions::hard()).await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_partial_message_is_invisible_until_close() {
    let components = Components::new();
    let supervisor = Supervisor::new(quick_config());
    let body = [
        r#"printf '%s' '{"a":' >&"$TASKHOST_HANDSHAKE_FD""#,
        "sleep 1",
        r#"printf '%s' '"IOR:a"}' >&"$TASKHOST_HANDSHAKE_FD""#,
        r#"eval "exec $TASKHOST_HANDSHAKE_FD>&-""#,
        "exec sleep 30",
    ]
    .join("\n");
    let descriptor = components.descriptor("slow", &body, &["a"]);

    let process = supervisor
        .spawn(descriptor, SpawnOptions::new())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(process.wait_running(Some(Duration::ZERO)).await.unwrap(), None);
    assert_eq!(process.state(), ProcessState::Starting);
    assert!(process.handles().is_none());

    let handles = process.wait_running(None).await.unwrap().unwrap();
    assert_eq!(handles["a"].address(), "IOR:a");

    process.kill(KillOptions::hard()).await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_unexpected_task_rejects_whole_message() {
    let components = Components::new();
    let supervisor = Supervisor::new(quick_config());
    let descriptor = components.descriptor(
        "ghostly",
        &format!(
            "{}\nexec sleep 30",
            report(r#"{"a":"IOR:a","ghost":"IOR:g"}"#)
        ),
        &["a", "b"],
    );

    let process = supervisor
        .spawn(descriptor, SpawnOptions::new())
        .await
        .unwrap();
    let err = process
        .wait_running(Some(Duration::from_secs(5)))
        .await
        .unwrap_err();

    match &err {
        ProcessError::InvalidHandshakeMessage { source, .. } => {
            assert!(matches!(source, HandshakeError::UnexpectedTask { name, .. } if name == "ghost"));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(process.handles().is_none());
    assert_eq!(process.state(), ProcessState::RuntimeError);

    // the verdict is sticky
    assert_eq!(
        process.wait_running(Some(Duration::ZERO)).await.unwrap_err(),
        err
    );

    process.kill(KillOptions::hard()).await.unwrap();
    assert_eq!(process.state(), ProcessState::Terminated);
}

#[tokio::test]
#[serial]
async fn test_name_mappings_and_log_level_reach_the_child() {
    let components = Components::new();
    let supervisor = Supervisor::new(quick_config());
    let body = [
        r#"case "$*" in *--rename=camera:front_camera*) ;; *) exit 3 ;; esac"#,
        r#"[ "$COMPONENT_LOG_LEVEL" = "6" ] || exit 4"#,
        &report(r#"{"front_camera":"IOR:cam"}"#),
        "exec sleep 30",
    ]
    .join("\n");
    let binary = components.script("cameras", &body);
    let model = taskhost::DeploymentModel::new("cameras", binary).with_task(
        taskhost::TaskModel::new("camera").with_port(
            "frame",
            "/base/Frame",
            taskhost::task::PortDirection::Output,
        ),
    );

    let process = supervisor
        .spawn(
            taskhost::ProcessDescriptor::new(model),
            SpawnOptions::new()
                .with_name_mapping("camera", "front_camera")
                .with_log_level(LogLevel::Debug),
        )
        .await
        .unwrap();

    let handles = process
        .wait_running(Some(Duration::from_secs(5)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(handles["front_camera"].address(), "IOR:cam");

    // reachable through both the declared and the deployed name
    let by_declared = process.task("camera").unwrap();
    let by_deployed = process.task("front_camera").unwrap();
    assert_eq!(by_declared.name(), "front_camera");
    assert_eq!(by_declared.handle(), by_deployed.handle());
    assert!(matches!(by_declared.member("frame"), Member::Port(_)));

    let registry = process.registry().unwrap();
    assert!(registry.get_task("front_camera").is_some());

    process.kill(KillOptions::hard()).await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_crash_before_handshake() {
    let components = Components::new();
    let supervisor = Supervisor::new(quick_config());
    let descriptor = components.descriptor("crasher", "kill -SEGV $$", &["a"]);

    let process = supervisor
        .spawn(descriptor, SpawnOptions::new())
        .await
        .unwrap();
    let err = process
        .wait_running(Some(Duration::from_secs(5)))
        .await
        .unwrap_err();

    match err {
        ProcessError::ProcessCrashed { status, .. } => {
            assert_eq!(status.and_then(|s| s.signal()), Some(Signal::SIGSEGV));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(process.pid(), None);
    assert_eq!(process.state(), ProcessState::Terminated);
    assert_eq!(supervisor.context().tracked(), 0);
}

#[tokio::test]
#[serial]
async fn test_clean_exit_without_message_is_a_crash() {
    let components = Components::new();
    let supervisor = Supervisor::new(quick_config());
    let descriptor = components.descriptor("quitter", "exit 2", &["a"]);

    let process = supervisor
        .spawn(descriptor, SpawnOptions::new())
        .await
        .unwrap();
    let err = process.wait_running(None).await.unwrap_err();

    assert!(matches!(
        err,
        ProcessError::ProcessCrashed { status: Some(status), .. } if status.exit_code == Some(2)
    ));
}

#[tokio::test]
#[serial]
async fn test_timeout_is_bounded_and_closes_channel() {
    let components = Components::new();
    let supervisor = Supervisor::new(quick_config());
    // reports too late; the write fails once the read end is gone
    let body = [
        "sleep 1",
        r#"printf '%s' '{"a":"IOR:a"}' >&"$TASKHOST_HANDSHAKE_FD" || exit 7"#,
        "exit 0",
    ]
    .join("\n");
    let descriptor = components.descriptor("late", &body, &["a"]);

    let process = supervisor
        .spawn(descriptor, SpawnOptions::new())
        .await
        .unwrap();

    let limit = Duration::from_millis(300);
    let started = Instant::now();
    let err = process.wait_running(Some(limit)).await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, ProcessError::HandshakeTimeout { timeout, .. } if timeout == limit));
    assert!(elapsed >= limit);
    assert!(elapsed < limit * 2, "timeout took {:?}", elapsed);

    // the verdict holds while the process lives
    assert_eq!(process.state(), ProcessState::Starting);
    assert_eq!(
        process.wait_running(Some(Duration::ZERO)).await.unwrap_err(),
        err
    );

    let status = process.join().await.unwrap().unwrap();
    assert_ne!(status.exit_code, Some(0), "late report reached the supervisor");
    assert!(process.handles().is_none());
    assert!(matches!(
        process.wait_running(Some(Duration::ZERO)).await,
        Err(ProcessError::ProcessCrashed { .. })
    ));
}

#[tokio::test]
#[serial]
async fn test_deadline_covers_concurrent_waiter() {
    let components = Components::new();
    let supervisor = Supervisor::new(quick_config());
    let descriptor = components.descriptor("mute", "exec sleep 30", &["a"]);

    let process = supervisor
        .spawn(descriptor, SpawnOptions::new())
        .await
        .unwrap();
    let reader = process.clone();
    let patient = tokio::spawn(async move { reader.wait_running(None).await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let limit = Duration::from_millis(200);
    let started = Instant::now();
    let err = process.wait_running(Some(limit)).await.unwrap_err();
    let elapsed = started.elapsed();
    assert!(matches!(err, ProcessError::HandshakeTimeout { timeout, .. } if timeout == limit));
    assert!(elapsed < limit * 2, "timeout took {:?}", elapsed);

    let started = Instant::now();
    assert_eq!(process.wait_running(Some(Duration::ZERO)).await.unwrap(), None);
    assert!(started.elapsed() < limit, "poll took {:?}", started.elapsed());
    assert_eq!(process.state(), ProcessState::Starting);

    process.kill(KillOptions::hard()).await.unwrap();
    let outcome = patient.await.unwrap();
    assert!(matches!(outcome, Err(ProcessError::ProcessCrashed { .. })));
}

#[tokio::test]
#[serial]
async fn test_mapped_names_replace_declared_ones() {
    let components = Components::new();
    let supervisor = Supervisor::new(quick_config());
    let options = SpawnOptions::new().with_name_mapping("logger", "robot_logger");

    let accepted = supervisor
        .spawn(
            components.descriptor(
                "deployed",
                &format!(
                    "{}\nexec sleep 30",
                    report(r#"{"robot_logger":"IOR:l","controller":"IOR:c"}"#)
                ),
                &["logger", "controller"],
            ),
            options.clone(),
        )
        .await
        .unwrap();
    let handles = accepted
        .wait_running(Some(Duration::from_secs(5)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        handles.keys().collect::<Vec<_>>(),
        vec!["controller", "robot_logger"]
    );

    let rejected = supervisor
        .spawn(
            components.descriptor(
                "raw",
                &format!("{}\nexec sleep 30", report(r#"{"logger":"IOR:l"}"#)),
                &["logger", "controller"],
            ),
            options,
        )
        .await
        .unwrap();
    let err = rejected
        .wait_running(Some(Duration::from_secs(5)))
        .await
        .unwrap_err();
    match &err {
        ProcessError::InvalidHandshakeMessage { source, .. } => {
            assert!(matches!(source, HandshakeError::UnexpectedTask { name, .. } if name == "logger"));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(rejected.handles().is_none());
    assert_eq!(rejected.state(), ProcessState::RuntimeError);

    supervisor.shutdown().await;
}

#[tokio::test]
#[serial]
async fn test_malformed_message_from_live_process() {
    let components = Components::new();
    let supervisor = Supervisor::new(quick_config());
    let descriptor = components.descriptor(
        "garbled",
        &format!("{}\nexec sleep 30", report(r#"{"a":"#)),
        &["a"],
    );

    let process = supervisor
        .spawn(descriptor, SpawnOptions::new())
        .await
        .unwrap();
    let err = process
        .wait_running(Some(Duration::from_secs(5)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProcessError::InvalidHandshakeMessage { source: HandshakeError::Malformed(_), .. }
    ));
    assert_eq!(process.state(), ProcessState::RuntimeError);
    assert!(process.is_alive());

    process.kill(KillOptions::hard()).await.unwrap();
    assert_eq!(process.state(), ProcessState::Terminated);
}

#[tokio::test]
#[serial]
async fn test_malformed_message_then_exit_is_a_crash() {
    let components = Components::new();
    let supervisor = Supervisor::new(quick_config());
    let descriptor = components.descriptor(
        "garbled",
        &format!("{}\nexit 3", report(r#"{"a":"#)),
        &["a"],
    );

    let process = supervisor
        .spawn(descriptor, SpawnOptions::new())
        .await
        .unwrap();
    let err = process
        .wait_running(Some(Duration::from_secs(5)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProcessError::ProcessCrashed { status: Some(status), .. } if status.exit_code == Some(3)
    ));
    assert_eq!(process.state(), ProcessState::Terminated);
    assert_eq!(supervisor.context().tracked(), 0);
}

#[tokio::test]
#[serial]
async fn test_spawn_failure() {
    let components = Components::new();
    let supervisor = Supervisor::new(quick_config());
    let model = taskhost::DeploymentModel::new(
        "missing",
        components.dir.path().join("does-not-exist"),
    );

    let err = supervisor
        .spawn(taskhost::ProcessDescriptor::new(model), SpawnOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ProcessError::SpawnFailed { ref name, .. } if name == "missing"));
    assert_eq!(supervisor.context().tracked(), 0);
}

#[tokio::test]
#[serial]
async fn test_output_is_redirected_to_rendered_path() {
    let components = Components::new();
    let supervisor = Supervisor::new(quick_config());
    let descriptor = components.descriptor(
        "talker",
        &format!("echo hello from talker\n{}\nexec sleep 30", report(r#"{"a":"IOR:a"}"#)),
        &["a"],
    );
    let template = components.dir.path().join("%m-%p.log");

    let process = supervisor
        .spawn(
            descriptor,
            SpawnOptions::new().with_output(template.to_string_lossy()),
        )
        .await
        .unwrap();
    let pid = process.pid().unwrap();
    process
        .wait_running(Some(Duration::from_secs(5)))
        .await
        .unwrap();

    let expected = components.dir.path().join(format!("talker-{}.log", pid));
    assert_eq!(process.output_path(), Some(expected.as_path()));
    let content = std::fs::read_to_string(&expected).unwrap();
    assert!(content.contains("hello from talker"));

    process.kill(KillOptions::hard()).await.unwrap();
}

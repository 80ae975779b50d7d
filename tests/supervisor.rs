mod common;

use nix::sys::signal::Signal;
use std::time::Duration;
use tokio::sync::mpsc;

use wrap::error::SupervisorError;
use wrap::kernel::channel::object_channel;
use wrap::kernel::supervisor::{child_command, supervise};
use wrap::kernel::telemetry::MetricsSampler;

fn no_signals() -> mpsc::Receiver<Signal> {
    let (_tx, rx) = mpsc::channel(1);
    rx
}

#[tokio::test]
async fn test_exit_status_is_reported_once() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = common::context(dir.path());
    let (objects, mut queue) = object_channel(4);

    let command = child_command(&ctx, "sh", ["-c", "exit 3"]);
    let event = supervise(command, &objects, no_signals(), MetricsSampler::new())
        .await
        .unwrap();
    objects.close();

    assert_eq!(event.exit_status, 3);
    assert_eq!(event.signal, None);

    let queued = queue.recv().await.expect("exit event enqueued");
    let wire: serde_json::Value = serde_json::from_slice(&queued.encode().unwrap()).unwrap();
    assert_eq!(wire["exit_status"], 3);
    assert!(wire.get("signal").is_none());
    assert!(queue.recv().await.is_none(), "Exactly one event per run");
}

#[tokio::test]
async fn test_relayed_signal_kills_child() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = common::context(dir.path());
    let (objects, _queue) = object_channel(4);
    let (signal_tx, signals) = mpsc::channel(4);

    // Queued before the child exists; relayed as soon as it is running
    signal_tx.send(Signal::SIGINT).await.unwrap();

    let command = child_command(&ctx, "sleep", ["30"]);
    let event = tokio::time::timeout(
        Duration::from_secs(10),
        supervise(command, &objects, signals, MetricsSampler::new()),
    )
    .await
    .expect("child should die from the relayed signal")
    .unwrap();

    assert_eq!(event.signal.as_deref(), Some("interrupt"));
    assert_eq!(event.exit_status, -1);
}

#[tokio::test]
async fn test_supervisor_waits_for_child_to_handle_signal() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = common::context(dir.path());
    let ready = dir.path().join("ready");
    let (objects, _queue) = object_channel(4);
    let (signal_tx, signals) = mpsc::channel(4);

    let script = format!(
        "trap 'sleep 0.2; exit 7' TERM; touch '{}'; while :; do sleep 0.05; done",
        ready.display()
    );
    let command = child_command(&ctx, "sh", ["-c", script.as_str()]);
    let run = tokio::spawn({
        let objects = objects.clone();
        async move { supervise(command, &objects, signals, MetricsSampler::new()).await }
    });

    let marker = ready.clone();
    assert!(
        common::wait_until(Duration::from_secs(5), || {
            let marker = marker.clone();
            async move { marker.exists() }
        })
        .await,
        "child never installed its trap"
    );

    signal_tx.send(Signal::SIGTERM).await.unwrap();
    let event = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("child should exit after handling the signal")
        .unwrap()
        .unwrap();

    assert_eq!(event.exit_status, 7, "Child's own exit code, not the signal");
    assert_eq!(event.signal, None);
}

#[tokio::test]
async fn test_child_learns_socket_paths_from_environment() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = common::context(dir.path());
    let (objects, _queue) = object_channel(4);

    let script = format!(
        "[ \"$AUKLET_DATA_SOCKET\" = '{}' ] && [ \"$AUKLET_LOG_SOCKET\" = '{}' ]",
        ctx.data_socket().display(),
        ctx.log_socket().display()
    );
    let command = child_command(&ctx, "sh", ["-c", script.as_str()]);
    let event = supervise(command, &objects, no_signals(), MetricsSampler::new())
        .await
        .unwrap();

    assert_eq!(event.exit_status, 0);
}

#[tokio::test]
async fn test_spawn_failure_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = common::context(dir.path());
    let (objects, mut queue) = object_channel(4);

    let command = child_command(&ctx, dir.path().join("missing-binary"), Vec::<String>::new());
    let result = supervise(command, &objects, no_signals(), MetricsSampler::new()).await;
    objects.close();

    assert!(matches!(result, Err(SupervisorError::Spawn { .. })));
    assert!(queue.recv().await.is_none(), "No event without a child");
}

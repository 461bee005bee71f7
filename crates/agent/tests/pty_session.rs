// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PTY-backed session integration: output integrity, scrollback replay,
//! snapshots, and write round-trips.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use parallax::adapter::claude::ClaudeAdapter;
use parallax::session::{SessionState, SpawnConfig, StopOptions};
use parallax::test_support::ScriptAdapter;
use parallax::{SessionEvent, Supervisor, SupervisorConfig};

fn config() -> SupervisorConfig {
    SupervisorConfig::default()
        .with_status_debounce(Duration::from_millis(10))
        .with_stop_timeout(Duration::from_millis(300))
}

fn supervisor(script: &str) -> Supervisor {
    let supervisor = Supervisor::new(config());
    let claude = Arc::new(ClaudeAdapter::new().unwrap());
    supervisor.register_adapter(Arc::new(ScriptAdapter::new(claude, script)));
    supervisor
}

async fn wait_exit(handle: &Arc<parallax::SessionHandle>) {
    let _ = tokio::time::timeout(Duration::from_secs(10), async {
        while !handle.state().is_terminal() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
}

#[tokio::test]
async fn output_events_are_gap_free_and_ordered() {
    // 200 numbered lines; the concatenated output events must contain
    // every line in order.
    let supervisor = supervisor("i=0; while [ $i -lt 200 ]; do echo line-$i; i=$((i+1)); done");
    let mut events = supervisor.subscribe();
    let handle =
        supervisor.spawn(SpawnConfig::new("bulk", "claude").workdir("/tmp")).await.unwrap();
    wait_exit(&handle).await;

    let mut collected = Vec::new();
    while let Some(event) = events.try_next() {
        if let SessionEvent::SessionOutput { data, .. } = event {
            collected.extend_from_slice(&data);
        }
    }
    let text = String::from_utf8_lossy(&collected);
    let mut last = -1i64;
    for line in text.lines().filter(|l| l.starts_with("line-")) {
        let n: i64 = line.trim_start_matches("line-").trim().parse().unwrap();
        assert_eq!(n, last + 1, "gap or reorder at {n}");
        last = n;
    }
    assert_eq!(last, 199);
}

#[tokio::test]
async fn status_events_follow_their_causing_output() {
    let supervisor = supervisor("printf 'How can I help you today?'; sleep 2");
    let mut events = supervisor.subscribe();
    let handle =
        supervisor.spawn(SpawnConfig::new("order", "claude").workdir("/tmp")).await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let mut saw_output_first = false;
    let mut ready_before_output = false;
    while tokio::time::Instant::now() < deadline {
        match tokio::time::timeout(Duration::from_millis(200), events.next()).await {
            Ok(Some(SessionEvent::SessionOutput { .. })) => saw_output_first = true,
            Ok(Some(SessionEvent::SessionStatus { kind: SessionState::Ready, .. })) => {
                if !saw_output_first {
                    ready_before_output = true;
                }
                break;
            }
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => {}
        }
    }
    assert!(saw_output_first, "ready must be preceded by its causing output chunk");
    assert!(!ready_before_output);
    let _ = handle.stop(StopOptions::force()).await;
}

#[tokio::test]
async fn scrollback_replay_from_offset() {
    let supervisor = supervisor("printf 'abcdefghij'; sleep 2");
    let handle =
        supervisor.spawn(SpawnConfig::new("replay", "claude").workdir("/tmp")).await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while handle.snapshot().total_written < 10 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(handle.read_from(0).as_deref(), Some(&b"abcdefghij"[..]));
    assert_eq!(handle.read_from(4).as_deref(), Some(&b"efghij"[..]));
    assert!(handle.read_from(999).is_none());
    let _ = handle.stop(StopOptions::force()).await;
}

#[tokio::test]
async fn snapshot_carries_stripped_tail_and_state() {
    let supervisor = supervisor("printf '\\033[1;32mHow can I help you today?\\033[0m'; sleep 2");
    let handle =
        supervisor.spawn(SpawnConfig::new("snap", "claude").workdir("/tmp")).await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while handle.state() != SessionState::Ready && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.state, SessionState::Ready);
    assert!(snapshot.tail.contains("How can I help you today?"));
    assert!(!snapshot.tail.contains('\u{1b}'), "tail is ANSI-stripped");
    assert_eq!(snapshot.adapter, "claude");
    let _ = handle.stop(StopOptions::force()).await;
}

#[tokio::test]
async fn write_round_trips_through_the_child() {
    let supervisor = supervisor("read line; printf 'GOT:%s' \"$line\"");
    let handle =
        supervisor.spawn(SpawnConfig::new("echoer", "claude").workdir("/tmp")).await.unwrap();

    handle.write(Bytes::from_static(b"hello-pty\r")).await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !handle.buffered_output().contains("GOT:hello-pty")
        && tokio::time::Instant::now() < deadline
    {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(handle.buffered_output().contains("GOT:hello-pty"));

    // A submitted line marks the session as working until new detection.
    assert_eq!(handle.state(), SessionState::Working);
    wait_exit(&handle).await;
}

#[tokio::test]
async fn resize_is_accepted_while_live_and_rejected_after_stop() {
    let supervisor = supervisor("sleep 5");
    let handle =
        supervisor.spawn(SpawnConfig::new("rsz", "claude").workdir("/tmp")).await.unwrap();
    handle.resize(120, 40).unwrap();

    handle.stop(StopOptions::force()).await.unwrap();
    assert!(handle.resize(80, 24).is_err());
}

#[tokio::test]
async fn crash_attaches_diagnostic_tail() {
    let supervisor = supervisor("printf 'something exploded'; exit 3");
    let mut events = supervisor.subscribe();
    let handle =
        supervisor.spawn(SpawnConfig::new("crash", "claude").workdir("/tmp")).await.unwrap();
    wait_exit(&handle).await;

    assert_eq!(handle.state(), SessionState::Error);
    let mut error_message = None;
    while let Some(event) = events.try_next() {
        if let SessionEvent::SessionStatus { kind: SessionState::Error, error, .. } = event {
            error_message = error;
        }
    }
    let message = error_message.expect("error status carries a message");
    assert!(message.contains("child_crashed"), "got: {message}");
    assert!(message.contains("something exploded"), "tail attached: {message}");
}

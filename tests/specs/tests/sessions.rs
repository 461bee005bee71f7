// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end session scenarios: ready detection, safe auto-response,
//! and unsafe-prompt escalation, each against a scripted child on a
//! real PTY.

use std::sync::Arc;
use std::time::Duration;

use parallax::adapter::{aider::AiderAdapter, claude::ClaudeAdapter, gemini::GeminiAdapter};
use parallax::session::{SessionState, SpawnConfig, StopOptions};
use parallax::test_support::ScriptAdapter;
use parallax::{SessionEvent, Supervisor, SupervisorConfig};

use parallax_specs::{wait_for_output, wait_for_state};

const TIMEOUT: Duration = Duration::from_secs(10);

fn config() -> SupervisorConfig {
    SupervisorConfig::default()
        .with_status_debounce(Duration::from_millis(10))
        .with_stop_timeout(Duration::from_millis(300))
}

// ── Scenario 1: spawn + ready ───────────────────────────────────────────

#[tokio::test]
async fn spawn_and_ready_emitted_exactly_once() {
    let supervisor = Supervisor::new(config());
    let claude = Arc::new(ClaudeAdapter::new().unwrap());
    // Print the greeting twice: the second re-draw must not re-emit ready.
    supervisor.register_adapter(Arc::new(ScriptAdapter::new(
        claude,
        "printf '\\nHow can I help you today?\\n\\342\\235\\257 '; \
         sleep 0.5; \
         printf '\\nHow can I help you today?\\n\\342\\235\\257 '; \
         sleep 5",
    )));

    let mut events = supervisor.subscribe();
    let handle = supervisor
        .spawn(SpawnConfig::new("claude-main", "claude").workdir("/tmp"))
        .await
        .unwrap();

    assert!(wait_for_state(&handle, SessionState::Ready, TIMEOUT).await);
    // Let the second printf land.
    tokio::time::sleep(Duration::from_millis(900)).await;

    let mut ready_count = 0;
    while let Some(event) = events.try_next() {
        if let SessionEvent::SessionStatus { kind: SessionState::Ready, .. } = event {
            ready_count += 1;
        }
    }
    assert_eq!(ready_count, 1, "ready fires once per edge crossing");

    handle.stop(StopOptions::force()).await.unwrap();
}

// ── Scenario 2: blocking prompt auto-responded ──────────────────────────

#[tokio::test]
async fn gemini_apply_change_is_auto_answered_once() {
    // A small tail window so the answered prompt scrolls out of detector
    // view before the second occurrence appears.
    let supervisor = Supervisor::new(config().with_tail_window(64));
    let gemini = Arc::new(GeminiAdapter::new().unwrap());
    // The script prints the prompt, waits for the auto-response (enter
    // produces a newline on the PTY), acknowledges, pads the tail, then
    // prompts again.
    supervisor.register_adapter(Arc::new(ScriptAdapter::new(
        gemini,
        "printf 'Apply this change?'; \
         read _answer; \
         printf 'FIRST-ANSWERED'; \
         printf '%064d\\n' 0; \
         sleep 0.5; \
         printf 'Apply this change?'; \
         sleep 3; \
         printf ' NO-SECOND-ANSWER'",
    )));

    let mut events = supervisor.subscribe();
    let handle = supervisor
        .spawn(SpawnConfig::new("gemini-main", "gemini").workdir("/tmp"))
        .await
        .unwrap();

    // The rule answers the first prompt without any caller involvement.
    assert!(wait_for_output(&handle, TIMEOUT, |out| out.contains("FIRST-ANSWERED")).await);

    // The once rule does not answer the second appearance.
    assert!(wait_for_output(&handle, TIMEOUT, |out| out.contains("NO-SECOND-ANSWER")).await);

    // The first, auto-handled prompt surfaced no blocking_prompt event.
    let mut first_prompt_suppressed = true;
    let mut saw_escalation_after_exhaustion = false;
    let mut seen_first_answer = false;
    while let Some(event) = events.try_next() {
        if let SessionEvent::SessionOutput { ref data, .. } = event {
            if String::from_utf8_lossy(data).contains("FIRST-ANSWERED") {
                seen_first_answer = true;
            }
        }
        if let SessionEvent::SessionStatus { kind: SessionState::BlockingPrompt, .. } = event {
            if seen_first_answer {
                saw_escalation_after_exhaustion = true;
            } else {
                first_prompt_suppressed = false;
            }
        }
    }
    assert!(first_prompt_suppressed, "auto-answered prompt must not surface");
    assert!(saw_escalation_after_exhaustion, "exhausted once rule escalates");

    handle.stop(StopOptions::force()).await.unwrap();
}

// ── Scenario 3: unsafe prompt escalated ─────────────────────────────────

#[tokio::test]
async fn aider_destructive_confirm_escalates_without_write() {
    let supervisor = Supervisor::new(config());
    let aider = Arc::new(AiderAdapter::new().unwrap());
    supervisor.register_adapter(Arc::new(ScriptAdapter::new(
        aider,
        // If anything is written to us, acknowledge it; the test
        // asserts the acknowledgement never appears.
        "printf 'Delete file.txt? [y/n] '; \
         read _answer; \
         printf 'WROTE-%s' \"$_answer\"",
    )));

    let mut events = supervisor.subscribe();
    let handle = supervisor
        .spawn(SpawnConfig::new("aider-main", "aider").workdir("/tmp"))
        .await
        .unwrap();

    assert!(wait_for_state(&handle, SessionState::BlockingPrompt, TIMEOUT).await);
    tokio::time::sleep(Duration::from_millis(300)).await;

    let mut prompt_reason = None;
    while let Some(event) = events.try_next() {
        if let SessionEvent::SessionStatus {
            kind: SessionState::BlockingPrompt, reason, ..
        } = event
        {
            prompt_reason = reason;
        }
    }
    let reason = prompt_reason.expect("blocking_prompt carries instructions");
    assert!(reason.contains("y/n"), "got: {reason}");

    assert!(
        !handle.buffered_output().contains("WROTE-"),
        "no automatic write may reach the child"
    );

    handle.stop(StopOptions::force()).await.unwrap();
}

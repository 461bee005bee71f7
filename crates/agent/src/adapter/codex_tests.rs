// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::adapter::{Adapter, ApprovalPreset, LaunchConfig};

use super::*;

fn adapter() -> CodexAdapter {
    CodexAdapter::new().unwrap()
}

#[test]
fn ready_on_input_banner() {
    let a = adapter();
    assert!(a.detect_ready("▌ Ask Codex to do anything"));
    assert!(a.detect_ready("⏎ send   ⌃J newline"));
    assert!(!a.detect_ready("thinking"));
}

#[test]
fn task_complete_on_token_summary() {
    let a = adapter();
    assert!(a.detect_task_complete("tokens used: 4,821"));
    assert!(!a.detect_task_complete("Esc to interrupt"));
}

#[test]
fn approval_escalates() {
    let prompt = adapter().detect_blocking_prompt("$ cargo test\nAllow command?").unwrap();
    assert!(!prompt.can_auto_respond);
    assert_eq!(prompt.suggested_rule, Some("approval-request"));
}

#[test]
fn login_variants() {
    let a = adapter();
    assert!(a.detect_login("Sign in with ChatGPT").is_some());
    let login = a.detect_login("https://auth.openai.com/activate?code=AAA").unwrap();
    assert!(login.url.is_some());
}

#[test]
fn launch_sandbox_presets() {
    let a = adapter();
    let mut cfg = LaunchConfig::default();
    cfg.options.approval_preset = Some(ApprovalPreset::Readonly);
    let spec = a.launch(&cfg).unwrap();
    assert_eq!(spec.args, vec!["--sandbox", "read-only"]);

    cfg.options.approval_preset = Some(ApprovalPreset::Autonomous);
    let spec = a.launch(&cfg).unwrap();
    assert_eq!(spec.args, vec!["--dangerously-bypass-approvals-and-sandbox"]);
}

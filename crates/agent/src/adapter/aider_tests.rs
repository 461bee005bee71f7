// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashSet;

use crate::adapter::rules::evaluate;
use crate::adapter::{Adapter, LaunchConfig, ModelProvider, RuleDecision};

use super::*;

fn adapter() -> AiderAdapter {
    AiderAdapter::new().unwrap()
}

#[test]
fn ready_on_bare_prompt() {
    let a = adapter();
    assert!(a.detect_ready("aider v0.84.0\nMain model: sonnet\n> "));
    assert!(!a.detect_ready("Scanning repo map..."));
}

#[test]
fn destructive_confirm_never_auto_fires() {
    let a = adapter();
    let prompt = a.detect_blocking_prompt("Delete file.txt? [y/n]").unwrap();
    assert!(!prompt.can_auto_respond);
    assert_eq!(prompt.suggested_rule, Some("destructive-confirm"));

    // The catalog escalates instead of writing.
    assert!(matches!(
        evaluate(a.rules(), "Delete file.txt? [y/n]", &HashSet::new()),
        RuleDecision::Escalate { rule: "destructive-confirm", .. }
    ));
}

#[test]
fn add_file_is_safe_to_answer() {
    let a = adapter();
    match evaluate(a.rules(), "Add src/lib.rs to the chat? (Y)es/(N)o", &HashSet::new()) {
        RuleDecision::Respond { rule, bytes, .. } => {
            assert_eq!(rule, "add-file");
            assert_eq!(bytes, b"y\r");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn generic_yn_blocks_without_suggestion() {
    let a = adapter();
    let prompt = a.detect_blocking_prompt("Create new file out.txt? [y/n]").unwrap();
    assert!(prompt.suggested_rule.is_none());
    assert!(!prompt.can_auto_respond);
}

#[test]
fn task_complete_on_applied_edit() {
    let a = adapter();
    assert!(a.detect_task_complete("Applied edit to src/main.rs"));
    assert!(a.detect_task_complete("Commit a1b2c3d feat: add parser"));
}

#[test]
fn missing_key_is_login() {
    assert!(adapter().detect_login("API key not found for model sonnet").is_some());
}

#[test]
fn launch_provider_selection() {
    let a = adapter();
    let mut cfg = LaunchConfig::default();
    cfg.options.provider = Some(ModelProvider::Openai);
    cfg.options.openai_key = Some("sk-o".to_owned());
    let spec = a.launch(&cfg).unwrap();
    assert_eq!(spec.program, "aider");
    assert!(spec.args.contains(&"--no-auto-commits".to_owned()));
    assert!(spec.env.iter().any(|(k, _)| k == "OPENAI_API_KEY"));
}

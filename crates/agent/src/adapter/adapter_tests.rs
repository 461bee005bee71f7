// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn registry_defaults_cover_shipped_adapters() {
    let registry = AdapterRegistry::with_defaults().unwrap();
    assert_eq!(registry.names(), vec!["aider", "claude", "codex", "gemini"]);
    assert!(registry.get("claude").is_some());
    assert!(registry.get("unknown").is_none());
}

#[test]
fn register_replaces_by_tag() {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(claude::ClaudeAdapter::new().unwrap()));
    registry.register(Arc::new(claude::ClaudeAdapter::new().unwrap()));
    assert_eq!(registry.names(), vec!["claude"]);
}

#[test]
fn adapter_config_splits_known_and_extra_keys() {
    let mut cfg = LaunchConfig::default();
    cfg.parse_adapter_config(serde_json::json!({
        "interactive": false,
        "anthropicKey": "sk-1",
        "approvalPreset": "autonomous",
        "customFlag": true,
        "nested": {"a": 1},
    }))
    .unwrap();

    assert_eq!(cfg.options.interactive, Some(false));
    assert_eq!(cfg.options.anthropic_key.as_deref(), Some("sk-1"));
    assert_eq!(cfg.options.approval_preset, Some(ApprovalPreset::Autonomous));
    assert_eq!(cfg.extra.get("customFlag"), Some(&serde_json::Value::Bool(true)));
    assert!(cfg.extra.contains_key("nested"));
}

#[test]
fn adapter_config_rejects_non_object() {
    let mut cfg = LaunchConfig::default();
    assert!(cfg.parse_adapter_config(serde_json::json!("nope")).is_err());
}

#[test]
fn launch_spec_builder_and_command() {
    let spec = LaunchSpec::new("claude").arg("--print").env("K", "V");
    assert_eq!(spec.command(), vec!["claude", "--print"]);
    assert_eq!(spec.env, vec![("K".to_owned(), "V".to_owned())]);
}

#[test]
fn question_heuristic() {
    assert!(looks_like_question("Should I continue?"));
    assert!(looks_like_question("Overwrite? [y/n]"));
    assert!(!looks_like_question("Done."));
}

#[test]
fn install_specs_are_pure_data() {
    let registry = AdapterRegistry::with_defaults().unwrap();
    for name in registry.names() {
        let adapter = registry.get(name).unwrap();
        let install = adapter.install();
        assert!(!install.binary.is_empty());
        assert!(!install.install_hint.is_empty());
    }
}

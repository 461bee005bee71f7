// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::SystemTime;

use indexmap::IndexSet;

use crate::model::{
    BranchInfo, CompletionHook, Phase, Strategy, Workspace, WorkspaceId, WorkspaceStatus,
};

use super::*;

fn workspace(status: WorkspaceStatus, path: &std::path::Path) -> Workspace {
    Workspace {
        id: WorkspaceId::from("ws-hook"),
        path: path.to_path_buf(),
        repo: "https://github.com/o/r.git".to_owned(),
        branch: BranchInfo {
            name: "parallax/e/builder".to_owned(),
            base: "main".to_owned(),
            execution_id: "e".to_owned(),
            created_at: SystemTime::now(),
        },
        credential: None,
        provisioned_at: SystemTime::now(),
        status,
        strategy: Strategy::Clone,
        parent: None,
        children: IndexSet::new(),
        phase: Phase::Ready,
        on_complete: None,
    }
}

#[tokio::test]
async fn command_hook_receives_workspace_env() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("hook.out");
    let hook = CompletionHook {
        command: Some(format!(
            "printf '%s %s %s' \"$WORKSPACE_ID\" \"$STATUS\" \"$BRANCH\" > {}",
            out.display()
        )),
        webhook: None,
        run_on_error: true,
    };
    let ws = workspace(WorkspaceStatus::Ready, dir.path());

    run(&hook, &ws, &reqwest::Client::new()).await;

    let contents = std::fs::read_to_string(&out).unwrap();
    assert_eq!(contents, "ws-hook ready parallax/e/builder");
}

#[tokio::test]
async fn hook_suppressed_on_error_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("hook.out");
    let hook = CompletionHook {
        command: Some(format!("touch {}", out.display())),
        webhook: None,
        run_on_error: false,
    };
    let ws = workspace(WorkspaceStatus::Error, dir.path());

    run(&hook, &ws, &reqwest::Client::new()).await;
    assert!(!out.exists());
}

#[tokio::test]
async fn failing_command_is_swallowed() {
    let dir = tempfile::tempdir().unwrap();
    let hook = CompletionHook {
        command: Some("exit 3".to_owned()),
        webhook: None,
        run_on_error: true,
    };
    let ws = workspace(WorkspaceStatus::Ready, dir.path());
    // Must not panic or error.
    run(&hook, &ws, &reqwest::Client::new()).await;
}

#[tokio::test]
async fn unreachable_webhook_is_swallowed() {
    let dir = tempfile::tempdir().unwrap();
    let hook = CompletionHook {
        command: None,
        webhook: Some("http://127.0.0.1:1/hooks".to_owned()),
        run_on_error: true,
    };
    let ws = workspace(WorkspaceStatus::Ready, dir.path());
    run(&hook, &ws, &reqwest::Client::new()).await;
}

#[test]
fn payload_shape_is_camel_case() {
    let dir = tempfile::tempdir().unwrap();
    let ws = workspace(WorkspaceStatus::Ready, dir.path());
    let json = serde_json::to_value(HookPayload::from_workspace(&ws)).unwrap();
    assert!(json.get("workspaceId").is_some());
    assert!(json.get("workspacePath").is_some());
    assert_eq!(json["status"], "ready");
}

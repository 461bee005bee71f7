// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Completion hooks: notify after `ready` or `error`.
//!
//! Hook failures are logged and swallowed; a broken notifier must never
//! turn a healthy workspace into an error.

use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::model::{CompletionHook, Workspace};

/// Payload POSTed to webhook hooks.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookPayload {
    pub workspace_id: String,
    pub repo: String,
    pub branch: String,
    pub status: String,
    pub workspace_path: String,
}

impl HookPayload {
    pub fn from_workspace(workspace: &Workspace) -> Self {
        Self {
            workspace_id: workspace.id.to_string(),
            repo: workspace.repo.clone(),
            branch: workspace.branch.name.clone(),
            status: workspace.status.to_string(),
            workspace_path: workspace.path.display().to_string(),
        }
    }
}

/// Run a workspace's completion hook, if configured.
pub async fn run(hook: &CompletionHook, workspace: &Workspace, http: &reqwest::Client) {
    let errored = workspace.status == crate::model::WorkspaceStatus::Error;
    if errored && !hook.run_on_error {
        debug!(workspace = %workspace.id, "completion hook suppressed on error");
        return;
    }

    let payload = HookPayload::from_workspace(workspace);

    if let Some(ref command) = hook.command {
        run_command(command, &payload).await;
    }

    if let Some(ref webhook) = hook.webhook {
        post_webhook(webhook, &payload, http).await;
    }
}

/// Run the shell command with a clean environment plus the workspace
/// variables.
async fn run_command(command: &str, payload: &HookPayload) {
    let path = std::env::var("PATH").unwrap_or_else(|_| "/usr/bin:/bin".to_owned());
    let result = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .env_clear()
        .env("PATH", path)
        .env("WORKSPACE_ID", &payload.workspace_id)
        .env("REPO", &payload.repo)
        .env("BRANCH", &payload.branch)
        .env("STATUS", &payload.status)
        .env("WORKSPACE_PATH", &payload.workspace_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await;

    match result {
        Ok(output) if output.status.success() => {
            debug!(workspace = %payload.workspace_id, "completion command succeeded");
        }
        Ok(output) => {
            warn!(
                workspace = %payload.workspace_id,
                code = output.status.code().unwrap_or(-1),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "completion command failed"
            );
        }
        Err(e) => {
            warn!(workspace = %payload.workspace_id, err = %e, "completion command failed to start");
        }
    }
}

/// POST the JSON payload to the webhook URL.
async fn post_webhook(url: &str, payload: &HookPayload, http: &reqwest::Client) {
    let result = http
        .post(url)
        .json(payload)
        .timeout(Duration::from_secs(10))
        .send()
        .await;
    match result {
        Ok(resp) if resp.status().is_success() => {
            debug!(workspace = %payload.workspace_id, "webhook delivered");
        }
        Ok(resp) => {
            warn!(workspace = %payload.workspace_id, status = %resp.status(), "webhook rejected");
        }
        Err(e) => {
            warn!(workspace = %payload.workspace_id, err = %e, "webhook delivery failed");
        }
    }
}

#[cfg(test)]
#[path = "hook_tests.rs"]
mod tests;

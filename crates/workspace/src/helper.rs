// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-local Git credential helper.
//!
//! Token-backed workspaces get a `.git-workspace/` directory (0700)
//! holding a context file (0600) and a shell script (0700) that Git
//! invokes for credentials. Cleanup removes the directory unconditionally
//! before the workspace itself.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Directory name inside the workspace.
pub const HELPER_DIR: &str = ".git-workspace";
/// Context file consumed by the helper script.
pub const CONTEXT_FILE: &str = "credential-context.json";
/// The helper script Git is configured to call.
pub const SCRIPT_FILE: &str = "git-credential-helper";

/// On-disk context for the helper script. This file holds the live token
/// and is therefore owner-read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialContext {
    pub workspace_id: String,
    pub execution_id: String,
    pub repo: String,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<SystemTime>,
}

/// Paths of an installed helper.
#[derive(Debug, Clone)]
pub struct HelperFiles {
    pub dir: PathBuf,
    pub context_path: PathBuf,
    pub script_path: PathBuf,
}

/// Install the helper into a workspace. Returns the script path to hand
/// to `git config credential.helper`.
pub fn install(workspace_path: &Path, context: &CredentialContext) -> anyhow::Result<HelperFiles> {
    let dir = workspace_path.join(HELPER_DIR);
    std::fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    set_mode(&dir, 0o700)?;

    let context_path = dir.join(CONTEXT_FILE);
    let json = serde_json::to_string_pretty(context).context("serialize credential context")?;
    std::fs::write(&context_path, json)
        .with_context(|| format!("write {}", context_path.display()))?;
    set_mode(&context_path, 0o600)?;

    let script_path = dir.join(SCRIPT_FILE);
    std::fs::write(&script_path, helper_script())
        .with_context(|| format!("write {}", script_path.display()))?;
    set_mode(&script_path, 0o700)?;

    Ok(HelperFiles { dir, context_path, script_path })
}

/// Remove the helper directory. Best effort, tolerant of absence.
pub fn remove(workspace_path: &Path) {
    let dir = workspace_path.join(HELPER_DIR);
    if dir.exists() {
        if let Err(e) = std::fs::remove_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), err = %e, "failed to remove credential helper");
        }
    }
}

/// The helper script body. Reads the sibling context file and emits the
/// `x-access-token` credential pair on `get`.
fn helper_script() -> &'static str {
    r#"#!/bin/sh
# Git credential helper for a parallax-managed workspace.
[ "$1" = "get" ] || exit 0
ctx="$(dirname "$0")/credential-context.json"
[ -f "$ctx" ] || exit 1
token=$(sed -n 's/.*"token"[[:space:]]*:[[:space:]]*"\([^"]*\)".*/\1/p' "$ctx")
[ -n "$token" ] || exit 1
printf 'username=x-access-token\npassword=%s\n\n' "$token"
"#
}

fn set_mode(path: &Path, mode: u32) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut permissions = std::fs::metadata(path)
        .with_context(|| format!("stat {}", path.display()))?
        .permissions();
    permissions.set_mode(mode);
    std::fs::set_permissions(path, permissions)
        .with_context(|| format!("chmod {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "helper_tests.rs"]
mod tests;

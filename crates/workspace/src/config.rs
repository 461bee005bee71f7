// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use crate::branch::DEFAULT_PREFIX;

/// Workspace service tunables.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    /// Base directory new workspaces are created under.
    pub base_dir: PathBuf,
    /// Branch name prefix.
    pub branch_prefix: String,
    /// Neutral committer identity for all workspaces.
    pub git_user_name: String,
    pub git_user_email: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            base_dir: std::env::temp_dir().join("parallax-workspaces"),
            branch_prefix: DEFAULT_PREFIX.to_owned(),
            git_user_name: "Parallax Agent".to_owned(),
            git_user_email: "agent@parallax.invalid".to_owned(),
        }
    }
}

impl WorkspaceConfig {
    /// Defaults with `PARALLAX_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("PARALLAX_WORKSPACE_DIR") {
            config.base_dir = PathBuf::from(dir);
        }
        if let Ok(prefix) = std::env::var("PARALLAX_BRANCH_PREFIX") {
            if !prefix.is_empty() {
                config.branch_prefix = prefix;
            }
        }
        config
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    pub fn with_branch_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.branch_prefix = prefix.into();
        self
    }
}

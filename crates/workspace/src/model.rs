// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace records and the request/response types of the service.

use std::path::PathBuf;
use std::time::SystemTime;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::credential::{GrantId, UserCredential};

/// Opaque workspace identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkspaceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// How the working directory is materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// A full (shallow) clone with its own object database.
    Clone,
    /// A `git worktree` sharing a parent clone's object database.
    Worktree,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clone => "clone",
            Self::Worktree => "worktree",
        }
    }
}

/// Coarse workspace status. `CleanedUp` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceStatus {
    Provisioning,
    Ready,
    InUse,
    Finalizing,
    CleanedUp,
    Error,
}

impl WorkspaceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provisioning => "provisioning",
            Self::Ready => "ready",
            Self::InUse => "in_use",
            Self::Finalizing => "finalizing",
            Self::CleanedUp => "cleaned_up",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::CleanedUp)
    }
}

impl std::fmt::Display for WorkspaceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fine-grained progress through provisioning and finalization. Phases
/// of one workspace advance strictly monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initializing,
    Cloning,
    CreatingBranch,
    Configuring,
    Ready,
    Committing,
    Pushing,
    CreatingPr,
    CleaningUp,
    Done,
    Error,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Cloning => "cloning",
            Self::CreatingBranch => "creating_branch",
            Self::Configuring => "configuring",
            Self::Ready => "ready",
            Self::Committing => "committing",
            Self::Pushing => "pushing",
            Self::CreatingPr => "creating_pr",
            Self::CleaningUp => "cleaning_up",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Branch metadata attached to a workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchInfo {
    pub name: String,
    pub base: String,
    pub execution_id: String,
    pub created_at: SystemTime,
}

/// One provisioned working directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub path: PathBuf,
    pub repo: String,
    pub branch: BranchInfo,
    /// Grant backing this workspace's Git access, when authenticated.
    pub credential: Option<GrantId>,
    pub provisioned_at: SystemTime,
    pub status: WorkspaceStatus,
    pub strategy: Strategy,
    /// Set on worktrees: the owning clone.
    pub parent: Option<WorkspaceId>,
    /// Set on clones: attached worktrees, in registration order.
    pub children: IndexSet<WorkspaceId>,
    pub phase: Phase,
    pub on_complete: Option<CompletionHook>,
}

/// Where new branches come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchStrategy {
    #[default]
    FeatureBranch,
    Fork,
    Direct,
}

/// Execution context a workspace is provisioned for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionRef {
    pub id: String,
    pub pattern_name: Option<String>,
}

/// Task context a workspace is provisioned for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskRef {
    pub id: String,
    pub role: String,
    pub slug: Option<String>,
}

/// Completion hook configuration: a shell command, a webhook, or both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionHook {
    /// Shell command run with `WORKSPACE_ID`, `REPO`, `BRANCH`, `STATUS`,
    /// and `WORKSPACE_PATH` in its environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// URL POSTed a JSON payload describing the outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<String>,
    /// When false, the hook is suppressed on provisioning errors.
    #[serde(default = "default_true")]
    pub run_on_error: bool,
}

fn default_true() -> bool {
    true
}

/// Request to provision a workspace.
#[derive(Debug, Clone, Default)]
pub struct ProvisionRequest {
    pub repo: String,
    pub strategy: Option<Strategy>,
    /// Required for `Strategy::Worktree`.
    pub parent_workspace: Option<WorkspaceId>,
    pub branch_strategy: BranchStrategy,
    pub base_branch: String,
    pub execution: ExecutionRef,
    pub task: TaskRef,
    pub user: Option<String>,
    pub user_credentials: Option<UserCredential>,
    pub on_complete: Option<CompletionHook>,
}

impl ProvisionRequest {
    pub fn strategy(&self) -> Strategy {
        self.strategy.unwrap_or(Strategy::Clone)
    }
}

/// Pull-request details passed through to the provider adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrSpec {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Request to finalize a workspace.
#[derive(Debug, Clone, Default)]
pub struct FinalizeRequest {
    pub push: bool,
    pub create_pr: bool,
    pub pr: Option<PrSpec>,
    pub cleanup: bool,
}

/// Outcome of a finalize call.
#[derive(Debug, Clone, Default)]
pub struct FinalizeOutcome {
    pub pushed: bool,
    pub pr_url: Option<String>,
    pub cleaned_up: bool,
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;

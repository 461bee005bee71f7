// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle: one PTY-backed child, its scrollback, its state
//! machine, and its auto-response bookkeeping.

pub mod classify;
pub mod run;
pub mod stop;
pub mod transition;

pub use run::SessionHandle;
pub use stop::StopOptions;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::pty::ExitStatus;

/// Lifecycle state of a session.
///
/// The state progresses monotonically away from `Spawning` and never
/// returns to it. `Stopped` and `Error` are terminal. `LoginRequired` and
/// `BlockingPrompt` are attention states, cleared by the next successful
/// detection of `Ready` or `Working`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Spawning,
    Ready,
    Working,
    TaskComplete,
    LoginRequired,
    BlockingPrompt,
    Stopped,
    Error,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spawning => "spawning",
            Self::Ready => "ready",
            Self::Working => "working",
            Self::TaskComplete => "task_complete",
            Self::LoginRequired => "login_required",
            Self::BlockingPrompt => "blocking_prompt",
            Self::Stopped => "stopped",
            Self::Error => "error",
        }
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Error)
    }

    /// Attention states require a caller (or an auto-response) to proceed.
    pub fn is_attention(&self) -> bool {
        matches!(self, Self::LoginRequired | Self::BlockingPrompt)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why and how the child went away. Set exactly once, at the transition
/// into a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitInfo {
    pub status: ExitStatus,
    pub reason: Option<String>,
}

/// Caller-provided configuration for [`Supervisor::spawn`](crate::supervisor::Supervisor::spawn).
#[derive(Debug, Clone, Default)]
pub struct SpawnConfig {
    /// Human label for the session.
    pub name: String,
    /// Adapter tag to select from the registry.
    pub adapter: String,
    /// Working directory; defaults to the caller's cwd.
    pub workdir: Option<PathBuf>,
    /// Environment delta applied on top of the parent environment.
    pub env: Vec<(String, String)>,
    /// Opaque adapter options; well-known keys are parsed, the rest is
    /// passed through untouched.
    pub adapter_config: Option<serde_json::Value>,
}

impl SpawnConfig {
    pub fn new(name: impl Into<String>, adapter: impl Into<String>) -> Self {
        Self { name: name.into(), adapter: adapter.into(), ..Self::default() }
    }

    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn adapter_config(mut self, config: serde_json::Value) -> Self {
        self.adapter_config = Some(config);
        self
    }
}

/// Point-in-time view of a session.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub id: crate::event::SessionId,
    pub name: String,
    pub adapter: String,
    pub state: SessionState,
    /// ANSI-stripped tail window.
    pub tail: String,
    pub total_written: u64,
    pub exit: Option<ExitInfo>,
    pub created_at: std::time::SystemTime,
}

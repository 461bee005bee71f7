// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured error kinds for the session core.
///
/// These are wire-level codes attached to events and error contexts;
/// cause chains travel separately via `anyhow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Executable missing, permission denied, or invalid working directory.
    SpawnFailed,
    /// Read or write on the PTY failed after the session started.
    PtyIoError,
    /// Child exited non-zero outside of a requested stop.
    ChildCrashed,
    /// A detector panicked; the tick was logged and demoted.
    ClassifierPanic,
    /// A matching rule was unsafe or once-exhausted; surfaced as a
    /// blocking prompt instead of a write.
    AutoResponseRejected,
    /// A subscriber fell behind and buffered events were dropped for it.
    SubscriberLag,
    /// Write or resize issued against a stopped session.
    AlreadyStopped,
    /// No adapter registered under the requested type tag.
    UnknownAdapter,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SpawnFailed => "spawn_failed",
            Self::PtyIoError => "pty_io_error",
            Self::ChildCrashed => "child_crashed",
            Self::ClassifierPanic => "classifier_panic",
            Self::AutoResponseRejected => "auto_response_rejected",
            Self::SubscriberLag => "subscriber_lag",
            Self::AlreadyStopped => "already_stopped",
            Self::UnknownAdapter => "unknown_adapter",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cause classification for spawn failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnErrorCause {
    CommandNotFound,
    PermissionDenied,
    InvalidWorkdir,
    Unknown,
}

impl SpawnErrorCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CommandNotFound => "command not found",
            Self::PermissionDenied => "permission denied",
            Self::InvalidWorkdir => "invalid working directory",
            Self::Unknown => "unknown",
        }
    }

    /// Conventional exit code for this cause, where one exists.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CommandNotFound => Some(127),
            _ => None,
        }
    }
}

impl fmt::Display for SpawnErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

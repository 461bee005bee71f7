// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Native PTY backend.
//!
//! Exactly one task reads each PTY master; writes are funneled through the
//! session's input channel so interleaved callers cannot corrupt the
//! child's input stream.

pub mod spawn;

pub use spawn::{preflight, PtyChild};

use crate::error::SpawnErrorCause;

/// Exit status of the child process, as reaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ExitStatus {
    /// Conventional code for a Ctrl+C-style interrupt.
    pub const INTERRUPT: i32 = 130;

    /// Whether this is a clean zero exit.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Surface-level exit code: the real code, 130 for SIGINT/SIGTERM
    /// deaths, 127 when the exec never happened.
    pub fn surfaced_code(&self) -> i32 {
        if let Some(code) = self.code {
            return code;
        }
        match self.signal {
            Some(sig) if sig == nix::sys::signal::Signal::SIGINT as i32 => Self::INTERRUPT,
            Some(sig) => 128 + sig,
            None => -1,
        }
    }
}

/// Error from opening the PTY or spawning the child, with its classified
/// cause attached.
#[derive(Debug)]
pub struct SpawnError {
    pub cause: SpawnErrorCause,
    pub message: String,
}

impl std::fmt::Display for SpawnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.cause, self.message)
    }
}

impl std::error::Error for SpawnError {}

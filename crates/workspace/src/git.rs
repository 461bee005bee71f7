// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git subprocess plumbing.
//!
//! Every Git invocation goes through [`GitRunner`]: cancellation-aware,
//! terminal prompts disabled, stderr tails captured and redacted before
//! they can reach a log line or error message.

use std::path::Path;
use std::process::Stdio;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ErrorKind;
use crate::redact::Redactor;

/// How much stderr tail survives into error messages.
const STDERR_TAIL: usize = 800;

/// Captured output of a successful Git command.
#[derive(Debug, Clone)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs `git` with uniform hygiene.
#[derive(Debug, Clone)]
pub struct GitRunner {
    redactor: Redactor,
}

impl GitRunner {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self { redactor: Redactor::new()? })
    }

    /// Run `git <args>` in `dir` (or the process cwd), honoring `cancel`.
    ///
    /// Non-zero exits become [`ErrorKind::GitCommandFailed`] errors whose
    /// message carries the redacted stderr tail.
    pub async fn run(
        &self,
        dir: Option<&Path>,
        args: &[&str],
        cancel: &CancellationToken,
    ) -> anyhow::Result<GitOutput> {
        let mut command = tokio::process::Command::new("git");
        command
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = dir {
            command.current_dir(dir);
        }

        // Argv can carry a credentialed URL; scrub before logging.
        let shown: Vec<String> = args.iter().map(|a| self.redactor.redact(a)).collect();
        debug!(args = ?shown, dir = ?dir.map(|d| d.display().to_string()), "git");

        let child = command.spawn().context("failed to spawn git")?;

        let output = tokio::select! {
            _ = cancel.cancelled() => {
                anyhow::bail!("git {} cancelled", args.first().unwrap_or(&""));
            }
            output = child.wait_with_output() => output.context("git wait failed")?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let tail: String = stderr
                .chars()
                .skip(stderr.chars().count().saturating_sub(STDERR_TAIL))
                .collect();
            anyhow::bail!(
                "{}: git {} exited {}: {}",
                ErrorKind::GitCommandFailed,
                args.first().unwrap_or(&""),
                output.status.code().unwrap_or(-1),
                self.redactor.redact(tail.trim())
            );
        }

        Ok(GitOutput { stdout, stderr })
    }
}

/// Whether a Git failure reads as an authentication problem (the trigger
/// for the single credentialed clone retry).
pub fn is_auth_failure(message: &str) -> bool {
    const MARKERS: &[&str] = &[
        "Authentication failed",
        "could not read Username",
        "could not read Password",
        "terminal prompts disabled",
        "Invalid username or password",
        "Permission denied (publickey)",
        "HTTP 401",
        "HTTP 403",
        "401 Unauthorized",
        "403 Forbidden",
    ];
    MARKERS.iter().any(|marker| message.contains(marker))
}

/// Embed a token into an HTTPS repo URL for a one-shot authenticated
/// operation. The resulting URL must never be logged unredacted.
pub fn authenticated_url(repo: &str, token: &str) -> String {
    match repo.strip_prefix("https://") {
        Some(rest) => format!("https://x-access-token:{token}@{rest}"),
        None => repo.to_owned(),
    }
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;

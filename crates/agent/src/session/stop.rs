// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stop semantics: SIGINT → SIGTERM → SIGKILL escalation.
//!
//! `stop` returns only after the child has been reaped and the session is
//! terminal. A second stop is a no-op that waits for the first to finish.
//! A stop before the session ever became ready still passes through
//! `Stopped` with the recorded reason.

use std::time::Duration;

use nix::sys::signal::Signal;
use tracing::debug;

use crate::pty::ExitStatus;

use super::run::SessionHandle;

/// Options for stopping a session.
#[derive(Debug, Clone, Copy)]
pub struct StopOptions {
    /// Skip the graceful escalation and SIGKILL immediately.
    pub force: bool,
    /// Wait per escalation step; defaults to the supervisor's configured
    /// stop timeout.
    pub timeout: Option<Duration>,
}

impl Default for StopOptions {
    fn default() -> Self {
        Self { force: false, timeout: None }
    }
}

impl StopOptions {
    pub fn force() -> Self {
        Self { force: true, timeout: None }
    }
}

impl SessionHandle {
    /// Stop the child and wait for the session to become terminal.
    pub async fn stop(&self, opts: StopOptions) -> anyhow::Result<ExitStatus> {
        // Already terminal → no-op.
        if let Some(exit) = self.exit_info() {
            return Ok(exit.status);
        }

        let reason = if opts.force { "force stop requested" } else { "stop requested" };
        let first = self.record_stop_reason(reason);
        if !first {
            // Another stop is in flight; just wait for it.
            return self.wait_terminal().await;
        }

        let step = opts.timeout.unwrap_or(self.stop_timeout);

        if opts.force {
            let _ = self.pty().signal(Signal::SIGKILL);
            return self.wait_terminal().await;
        }

        for (signal, wait) in
            [(Signal::SIGINT, Some(step)), (Signal::SIGTERM, Some(step)), (Signal::SIGKILL, None)]
        {
            debug!(session = %self.id(), signal = %signal, "stop escalation");
            let _ = self.pty().signal(signal);
            match wait {
                Some(step) => {
                    if let Ok(status) =
                        tokio::time::timeout(step, self.wait_terminal()).await
                    {
                        return status;
                    }
                }
                None => return self.wait_terminal().await,
            }
        }
        self.wait_terminal().await
    }

    /// Wait until the reader pump has reaped the child and finalized.
    async fn wait_terminal(&self) -> anyhow::Result<ExitStatus> {
        let mut rx = self.exit_watch();
        loop {
            if let Some(status) = *rx.borrow() {
                return Ok(status);
            }
            rx.changed().await.map_err(|_| anyhow::anyhow!("session runtime went away"))?;
        }
    }
}

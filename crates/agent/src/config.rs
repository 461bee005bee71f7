// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use crate::scrollback::{DEFAULT_CAPACITY, DEFAULT_TAIL};

/// Tunables for the supervisor and its sessions.
///
/// Defaults are production values; every field can be overridden through
/// `PARALLAX_*` environment variables or the builder setters.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Scrollback retention per session, in bytes.
    pub scrollback_capacity: usize,
    /// Tail window handed to detectors, in bytes.
    pub tail_window: usize,
    /// Per-subscriber event buffer length.
    pub event_capacity: usize,
    /// Minimum interval between identical status emissions per session.
    pub status_debounce: Duration,
    /// Wait per escalation step during a graceful stop.
    pub stop_timeout: Duration,
    /// Initial terminal size for new sessions.
    pub cols: u16,
    pub rows: u16,
    /// PTY read buffer size.
    pub read_buffer: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            scrollback_capacity: DEFAULT_CAPACITY,
            tail_window: DEFAULT_TAIL,
            event_capacity: 1024,
            status_debounce: Duration::from_millis(250),
            stop_timeout: Duration::from_secs(5),
            cols: 200,
            rows: 50,
            read_buffer: 8192,
        }
    }
}

impl SupervisorConfig {
    /// Defaults with `PARALLAX_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_usize("PARALLAX_SCROLLBACK_BYTES") {
            config.scrollback_capacity = v;
        }
        if let Some(v) = env_usize("PARALLAX_TAIL_BYTES") {
            config.tail_window = v;
        }
        if let Some(v) = env_usize("PARALLAX_EVENT_CAPACITY") {
            config.event_capacity = v;
        }
        if let Some(v) = env_u64("PARALLAX_STATUS_DEBOUNCE_MS") {
            config.status_debounce = Duration::from_millis(v);
        }
        if let Some(v) = env_u64("PARALLAX_STOP_TIMEOUT_MS") {
            config.stop_timeout = Duration::from_millis(v);
        }
        if let Some(v) = env_u64("PARALLAX_COLS") {
            config.cols = v as u16;
        }
        if let Some(v) = env_u64("PARALLAX_ROWS") {
            config.rows = v as u16;
        }
        config
    }

    pub fn with_tail_window(mut self, bytes: usize) -> Self {
        self.tail_window = bytes;
        self
    }

    pub fn with_scrollback_capacity(mut self, bytes: usize) -> Self {
        self.scrollback_capacity = bytes;
        self
    }

    pub fn with_status_debounce(mut self, interval: Duration) -> Self {
        self.status_debounce = interval;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok()?.parse().ok()
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

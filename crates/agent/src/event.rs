// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed session event bus.
//!
//! One broadcast channel per supervisor; each session publishes its own
//! events sequentially so per-session ordering is preserved end to end.
//! Subscribers carry bounded buffers with drop-oldest semantics: a slow
//! consumer loses its oldest queued events (surfaced as [`SessionEvent::
//! SubscriberLag`]) without back-pressuring the PTY reader.

use bytes::Bytes;
use tokio::sync::broadcast;

use crate::session::SessionState;

/// Opaque session identifier, unique for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Events delivered to supervisor subscribers.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The child process is running; readiness arrives separately.
    SessionStarted { session: SessionId, name: String, adapter: String },
    /// A chunk of raw PTY output, in arrival order, gap-free per session.
    SessionOutput { session: SessionId, data: Bytes },
    /// A lifecycle state change. `reason` carries human-facing
    /// instructions for attention states; `error` carries a redacted
    /// failure message for `Error`.
    SessionStatus {
        session: SessionId,
        kind: SessionState,
        error: Option<String>,
        reason: Option<String>,
    },
    /// The child exited and was reaped.
    SessionStopped { session: SessionId, code: Option<i32>, signal: Option<i32> },
    /// This subscriber fell behind; `dropped` events were discarded for it
    /// (the session itself lost nothing).
    SubscriberLag { dropped: u64 },
}

impl SessionEvent {
    /// The session this event belongs to, if any.
    pub fn session(&self) -> Option<&SessionId> {
        match self {
            Self::SessionStarted { session, .. }
            | Self::SessionOutput { session, .. }
            | Self::SessionStatus { session, .. }
            | Self::SessionStopped { session, .. } => Some(session),
            Self::SubscriberLag { .. } => None,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::SessionStarted { .. } => EventKind::Started,
            Self::SessionOutput { .. } => EventKind::Output,
            Self::SessionStatus { .. } => EventKind::Status,
            Self::SessionStopped { .. } => EventKind::Stopped,
            Self::SubscriberLag { .. } => EventKind::Lag,
        }
    }
}

/// Coarse event classification for callback subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Started,
    Output,
    Status,
    Stopped,
    Lag,
    All,
}

impl EventKind {
    /// Whether an event of kind `other` passes this filter.
    pub fn accepts(&self, other: EventKind) -> bool {
        *self == EventKind::All || *self == other
    }
}

/// Fan-out hub for session events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Create a bus whose subscribers each buffer up to `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. No receivers is not an error.
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }

    /// Open a new subscription starting at the current position.
    pub fn subscribe(&self) -> EventStream {
        EventStream { rx: self.tx.subscribe() }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// A single subscriber's view of the bus.
///
/// Lag is converted into an in-band [`SessionEvent::SubscriberLag`] so
/// consumers observe the discontinuity instead of an error.
pub struct EventStream {
    rx: broadcast::Receiver<SessionEvent>,
}

impl EventStream {
    /// Receive the next event. Returns `None` once the bus is closed and
    /// the backlog is drained.
    pub async fn next(&mut self) -> Option<SessionEvent> {
        match self.rx.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                Some(SessionEvent::SubscriberLag { dropped: n })
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Non-blocking receive for polling consumers.
    pub fn try_next(&mut self) -> Option<SessionEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                Some(SessionEvent::SubscriberLag { dropped: n })
            }
            Err(_) => None,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The session runtime: reader pump, writer pump, and the handle callers
//! hold.
//!
//! Exactly one task reads the PTY master; everything a caller does goes
//! through the handle. Scrollback is single-writer (the pump) behind a
//! `RwLock` whose readers copy the small tail window, so snapshots never
//! block the reader.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::Context;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::adapter::{rules, Adapter, RuleDecision};
use crate::ansi::strip_for_detection;
use crate::config::SupervisorConfig;
use crate::error::ErrorKind;
use crate::event::{EventBus, SessionEvent, SessionId};
use crate::pty::{ExitStatus, PtyChild};
use crate::scrollback::Scrollback;

use super::classify::{classify_guarded, Classification};
use super::transition;
use super::{ExitInfo, SessionState, Snapshot};

/// Mutable session bookkeeping behind one short-lived lock.
struct StateCell {
    state: SessionState,
    exit: Option<ExitInfo>,
    /// `once` rules that have fired for this session.
    fired: HashSet<&'static str>,
    /// Rules that already answered the currently-visible prompt; cleared
    /// when the pattern leaves the tail.
    pending: HashSet<&'static str>,
    /// Last emission instant per state kind, for debounce.
    last_emit: HashMap<SessionState, Instant>,
    /// Reason recorded when a stop was requested.
    stop_reason: Option<String>,
    /// Exit announced by the adapter before the child actually died.
    announced_exit: Option<String>,
}

/// A live session. Cheap to clone via `Arc`; all operations are safe to
/// call from any task.
pub struct SessionHandle {
    id: SessionId,
    name: String,
    adapter: Arc<dyn Adapter>,
    workdir: PathBuf,
    env: Vec<(String, String)>,
    created_at: SystemTime,
    cell: Mutex<StateCell>,
    scrollback: RwLock<Scrollback>,
    pty: PtyChild,
    input_tx: mpsc::Sender<Bytes>,
    exit_rx: watch::Receiver<Option<ExitStatus>>,
    exit_tx: watch::Sender<Option<ExitStatus>>,
    cancel: CancellationToken,
    bus: EventBus,
    tail_window: usize,
    debounce: Duration,
    pub(crate) stop_timeout: Duration,
}

impl SessionHandle {
    /// Spawn the child and start the reader/writer pumps.
    pub(crate) fn start(
        id: SessionId,
        name: String,
        adapter: Arc<dyn Adapter>,
        command: Vec<String>,
        workdir: PathBuf,
        env: Vec<(String, String)>,
        config: &SupervisorConfig,
        bus: EventBus,
        cancel: CancellationToken,
    ) -> anyhow::Result<Arc<Self>> {
        let pty = PtyChild::spawn(&command, &workdir, &env, config.cols, config.rows)
            .context("pty spawn failed")?;

        let (input_tx, input_rx) = mpsc::channel::<Bytes>(256);
        let (exit_tx, exit_rx) = watch::channel(None);

        let handle = Arc::new(Self {
            id,
            name,
            adapter,
            workdir,
            env,
            created_at: SystemTime::now(),
            cell: Mutex::new(StateCell {
                state: SessionState::Spawning,
                exit: None,
                fired: HashSet::new(),
                pending: HashSet::new(),
                last_emit: HashMap::new(),
                stop_reason: None,
                announced_exit: None,
            }),
            scrollback: RwLock::new(Scrollback::new(config.scrollback_capacity)),
            pty,
            input_tx,
            exit_rx,
            exit_tx,
            cancel,
            bus,
            tail_window: config.tail_window,
            debounce: config.status_debounce,
            stop_timeout: config.stop_timeout,
        });

        handle.spawn_writer(input_rx);
        handle.spawn_reader(config.read_buffer);
        Ok(handle)
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn adapter_kind(&self) -> &'static str {
        self.adapter.kind()
    }

    pub fn workdir(&self) -> &PathBuf {
        &self.workdir
    }

    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn child_pid(&self) -> u32 {
        self.pty.pid()
    }

    pub fn state(&self) -> SessionState {
        self.cell.lock().state
    }

    pub fn exit_info(&self) -> Option<ExitInfo> {
        self.cell.lock().exit.clone()
    }

    pub(crate) fn exit_watch(&self) -> watch::Receiver<Option<ExitStatus>> {
        self.exit_rx.clone()
    }

    pub(crate) fn pty(&self) -> &PtyChild {
        &self.pty
    }

    /// Point-in-time status plus the stripped tail.
    pub fn snapshot(&self) -> Snapshot {
        let (tail, total_written) = {
            let sb = self.scrollback.read();
            (strip_for_detection(&sb.tail(self.tail_window)), sb.total_written())
        };
        let cell = self.cell.lock();
        Snapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            adapter: self.adapter.kind().to_owned(),
            state: cell.state,
            tail,
            total_written,
            exit: cell.exit.clone(),
            created_at: self.created_at,
        }
    }

    /// Everything still retained in the scrollback, lossily decoded.
    pub fn buffered_output(&self) -> String {
        String::from_utf8_lossy(&self.scrollback.read().buffered()).into_owned()
    }

    /// Replay retained output from a global byte offset.
    pub fn read_from(&self, offset: u64) -> Option<Vec<u8>> {
        self.scrollback.read().read_from(offset)
    }

    // ── Caller operations ───────────────────────────────────────────────

    /// Write bytes to the child's input.
    ///
    /// A submitted line (`\r`/`\n`) moves a ready session to `Working`.
    pub async fn write(&self, data: Bytes) -> anyhow::Result<()> {
        {
            let cell = self.cell.lock();
            if cell.state.is_terminal() {
                anyhow::bail!("{}: session already stopped", ErrorKind::AlreadyStopped);
            }
        }
        let submitted = data.contains(&b'\r') || data.contains(&b'\n');
        self.input_tx.send(data).await.map_err(|_| {
            anyhow::anyhow!("{}: session already stopped", ErrorKind::AlreadyStopped)
        })?;
        if submitted {
            self.transition_and_emit(SessionState::Working, None, None);
        }
        Ok(())
    }

    /// Resize the PTY window.
    pub fn resize(&self, cols: u16, rows: u16) -> anyhow::Result<()> {
        {
            let cell = self.cell.lock();
            if cell.state.is_terminal() {
                anyhow::bail!("{}: session already stopped", ErrorKind::AlreadyStopped);
            }
        }
        self.pty.resize(cols, rows)
    }

    // ── Pumps ───────────────────────────────────────────────────────────

    fn spawn_writer(self: &Arc<Self>, mut input_rx: mpsc::Receiver<Bytes>) {
        let handle = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = handle.cancel.cancelled() => break,
                    data = input_rx.recv() => {
                        let Some(data) = data else { break };
                        if let Err(e) = handle.pty.write_all(&data).await {
                            debug!(session = %handle.id, err = %e, "pty write failed");
                            break;
                        }
                    }
                }
            }
        });
    }

    fn spawn_reader(self: &Arc<Self>, read_buffer: usize) {
        let handle = Arc::clone(self);
        tokio::spawn(async move {
            handle.pump(read_buffer).await;
        });
    }

    /// The single reader loop: drain the PTY, classify, respond, then
    /// reap the child and finalize.
    async fn pump(self: Arc<Self>, read_buffer: usize) {
        let mut buf = vec![0u8; read_buffer.max(1024)];
        let mut read_error: Option<String> = None;

        loop {
            let n = tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = self.pty.read_into(&mut buf) => match result {
                    Ok(0) => break,
                    Ok(n) => n,
                    // EIO is the normal "child closed its side" signal.
                    Err(e) if e.raw_os_error() == Some(nix::libc::EIO) => break,
                    Err(e) => {
                        read_error = Some(e.to_string());
                        break;
                    }
                },
            };

            let data = Bytes::copy_from_slice(&buf[..n]);
            self.scrollback.write().push(data.clone());
            self.bus.emit(SessionEvent::SessionOutput { session: self.id.clone(), data });

            if self.tick().await {
                break;
            }
        }

        if let Some(err) = read_error {
            let tail = self.stripped_tail();
            warn!(session = %self.id, err = %err, "pty read failed");
            self.finalize_error(format!("{}: {err}; tail: {tail}", ErrorKind::PtyIoError));
        }

        // Reap and finalize. A stop in flight unblocks this via SIGKILL.
        match self.pty.wait().await {
            Ok(status) => self.finalize(status),
            Err(e) => self.finalize_error(format!("failed to reap child: {e:#}")),
        }
    }

    fn stripped_tail(&self) -> String {
        strip_for_detection(&self.scrollback.read().tail(self.tail_window))
    }

    /// One detection pass over the current tail. Returns `true` when the
    /// pump loop should stop (adapter announced exit).
    async fn tick(&self) -> bool {
        let tail = self.stripped_tail();

        // Auto-response catalog first: a safe rule answering the visible
        // prompt suppresses the blocking event for this tick.
        let decision = {
            let cell = self.cell.lock();
            rules::evaluate(self.adapter.rules(), &tail, &cell.fired)
        };
        let mut responded = false;
        match decision {
            RuleDecision::Respond { rule, bytes, once } => {
                let should_write = {
                    let mut cell = self.cell.lock();
                    if cell.pending.contains(rule) {
                        false
                    } else {
                        cell.pending.insert(rule);
                        if once {
                            cell.fired.insert(rule);
                        }
                        true
                    }
                };
                if should_write {
                    debug!(session = %self.id, rule, "auto-response issued");
                    let _ = self.input_tx.send(Bytes::from(bytes)).await;
                }
                responded = true;
            }
            RuleDecision::Escalate { rule, reason, .. } => {
                // A once rule that just answered this very occurrence is
                // still "pending" until the prompt leaves the tail; only
                // a fresh occurrence escalates.
                let already_answered = reason == rules::EscalateReason::OnceExhausted
                    && self.cell.lock().pending.contains(rule);
                if already_answered {
                    responded = true;
                } else {
                    debug!(
                        session = %self.id,
                        rule,
                        reason = reason.as_str(),
                        kind = %ErrorKind::AutoResponseRejected,
                        "matched rule cannot fire"
                    );
                }
            }
            RuleDecision::None => {}
        }

        // Drop pending entries once their prompt left the tail.
        {
            let mut cell = self.cell.lock();
            let rules = self.adapter.rules();
            cell.pending.retain(|id| {
                rules.iter().any(|r| r.id == *id && r.pattern.is_match(&tail))
            });
        }

        let (classification, panicked) = classify_guarded(self.adapter.as_ref(), &tail);
        if panicked {
            warn!(
                session = %self.id,
                kind = %ErrorKind::ClassifierPanic,
                "detector panicked; tick demoted"
            );
        }

        match classification {
            Classification::Exit(exit) => {
                let mut cell = self.cell.lock();
                cell.announced_exit =
                    Some(exit.reason.unwrap_or_else(|| "exit announced".to_owned()));
                true
            }
            Classification::Prompt(prompt) => {
                if !responded {
                    let reason = prompt
                        .instructions
                        .or_else(|| prompt.kind.map(|k| format!("{k} prompt requires a response")));
                    self.transition_and_emit(SessionState::BlockingPrompt, None, reason);
                }
                false
            }
            Classification::Login(login) => {
                let reason = match (login.instructions, login.url) {
                    (Some(instructions), Some(url)) => Some(format!("{instructions} ({url})")),
                    (Some(instructions), None) => Some(instructions),
                    (None, Some(url)) => Some(url),
                    (None, None) => None,
                };
                self.transition_and_emit(SessionState::LoginRequired, None, reason);
                false
            }
            Classification::Ready => {
                self.transition_and_emit(SessionState::Ready, None, None);
                false
            }
            Classification::TaskComplete => {
                self.transition_and_emit(SessionState::TaskComplete, None, None);
                false
            }
            Classification::None => {
                if let Some(parsed) = self.adapter.parse_output(&tail) {
                    if parsed.kind == crate::adapter::OutputKind::Progress {
                        self.transition_and_emit(SessionState::Working, None, None);
                    }
                }
                false
            }
        }
    }

    // ── Transitions and finalization ────────────────────────────────────

    /// Apply a transition; on an actual edge, emit a status event subject
    /// to the per-kind debounce. Terminal kinds always emit.
    fn transition_and_emit(
        &self,
        to: SessionState,
        error: Option<String>,
        reason: Option<String>,
    ) {
        let emit = {
            let mut cell = self.cell.lock();
            if !transition::apply(&mut cell.state, to) {
                return;
            }
            if to.is_terminal() {
                true
            } else {
                let now = Instant::now();
                let within = cell
                    .last_emit
                    .get(&to)
                    .is_some_and(|last| now.duration_since(*last) < self.debounce);
                if !within {
                    cell.last_emit.insert(to, now);
                }
                !within
            }
        };
        if emit {
            self.bus.emit(SessionEvent::SessionStatus {
                session: self.id.clone(),
                kind: to,
                error,
                reason,
            });
        }
    }

    pub(crate) fn record_stop_reason(&self, reason: &str) -> bool {
        let mut cell = self.cell.lock();
        if cell.state.is_terminal() {
            return false;
        }
        if cell.stop_reason.is_none() {
            cell.stop_reason = Some(reason.to_owned());
            true
        } else {
            false
        }
    }

    /// Record the reaped status and enter the terminal state. Exit info is
    /// set exactly once; later calls are no-ops.
    fn finalize(&self, status: ExitStatus) {
        let (final_state, error) = {
            let mut cell = self.cell.lock();
            if cell.exit.is_some() {
                return;
            }
            let stopped = cell.stop_reason.is_some() || cell.announced_exit.is_some();
            let reason = cell
                .stop_reason
                .clone()
                .or_else(|| cell.announced_exit.clone());
            // Deaths by the stop-escalation signals count as stopped even
            // when delivered from outside the supervisor.
            let stop_signal = status.signal.is_some_and(|sig| {
                sig == nix::sys::signal::Signal::SIGINT as i32
                    || sig == nix::sys::signal::Signal::SIGTERM as i32
                    || sig == nix::sys::signal::Signal::SIGHUP as i32
                    || sig == nix::sys::signal::Signal::SIGKILL as i32
            });
            let (final_state, error) = if stopped || status.success() || stop_signal {
                (SessionState::Stopped, None)
            } else {
                (SessionState::Error, Some(ErrorKind::ChildCrashed))
            };
            cell.exit = Some(ExitInfo { status, reason });
            (final_state, error)
        };

        let error_message = error.map(|kind| {
            format!(
                "{kind}: exit code {}; tail: {}",
                status.surfaced_code(),
                self.stripped_tail()
            )
        });

        self.transition_and_emit(final_state, error_message, None);
        self.bus.emit(SessionEvent::SessionStopped {
            session: self.id.clone(),
            code: status.code,
            signal: status.signal,
        });
        let _ = self.exit_tx.send(Some(status));
        self.cancel.cancel();
    }

    /// Terminal error without a reaped status (PTY open/read failures).
    fn finalize_error(&self, message: String) {
        {
            let mut cell = self.cell.lock();
            if cell.exit.is_some() {
                return;
            }
            cell.exit = Some(ExitInfo {
                status: ExitStatus { code: None, signal: None },
                reason: Some(message.clone()),
            });
        }
        self.transition_and_emit(SessionState::Error, Some(message), None);
        let _ = self.exit_tx.send(Some(ExitStatus { code: None, signal: None }));
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("adapter", &self.adapter.kind())
            .field("state", &self.cell.lock().state)
            .finish()
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervisor: adapter registry, session registry, and the event bus.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::adapter::{Adapter, AdapterRegistry, LaunchConfig};
use crate::config::SupervisorConfig;
use crate::error::ErrorKind;
use crate::event::{EventBus, EventKind, EventStream, SessionEvent, SessionId};
use crate::pty::{preflight, ExitStatus};
use crate::session::{SessionHandle, SpawnConfig, StopOptions};

/// Owner of all sessions. A process may construct several supervisors
/// side by side; there is no global state.
pub struct Supervisor {
    config: SupervisorConfig,
    adapters: Mutex<AdapterRegistry>,
    sessions: Mutex<HashMap<SessionId, Arc<SessionHandle>>>,
    bus: EventBus,
    root: CancellationToken,
}

impl Supervisor {
    /// A supervisor with an empty adapter registry.
    pub fn new(config: SupervisorConfig) -> Self {
        let bus = EventBus::new(config.event_capacity);
        Self {
            config,
            adapters: Mutex::new(AdapterRegistry::new()),
            sessions: Mutex::new(HashMap::new()),
            bus,
            root: CancellationToken::new(),
        }
    }

    /// A supervisor preloaded with the shipped adapters.
    pub fn with_default_adapters(config: SupervisorConfig) -> anyhow::Result<Self> {
        let supervisor = Self::new(config);
        *supervisor.adapters.lock() = AdapterRegistry::with_defaults()?;
        Ok(supervisor)
    }

    /// Register (or replace) an adapter.
    pub fn register_adapter(&self, adapter: Arc<dyn Adapter>) {
        self.adapters.lock().register(adapter);
    }

    pub fn adapter_names(&self) -> Vec<&'static str> {
        self.adapters.lock().names()
    }

    /// Spawn a session. Returns once the child is running (`Spawning`);
    /// readiness is signalled by event.
    pub async fn spawn(&self, spawn: SpawnConfig) -> anyhow::Result<Arc<SessionHandle>> {
        anyhow::ensure!(!self.root.is_cancelled(), "supervisor is shutting down");

        let adapter = self
            .adapters
            .lock()
            .get(&spawn.adapter)
            .with_context(|| format!("{}: {}", ErrorKind::UnknownAdapter, spawn.adapter))?;

        let workdir = match spawn.workdir {
            Some(dir) => dir,
            None => std::env::current_dir().context("cannot resolve caller cwd")?,
        };

        let mut launch = LaunchConfig {
            name: spawn.name.clone(),
            workdir: workdir.clone(),
            env: spawn.env.clone(),
            ..LaunchConfig::default()
        };
        if let Some(config) = spawn.adapter_config {
            launch.parse_adapter_config(config).context("invalid adapter_config")?;
        }

        let spec = adapter.launch(&launch).context("adapter launch assembly failed")?;
        preflight(&spec.program, &workdir)
            .map_err(|e| anyhow::anyhow!("{}: {e}", ErrorKind::SpawnFailed))?;

        // Env delta: spawn config first, adapter additions override.
        let mut env = spawn.env;
        env.extend(spec.env.iter().cloned());

        let id = SessionId::generate();
        let handle = SessionHandle::start(
            id.clone(),
            spawn.name.clone(),
            adapter,
            spec.command(),
            workdir,
            env,
            &self.config,
            self.bus.clone(),
            self.root.child_token(),
        )
        .map_err(|e| anyhow::anyhow!("{}: {e:#}", ErrorKind::SpawnFailed))?;

        self.sessions.lock().insert(id.clone(), Arc::clone(&handle));
        info!(session = %id, name = %spawn.name, adapter = handle.adapter_kind(), "session spawned");
        self.bus.emit(SessionEvent::SessionStarted {
            session: id,
            name: spawn.name,
            adapter: handle.adapter_kind().to_owned(),
        });
        Ok(handle)
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<SessionHandle>> {
        self.sessions.lock().get(id).cloned()
    }

    pub fn list(&self) -> Vec<Arc<SessionHandle>> {
        self.sessions.lock().values().cloned().collect()
    }

    /// Write to a session's child by id.
    pub async fn write(&self, id: &SessionId, data: Bytes) -> anyhow::Result<()> {
        let handle = self.get(id).with_context(|| format!("unknown session: {id}"))?;
        handle.write(data).await
    }

    /// Resize a session's PTY by id.
    pub fn resize(&self, id: &SessionId, cols: u16, rows: u16) -> anyhow::Result<()> {
        let handle = self.get(id).with_context(|| format!("unknown session: {id}"))?;
        handle.resize(cols, rows)
    }

    /// Stop a session by id.
    pub async fn stop(&self, id: &SessionId, opts: StopOptions) -> anyhow::Result<ExitStatus> {
        let handle = self.get(id).with_context(|| format!("unknown session: {id}"))?;
        handle.stop(opts).await
    }

    /// Cancel outstanding spawns, then stop every live session.
    pub async fn stop_all(&self, opts: StopOptions) {
        self.root.cancel();
        let sessions = self.list();
        for handle in sessions {
            if let Err(e) = handle.stop(opts).await {
                tracing::warn!(session = %handle.id(), err = %e, "stop failed during shutdown");
            }
        }
    }

    /// Open a pull-style subscription to the event bus.
    pub fn subscribe(&self) -> EventStream {
        self.bus.subscribe()
    }

    /// Register a callback for events of one kind. The callback runs on a
    /// dedicated delivery task so a slow subscriber cannot stall others.
    pub fn on<F>(&self, kind: EventKind, mut callback: F) -> Subscription
    where
        F: FnMut(SessionEvent) + Send + 'static,
    {
        let mut stream = self.bus.subscribe();
        let task = tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                if kind.accepts(event.kind()) {
                    callback(event);
                }
            }
        });
        Subscription { task }
    }

    /// Drop sessions that have reached a terminal state from the registry.
    /// Handles held by callers stay valid.
    pub fn prune(&self) -> usize {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, handle| !handle.state().is_terminal());
        before - sessions.len()
    }
}

/// Guard for a callback subscription; unsubscribes on drop.
pub struct Subscription {
    task: tokio::task::JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        self.task.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;

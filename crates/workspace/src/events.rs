// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace and credential event hubs.
//!
//! Both hubs fan out over bounded broadcast channels; a subscriber that
//! falls behind loses its own oldest events without affecting the
//! publishers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::credential::{CredentialKind, GrantId};
use crate::model::{Phase, WorkspaceId, WorkspaceStatus};
use crate::provider::Provider;

/// Progress and outcome events for workspaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkspaceEvent {
    /// A phase transition during provisioning or finalization.
    Progress { workspace: WorkspaceId, phase: Phase, status: WorkspaceStatus },
    /// The workspace reached `ready`.
    Ready { workspace: WorkspaceId, path: String, branch: String },
    /// Provisioning or finalization failed. The message is redacted.
    Error { workspace: WorkspaceId, message: String },
    /// The workspace (and, for clones, its worktrees) was removed.
    CleanedUp { workspace: WorkspaceId },
}

impl WorkspaceEvent {
    pub fn workspace(&self) -> &WorkspaceId {
        match self {
            Self::Progress { workspace, .. }
            | Self::Ready { workspace, .. }
            | Self::Error { workspace, .. }
            | Self::CleanedUp { workspace } => workspace,
        }
    }
}

/// Events from the credential broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CredentialEvent {
    /// The device flow needs the user: open the URL, enter the code.
    DeviceFlowPrompt {
        provider: Provider,
        verification_uri: String,
        user_code: String,
        permissions: Vec<String>,
        expires_in_secs: u64,
    },
    /// A grant was issued.
    Granted { grant: GrantId, provider: Provider, kind: CredentialKind },
    /// A grant was revoked.
    Revoked { grant: GrantId },
    /// A cached token was transparently refreshed.
    Refreshed { provider: Provider },
}

/// Broadcast hub shared by the service and the broker.
#[derive(Debug, Clone)]
pub struct EventHub {
    workspace_tx: broadcast::Sender<WorkspaceEvent>,
    credential_tx: broadcast::Sender<CredentialEvent>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (workspace_tx, _) = broadcast::channel(capacity.max(1));
        let (credential_tx, _) = broadcast::channel(capacity.max(1));
        Self { workspace_tx, credential_tx }
    }

    pub fn emit_workspace(&self, event: WorkspaceEvent) {
        let _ = self.workspace_tx.send(event);
    }

    pub fn emit_credential(&self, event: CredentialEvent) {
        let _ = self.credential_tx.send(event);
    }

    pub fn subscribe_workspace(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.workspace_tx.subscribe()
    }

    pub fn subscribe_credential(&self) -> broadcast::Receiver<CredentialEvent> {
        self.credential_tx.subscribe()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(256)
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git workspace provisioning and credential brokering for assistant
//! executions.
//!
//! Provisions clone and worktree workspaces keyed by execution, resolves
//! credentials through a fixed priority chain (user-provided → cached
//! token → provider adapter → device flow), records grants for audit,
//! and finalizes work as pushes and pull requests.

pub mod branch;
pub mod config;
pub mod credential;
pub mod error;
pub mod events;
pub mod git;
pub mod helper;
pub mod hook;
pub mod model;
pub mod provider;
pub mod redact;
pub mod service;

pub use config::WorkspaceConfig;
pub use credential::{BrokerConfig, CredentialBroker, OAuthConfig};
pub use events::{CredentialEvent, EventHub, WorkspaceEvent};
pub use model::{
    BranchStrategy, FinalizeOutcome, FinalizeRequest, Phase, PrSpec, ProvisionRequest, Strategy,
    Workspace, WorkspaceId, WorkspaceStatus,
};
pub use provider::{Provider, ProviderAdapter};
pub use service::WorkspaceService;

/// Install the ring crypto provider for reqwest/rustls.
///
/// Embedders call this once before any HTTPS traffic (OAuth endpoints,
/// provider APIs, webhooks). Safe to call multiple times — only the
/// first call has effect.
pub fn install_crypto_provider() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

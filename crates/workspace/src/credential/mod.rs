// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential model: grants, requests, and resolved credentials.
//!
//! A grant is an audit record. The secret itself lives only in the
//! in-memory [`ResolvedCredential`] handed to the caller and in the token
//! store; every serialized or logged form carries a redacted reference.

pub mod broker;
pub mod device_code;
pub mod oauth;
pub mod refresh;
pub mod store;

pub use broker::{BrokerConfig, CredentialBroker, OAuthConfig};
pub use oauth::OAuthToken;
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::provider::Provider;
use crate::redact::secret_reference;

/// Opaque grant identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantId(String);

impl GrantId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GrantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What kind of secret backs a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    Pat,
    Oauth,
    SshKey,
    GithubApp,
    DeployKey,
}

impl CredentialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pat => "pat",
            Self::Oauth => "oauth",
            Self::SshKey => "ssh_key",
            Self::GithubApp => "github_app",
            Self::DeployKey => "deploy_key",
        }
    }
}

impl std::fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who a credential was granted to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantContext {
    pub execution_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

impl GrantContext {
    pub fn for_execution(execution_id: impl Into<String>) -> Self {
        Self { execution_id: execution_id.into(), task_id: None, agent_id: None }
    }
}

/// Audit record of an issued credential. Never carries the secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    pub id: GrantId,
    pub kind: CredentialKind,
    /// Redacted reference like `pat:****3kq9`.
    pub secret_ref: String,
    pub repo: String,
    pub provider: Provider,
    pub context: GrantContext,
    pub permissions: Vec<String>,
    pub created_at: SystemTime,
    pub expires_at: SystemTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<SystemTime>,
}

impl Grant {
    /// A grant is valid iff it has not been revoked and has not expired.
    pub fn is_valid_at(&self, now: SystemTime) -> bool {
        self.revoked_at.is_none() && now <= self.expires_at
    }
}

/// A caller-supplied credential, tried first in the priority chain.
#[derive(Debug, Clone)]
pub enum UserCredential {
    Pat { token: String },
    Oauth { token: String },
    /// SSH carries no token; Git uses the ambient agent/key.
    Ssh { key_path: Option<std::path::PathBuf> },
}

impl UserCredential {
    pub fn kind(&self) -> CredentialKind {
        match self {
            Self::Pat { .. } => CredentialKind::Pat,
            Self::Oauth { .. } => CredentialKind::Oauth,
            Self::Ssh { .. } => CredentialKind::SshKey,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Pat { token } | Self::Oauth { token } => Some(token),
            Self::Ssh { .. } => None,
        }
    }
}

/// Requested repository access level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Read,
    #[default]
    Write,
}

impl AccessLevel {
    pub fn permissions(&self) -> Vec<String> {
        match self {
            Self::Read => vec!["contents:read".to_owned()],
            Self::Write => vec!["contents:read".to_owned(), "contents:write".to_owned()],
        }
    }
}

/// A request to the broker.
#[derive(Debug, Clone, Default)]
pub struct CredentialRequest {
    pub repo: String,
    pub access: AccessLevel,
    pub context: GrantContext,
    /// Requested lifetime; capped at the broker's `max_ttl`.
    pub ttl: Option<Duration>,
    /// When set, exhaustion of the chain returns `None` instead of an
    /// error.
    pub optional: bool,
    /// A caller-supplied credential, tried first.
    pub user_credential: Option<UserCredential>,
}

/// What the broker hands back: the grant reference plus the live secret.
#[derive(Debug, Clone)]
pub struct ResolvedCredential {
    pub grant: GrantId,
    pub kind: CredentialKind,
    /// `None` for SSH credentials.
    pub secret: Option<String>,
    pub provider: Provider,
    pub expires_at: SystemTime,
}

impl ResolvedCredential {
    /// Redacted reference for logs.
    pub fn secret_ref(&self) -> String {
        match self.secret {
            Some(ref secret) => secret_reference(self.kind.as_str(), secret),
            None => format!("{}:agent", self.kind),
        }
    }
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;

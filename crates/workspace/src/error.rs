// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured error kinds for the workspace service and credential broker.
///
/// Wire-level codes; cause chains travel via `anyhow` contexts with
/// secrets already redacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No source in the priority chain produced a credential.
    CredentialUnavailable,
    /// The resolved credential or grant is past its expiry.
    CredentialExpired,
    /// A refresh-token exchange failed.
    CredentialRefreshFailed,
    /// The user denied the device-flow authorization.
    OauthDenied,
    /// The device code expired before the user completed authorization.
    OauthTimeout,
    /// A provisioning precondition failed (bad worktree parent, repo
    /// mismatch, missing workspace).
    WorkspacePreconditionViolated,
    /// A git subprocess exited non-zero; stderr tail attached, redacted.
    GitCommandFailed,
    /// A provider API call failed.
    ProviderApiFailed,
    /// Finalize was asked to push or open a PR without credentials.
    PushRequiresAuthentication,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CredentialUnavailable => "credential_unavailable",
            Self::CredentialExpired => "credential_expired",
            Self::CredentialRefreshFailed => "credential_refresh_failed",
            Self::OauthDenied => "oauth_denied",
            Self::OauthTimeout => "oauth_timeout",
            Self::WorkspacePreconditionViolated => "workspace_precondition_violated",
            Self::GitCommandFailed => "git_command_failed",
            Self::ProviderApiFailed => "provider_api_failed",
            Self::PushRequiresAuthentication => "push_requires_authentication",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

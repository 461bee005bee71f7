// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git hosting providers: URL detection and the adapter seam.
//!
//! The core never imports a provider SDK. Anything provider-specific
//! (minting installation tokens, opening pull requests) lives behind
//! [`ProviderAdapter`] and is injected by the embedder.

pub mod github;

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::credential::GrantContext;
use crate::model::PrSpec;

/// Known Git hosting providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Github,
    Gitlab,
    Bitbucket,
    AzureDevops,
    SelfHosted,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Gitlab => "gitlab",
            Self::Bitbucket => "bitbucket",
            Self::AzureDevops => "azure_devops",
            Self::SelfHosted => "self_hosted",
        }
    }

    /// Whether the interactive device flow is in scope for this provider.
    pub fn supports_device_flow(&self) -> bool {
        matches!(self, Self::Github)
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect the provider from a repository URL or shorthand.
pub fn detect(repo: &str) -> Provider {
    if repo.contains("github.com") || repo.starts_with("github:") {
        Provider::Github
    } else if repo.contains("gitlab.com") || repo.starts_with("gitlab:") {
        Provider::Gitlab
    } else if repo.contains("bitbucket.org") || repo.starts_with("bitbucket:") {
        Provider::Bitbucket
    } else if repo.contains("dev.azure.com") || repo.contains("visualstudio.com") {
        Provider::AzureDevops
    } else {
        Provider::SelfHosted
    }
}

/// A token minted by a provider adapter (e.g. a GitHub App installation
/// token).
#[derive(Debug, Clone)]
pub struct MintedToken {
    pub token: String,
    pub expires_at: Option<SystemTime>,
    pub permissions: Vec<String>,
}

/// A created pull request.
#[derive(Debug, Clone)]
pub struct PullRequest {
    pub url: String,
    pub number: u64,
}

/// Provider-specific operations, injected into the workspace service and
/// the credential broker.
#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    /// Mint a short-lived token for the repo, when this adapter can.
    async fn mint_token(
        &self,
        repo: &str,
        context: &GrantContext,
    ) -> anyhow::Result<Option<MintedToken>>;

    /// Open a pull request from `head` onto `base`.
    async fn create_pull_request(
        &self,
        repo: &str,
        head: &str,
        base: &str,
        spec: &PrSpec,
        token: &str,
    ) -> anyhow::Result<PullRequest>;

    /// The repository's default branch.
    async fn default_branch(&self, repo: &str, token: &str) -> anyhow::Result<String>;

    /// Whether a branch exists on the remote.
    async fn branch_exists(&self, repo: &str, branch: &str, token: &str) -> anyhow::Result<bool>;
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;

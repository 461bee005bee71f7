// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GitHub provider adapter over the REST API.

use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::credential::GrantContext;
use crate::error::ErrorKind;
use crate::model::PrSpec;

use super::{MintedToken, Provider, ProviderAdapter, PullRequest};

/// GitHub REST adapter. `app_token_source` is an optional pre-arranged
/// installation token (e.g. minted out-of-band for a GitHub App); when
/// absent, tier three of the credential chain skips this adapter.
pub struct GithubAdapter {
    http: reqwest::Client,
    api_base: String,
    app_token: Option<String>,
}

impl GithubAdapter {
    pub fn new(app_token: Option<String>) -> Self {
        Self::with_api_base("https://api.github.com", app_token)
    }

    /// Custom API base, for self-tests and GHES.
    pub fn with_api_base(api_base: impl Into<String>, app_token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .user_agent("parallax-workspace")
                .build()
                .unwrap_or_default(),
            api_base: api_base.into().trim_end_matches('/').to_owned(),
            app_token,
        }
    }

    fn repo_url(&self, slug: &str) -> String {
        format!("{}/repos/{slug}", self.api_base)
    }
}

/// Extract `owner/repo` from a GitHub URL or shorthand.
pub fn repo_slug(repo: &str) -> anyhow::Result<String> {
    let rest = repo
        .strip_prefix("github:")
        .or_else(|| repo.split_once("github.com").map(|(_, rest)| rest.trim_start_matches([':', '/'])))
        .with_context(|| format!("not a github repo: {repo}"))?;
    let slug = rest.trim_end_matches('/').trim_end_matches(".git");
    let mut parts = slug.splitn(3, '/');
    match (parts.next(), parts.next()) {
        (Some(owner), Some(name)) if !owner.is_empty() && !name.is_empty() => {
            Ok(format!("{owner}/{name}"))
        }
        _ => anyhow::bail!("cannot parse owner/repo from {repo}"),
    }
}

#[derive(Debug, Deserialize)]
struct PrResponse {
    html_url: String,
    number: u64,
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    default_branch: String,
}

#[async_trait::async_trait]
impl ProviderAdapter for GithubAdapter {
    fn provider(&self) -> Provider {
        Provider::Github
    }

    async fn mint_token(
        &self,
        _repo: &str,
        _context: &GrantContext,
    ) -> anyhow::Result<Option<MintedToken>> {
        Ok(self.app_token.clone().map(|token| MintedToken {
            token,
            expires_at: None,
            permissions: vec!["contents:read".to_owned(), "contents:write".to_owned()],
        }))
    }

    async fn create_pull_request(
        &self,
        repo: &str,
        head: &str,
        base: &str,
        spec: &PrSpec,
        token: &str,
    ) -> anyhow::Result<PullRequest> {
        let slug = repo_slug(repo)?;
        let resp = self
            .http
            .post(format!("{}/pulls", self.repo_url(&slug)))
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .json(&serde_json::json!({
                "title": spec.title,
                "body": spec.body,
                "head": head,
                "base": base,
                "draft": spec.draft,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            anyhow::bail!("{}: pull request creation failed ({status})", ErrorKind::ProviderApiFailed);
        }
        let pr: PrResponse = resp.json().await?;

        if !spec.labels.is_empty() {
            let labels = self
                .http
                .post(format!("{}/issues/{}/labels", self.repo_url(&slug), pr.number))
                .bearer_auth(token)
                .header("Accept", "application/vnd.github+json")
                .json(&serde_json::json!({ "labels": spec.labels }))
                .send()
                .await;
            if let Err(e) = labels {
                tracing::warn!(err = %e, "failed to apply pr labels");
            }
        }

        Ok(PullRequest { url: pr.html_url, number: pr.number })
    }

    async fn default_branch(&self, repo: &str, token: &str) -> anyhow::Result<String> {
        let slug = repo_slug(repo)?;
        let resp = self
            .http
            .get(self.repo_url(&slug))
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            anyhow::bail!("{}: repo lookup failed ({status})", ErrorKind::ProviderApiFailed);
        }
        let repo: RepoResponse = resp.json().await?;
        Ok(repo.default_branch)
    }

    async fn branch_exists(&self, repo: &str, branch: &str, token: &str) -> anyhow::Result<bool> {
        let slug = repo_slug(repo)?;
        let resp = self
            .http
            .get(format!("{}/branches/{branch}", self.repo_url(&slug)))
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;
        match resp.status() {
            status if status.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            status => {
                anyhow::bail!("{}: branch lookup failed ({status})", ErrorKind::ProviderApiFailed)
            }
        }
    }
}

#[cfg(test)]
#[path = "github_tests.rs"]
mod tests;

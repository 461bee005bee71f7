// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The credential broker: resolve, record, revoke.
//!
//! Resolution walks a fixed priority chain — user-provided credential,
//! cached token (refreshing when possible), registered provider adapter,
//! interactive device flow — and records every issued credential as a
//! grant for audit. Grants expire at `min(requested_ttl, max_ttl)`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ErrorKind;
use crate::events::{CredentialEvent, EventHub};
use crate::provider::{self, Provider, ProviderAdapter};
use crate::redact::secret_reference;

use super::device_code;
use super::oauth::{epoch_secs, OAuthToken};
use super::refresh::refresh_with_retries;
use super::store::TokenStore;
use super::{
    CredentialKind, CredentialRequest, Grant, GrantContext, GrantId, ResolvedCredential,
    UserCredential,
};

/// Device-flow and refresh endpoints for one OAuth app.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub device_auth_url: String,
    pub token_url: String,
    pub scope: String,
    /// Bound on the whole device-flow exchange.
    pub overall_timeout: Duration,
}

impl OAuthConfig {
    /// GitHub endpoints with the standard 15-minute exchange bound.
    pub fn github(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            device_auth_url: "https://github.com/login/device/code".to_owned(),
            token_url: "https://github.com/login/oauth/access_token".to_owned(),
            scope: "repo".to_owned(),
            overall_timeout: Duration::from_secs(15 * 60),
        }
    }
}

/// Broker tunables.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Hard cap on grant lifetime.
    pub max_ttl: Duration,
    /// Device flow configuration; absent disables the interactive tier.
    pub oauth: Option<OAuthConfig>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self { max_ttl: Duration::from_secs(3600), oauth: None }
    }
}

/// Resolves credentials and keeps the grant ledger.
pub struct CredentialBroker {
    config: BrokerConfig,
    grants: RwLock<HashMap<GrantId, Grant>>,
    store: Arc<dyn TokenStore>,
    providers: RwLock<HashMap<Provider, Arc<dyn ProviderAdapter>>>,
    events: EventHub,
    http: reqwest::Client,
}

impl CredentialBroker {
    pub fn new(config: BrokerConfig, store: Arc<dyn TokenStore>, events: EventHub) -> Arc<Self> {
        Arc::new(Self {
            config,
            grants: RwLock::new(HashMap::new()),
            store,
            providers: RwLock::new(HashMap::new()),
            events,
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        })
    }

    /// Register a provider adapter for tier three of the chain.
    pub async fn register_provider(&self, adapter: Arc<dyn ProviderAdapter>) {
        self.providers.write().await.insert(adapter.provider(), adapter);
    }

    // ── Resolution ──────────────────────────────────────────────────────

    /// Walk the priority chain for a request.
    ///
    /// Returns `Ok(None)` only for `optional` requests whose chain came up
    /// empty; otherwise exhaustion is a structured failure.
    pub async fn resolve(
        &self,
        request: &CredentialRequest,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Option<ResolvedCredential>> {
        let provider = provider::detect(&request.repo);

        // 1. User-provided credential.
        if let Some(ref user) = request.user_credential {
            debug!(provider = %provider, kind = %user.kind(), "using user-provided credential");
            let resolved = self
                .record_grant(request, provider, user.kind(), user.token().map(String::from))
                .await;
            return Ok(Some(resolved));
        }

        // 2. Cached token, refreshed when possible.
        if let Some(token) = self.cached_token(provider).await? {
            debug!(provider = %provider, "using cached oauth token");
            let resolved = self
                .record_grant(request, provider, CredentialKind::Oauth, Some(token.access_token))
                .await;
            return Ok(Some(resolved));
        }

        // 3. Registered provider adapter.
        let adapter = self.providers.read().await.get(&provider).cloned();
        if let Some(adapter) = adapter {
            match adapter.mint_token(&request.repo, &request.context).await {
                Ok(Some(minted)) => {
                    debug!(provider = %provider, "using provider-minted token");
                    let resolved = self
                        .record_grant(
                            request,
                            provider,
                            CredentialKind::GithubApp,
                            Some(minted.token),
                        )
                        .await;
                    return Ok(Some(resolved));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(provider = %provider, err = %e, "provider adapter mint failed");
                }
            }
        }

        // 4. Interactive device flow.
        if provider.supports_device_flow() {
            if let Some(oauth) = self.config.oauth.clone() {
                let token = self.device_flow(provider, &oauth, request, cancel).await?;
                let resolved = self
                    .record_grant(request, provider, CredentialKind::Oauth, Some(token))
                    .await;
                return Ok(Some(resolved));
            }
        }

        if request.optional {
            return Ok(None);
        }
        anyhow::bail!(
            "{}: no credentials available for {} ({provider})",
            ErrorKind::CredentialUnavailable,
            request.repo
        )
    }

    /// Tier two: the token store, with transparent refresh.
    async fn cached_token(&self, provider: Provider) -> anyhow::Result<Option<OAuthToken>> {
        let Some(token) = self.store.get(provider)? else {
            return Ok(None);
        };
        let now = epoch_secs();

        if !token.is_expired_at(now) && !token.needs_refresh_at(now) {
            return Ok(Some(token));
        }

        // Expired or aging: refresh when we can, otherwise skip the tier.
        let (Some(refresh_token), Some(oauth)) =
            (token.refresh_token.clone(), self.config.oauth.as_ref())
        else {
            if token.is_expired_at(now) {
                debug!(provider = %provider, "cached token expired and unrefreshable; skipping");
                return Ok(None);
            }
            return Ok(Some(token));
        };

        match refresh_with_retries(&self.http, &oauth.token_url, &oauth.client_id, &refresh_token, 2)
            .await
        {
            Ok(response) => {
                let mut refreshed = OAuthToken::from_response(&response, provider, epoch_secs());
                // Providers may omit the refresh token on rotation.
                if refreshed.refresh_token.is_none() {
                    refreshed.refresh_token = Some(refresh_token);
                }
                self.store.save(&refreshed)?;
                self.events.emit_credential(CredentialEvent::Refreshed { provider });
                info!(provider = %provider, "oauth token refreshed");
                Ok(Some(refreshed))
            }
            Err(e) => {
                warn!(provider = %provider, err = %e, "token refresh failed");
                if token.is_expired_at(now) {
                    Ok(None)
                } else {
                    Ok(Some(token))
                }
            }
        }
    }

    /// Tier four: RFC 8628 device flow, persisting the result.
    async fn device_flow(
        &self,
        provider: Provider,
        oauth: &OAuthConfig,
        request: &CredentialRequest,
        cancel: &CancellationToken,
    ) -> anyhow::Result<String> {
        let device = device_code::initiate_device_auth(
            &self.http,
            &oauth.device_auth_url,
            &oauth.client_id,
            &oauth.scope,
        )
        .await?;

        self.events.emit_credential(CredentialEvent::DeviceFlowPrompt {
            provider,
            verification_uri: device.verification_uri.clone(),
            user_code: device.user_code.clone(),
            permissions: request.access.permissions(),
            expires_in_secs: device.expires_in,
        });
        info!(provider = %provider, uri = %device.verification_uri, "device flow started");

        let response = device_code::poll_device_code(
            &self.http,
            &oauth.token_url,
            &oauth.client_id,
            &device,
            oauth.overall_timeout,
            cancel,
        )
        .await?;

        let token = OAuthToken::from_response(&response, provider, epoch_secs());
        self.store.save(&token)?;
        info!(provider = %provider, "device flow completed, token cached");
        Ok(token.access_token)
    }

    // ── Grant ledger ────────────────────────────────────────────────────

    async fn record_grant(
        &self,
        request: &CredentialRequest,
        provider: Provider,
        kind: CredentialKind,
        secret: Option<String>,
    ) -> ResolvedCredential {
        let now = SystemTime::now();
        let ttl = request.ttl.unwrap_or(self.config.max_ttl).min(self.config.max_ttl);
        let grant = Grant {
            id: GrantId::generate(),
            kind,
            secret_ref: secret
                .as_deref()
                .map(|s| secret_reference(kind.as_str(), s))
                .unwrap_or_else(|| format!("{kind}:agent")),
            repo: request.repo.clone(),
            provider,
            context: request.context.clone(),
            permissions: request.access.permissions(),
            created_at: now,
            expires_at: now + ttl,
            revoked_at: None,
        };
        let id = grant.id.clone();
        let expires_at = grant.expires_at;

        self.grants.write().await.insert(id.clone(), grant);
        self.events.emit_credential(CredentialEvent::Granted {
            grant: id.clone(),
            provider,
            kind,
        });
        info!(grant = %id, provider = %provider, kind = %kind, "credential granted");

        ResolvedCredential { grant: id, kind, secret, provider, expires_at }
    }

    /// Whether a grant is currently valid.
    pub async fn is_valid(&self, id: &GrantId) -> bool {
        let grants = self.grants.read().await;
        grants.get(id).is_some_and(|grant| grant.is_valid_at(SystemTime::now()))
    }

    pub async fn get_grant(&self, id: &GrantId) -> Option<Grant> {
        self.grants.read().await.get(id).cloned()
    }

    pub async fn list_grants(&self) -> Vec<Grant> {
        self.grants.read().await.values().cloned().collect()
    }

    pub async fn grants_for_execution(&self, execution_id: &str) -> Vec<Grant> {
        self.grants
            .read()
            .await
            .values()
            .filter(|grant| grant.context.execution_id == execution_id)
            .cloned()
            .collect()
    }

    /// Revoke a grant. Idempotent; unknown ids are ignored.
    pub async fn revoke(&self, id: &GrantId) {
        let mut grants = self.grants.write().await;
        if let Some(grant) = grants.get_mut(id) {
            if grant.revoked_at.is_none() {
                grant.revoked_at = Some(SystemTime::now());
                drop(grants);
                self.events.emit_credential(CredentialEvent::Revoked { grant: id.clone() });
                info!(grant = %id, "grant revoked");
            }
        }
    }

    /// Revoke every grant issued to an execution.
    pub async fn revoke_for_execution(&self, execution_id: &str) -> usize {
        let ids: Vec<GrantId> = self
            .grants
            .read()
            .await
            .values()
            .filter(|grant| {
                grant.context.execution_id == execution_id && grant.revoked_at.is_none()
            })
            .map(|grant| grant.id.clone())
            .collect();
        for id in &ids {
            self.revoke(id).await;
        }
        ids.len()
    }
}

/// Convenience constructor for a resolve call scoped to one execution.
pub fn request_for(
    repo: impl Into<String>,
    context: GrantContext,
    user_credential: Option<UserCredential>,
) -> CredentialRequest {
    CredentialRequest {
        repo: repo.into(),
        context,
        user_credential,
        ..CredentialRequest::default()
    }
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OAuth 2.0 Device Authorization Grant (RFC 8628).
//!
//! The poll loop is generic over the token request so its timing behavior
//! (`slow_down` adds five seconds, expiry and denial fail fast) is
//! testable without a network.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::ErrorKind;

use super::oauth::{DeviceCodeResponse, TokenResponse};

/// Seconds added to the poll interval on `slow_down`.
pub const SLOW_DOWN_INCREMENT_SECS: u64 = 5;

/// One poll of the token endpoint.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Token(TokenResponse),
    AuthorizationPending,
    SlowDown,
    ExpiredToken,
    AccessDenied,
    Failed(String),
}

/// Initiate device authorization by POSTing to the device auth endpoint.
pub async fn initiate_device_auth(
    client: &reqwest::Client,
    device_auth_url: &str,
    client_id: &str,
    scope: &str,
) -> anyhow::Result<DeviceCodeResponse> {
    let resp = client
        .post(device_auth_url)
        .header("Accept", "application/json")
        .form(&[("client_id", client_id), ("scope", scope)])
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        anyhow::bail!("device authorization failed ({status}): {text}");
    }

    let device: DeviceCodeResponse = resp.json().await?;
    Ok(device)
}

/// Poll the token endpoint over HTTP until the user completes (or fails)
/// the authorization.
pub async fn poll_device_code(
    client: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    device: &DeviceCodeResponse,
    overall_timeout: Duration,
    cancel: &CancellationToken,
) -> anyhow::Result<TokenResponse> {
    let deadline = overall_timeout.min(Duration::from_secs(device.expires_in.max(1)));
    poll_loop(
        || poll_once(client, token_url, client_id, &device.device_code),
        device.interval,
        deadline,
        cancel,
    )
    .await
}

/// One POST to the token endpoint, classified.
async fn poll_once(
    client: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    device_code: &str,
) -> PollOutcome {
    let resp = client
        .post(token_url)
        .header("Accept", "application/json")
        .form(&[
            ("grant_type", "urn:ietf:params:oauth:grant-type:device_code"),
            ("client_id", client_id),
            ("device_code", device_code),
        ])
        .send()
        .await;

    let resp = match resp {
        Ok(resp) => resp,
        Err(e) => return PollOutcome::Failed(e.to_string()),
    };

    let text = match resp.text().await {
        Ok(text) => text,
        Err(e) => return PollOutcome::Failed(e.to_string()),
    };

    classify_response(&text)
}

/// Classify a token endpoint body. Providers return the RFC error codes
/// in a JSON `error` field; a successful body parses as a token.
pub fn classify_response(body: &str) -> PollOutcome {
    if let Ok(token) = serde_json::from_str::<TokenResponse>(body) {
        if !token.access_token.is_empty() {
            return PollOutcome::Token(token);
        }
    }
    let error = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| body.to_owned());
    match error.as_str() {
        "authorization_pending" => PollOutcome::AuthorizationPending,
        "slow_down" => PollOutcome::SlowDown,
        "expired_token" => PollOutcome::ExpiredToken,
        "access_denied" => PollOutcome::AccessDenied,
        other => PollOutcome::Failed(other.to_owned()),
    }
}

/// The RFC 8628 poll loop: sleep `interval`, poll, react.
///
/// `slow_down` adds [`SLOW_DOWN_INCREMENT_SECS`] to the interval;
/// `expired_token` fails as [`ErrorKind::OauthTimeout`]; `access_denied`
/// fails as [`ErrorKind::OauthDenied`]. The deadline bounds the whole
/// exchange.
pub async fn poll_loop<F, Fut>(
    mut poll: F,
    interval_secs: u64,
    deadline: Duration,
    cancel: &CancellationToken,
) -> anyhow::Result<TokenResponse>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PollOutcome>,
{
    let mut interval = Duration::from_secs(interval_secs.max(1));
    let deadline = tokio::time::Instant::now() + deadline;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                anyhow::bail!("{}: device flow cancelled", ErrorKind::OauthTimeout);
            }
            _ = tokio::time::sleep(interval) => {}
        }

        if tokio::time::Instant::now() >= deadline {
            anyhow::bail!("{}: code expired before authorization completed", ErrorKind::OauthTimeout);
        }

        match poll().await {
            PollOutcome::Token(token) => return Ok(token),
            PollOutcome::AuthorizationPending => continue,
            PollOutcome::SlowDown => {
                interval += Duration::from_secs(SLOW_DOWN_INCREMENT_SECS);
                continue;
            }
            PollOutcome::ExpiredToken => {
                anyhow::bail!("{}: code expired", ErrorKind::OauthTimeout);
            }
            PollOutcome::AccessDenied => {
                anyhow::bail!("{}: user denied the authorization", ErrorKind::OauthDenied);
            }
            PollOutcome::Failed(detail) => {
                anyhow::bail!("device code token request failed: {detail}");
            }
        }
    }
}

#[cfg(test)]
#[path = "device_code_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end device flow against the in-process OAuth provider:
//! `slow_down` stretches the poll interval, success caches the token.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use parallax_workspace::credential::store::{MemoryTokenStore, TokenStore};
use parallax_workspace::credential::{
    BrokerConfig, CredentialBroker, CredentialKind, CredentialRequest, GrantContext, OAuthConfig,
};
use parallax_workspace::events::{CredentialEvent, EventHub};
use parallax_workspace::Provider;

use parallax_specs::{ensure_crypto, start_mock_oauth};

fn broker_with(
    store: Arc<MemoryTokenStore>,
    oauth: OAuthConfig,
    events: EventHub,
) -> Arc<CredentialBroker> {
    CredentialBroker::new(
        BrokerConfig { max_ttl: Duration::from_secs(3600), oauth: Some(oauth) },
        store,
        events,
    )
}

fn github_request() -> CredentialRequest {
    CredentialRequest {
        repo: "https://github.com/org/repo.git".to_owned(),
        context: GrantContext::for_execution("exec-oauth"),
        ..CredentialRequest::default()
    }
}

// ── Scenario 5: device flow with slow_down ──────────────────────────────

#[tokio::test]
async fn device_flow_slows_down_then_succeeds_and_caches() {
    ensure_crypto();
    // One slow_down at initial interval 1s: the second poll must come at
    // least interval + 5s after the first.
    let mock = start_mock_oauth(vec!["slow_down"], 1).await;
    let store = Arc::new(MemoryTokenStore::new());
    let events = EventHub::default();
    let mut credential_events = events.subscribe_credential();

    let broker = broker_with(
        Arc::clone(&store),
        OAuthConfig {
            client_id: "C".to_owned(),
            device_auth_url: mock.device_auth_url.clone(),
            token_url: mock.token_url.clone(),
            scope: "repo".to_owned(),
            overall_timeout: Duration::from_secs(60),
        },
        events,
    );

    let resolved = broker
        .resolve(&github_request(), &CancellationToken::new())
        .await
        .unwrap()
        .expect("device flow resolves a credential");

    assert_eq!(resolved.kind, CredentialKind::Oauth);
    assert_eq!(resolved.secret.as_deref(), Some("gho_mock_token"));

    // slow_down stretched the interval by five seconds.
    let polls = mock.polls();
    assert_eq!(polls.len(), 2);
    let gap = polls[1] - polls[0];
    assert!(gap >= Duration::from_secs(6), "second poll too early: {gap:?}");

    // The token (with its refresh token) was persisted to the store.
    let cached = store.get(Provider::Github).unwrap().expect("token cached");
    assert_eq!(cached.access_token, "gho_mock_token");
    assert_eq!(cached.refresh_token.as_deref(), Some("ghr_mock_refresh"));

    // The user-facing prompt event carried the verification details.
    let mut saw_prompt = false;
    while let Ok(event) = credential_events.try_recv() {
        if let CredentialEvent::DeviceFlowPrompt { verification_uri, user_code, .. } = event {
            assert_eq!(user_code, "ABCD-1234");
            assert!(verification_uri.contains("activate"));
            saw_prompt = true;
        }
    }
    assert!(saw_prompt);
}

#[tokio::test]
async fn device_flow_denial_is_structured() {
    ensure_crypto();
    let mock = start_mock_oauth(vec!["access_denied"], 1).await;
    let broker = broker_with(
        Arc::new(MemoryTokenStore::new()),
        OAuthConfig {
            client_id: "C".to_owned(),
            device_auth_url: mock.device_auth_url.clone(),
            token_url: mock.token_url.clone(),
            scope: "repo".to_owned(),
            overall_timeout: Duration::from_secs(60),
        },
        EventHub::default(),
    );

    let err = broker
        .resolve(&github_request(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("oauth_denied"), "got: {err:#}");
}

#[tokio::test]
async fn cached_token_short_circuits_the_device_flow() {
    ensure_crypto();
    let mock = start_mock_oauth(vec![], 1).await;
    let store = Arc::new(MemoryTokenStore::new());
    store
        .save(&parallax_workspace::credential::OAuthToken {
            access_token: "gho_already_here".to_owned(),
            token_type: "bearer".to_owned(),
            scopes: vec![],
            expires_at: None,
            refresh_token: None,
            provider: Provider::Github,
            created_at: 0,
        })
        .unwrap();

    let broker = broker_with(
        Arc::clone(&store),
        OAuthConfig {
            client_id: "C".to_owned(),
            device_auth_url: mock.device_auth_url.clone(),
            token_url: mock.token_url.clone(),
            scope: "repo".to_owned(),
            overall_timeout: Duration::from_secs(60),
        },
        EventHub::default(),
    );

    let resolved = broker
        .resolve(&github_request(), &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resolved.secret.as_deref(), Some("gho_already_here"));
    assert!(mock.polls().is_empty(), "no network traffic for a fresh cached token");
}

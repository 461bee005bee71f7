// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for the end-to-end scenarios.
//!
//! Shell scripts play the assistants, local bare repositories play the
//! hosting provider, and an in-process axum server plays the OAuth
//! endpoints.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Once};
use std::time::Duration;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use tokio::time::Instant;

use parallax::session::{SessionHandle, SessionState};

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times — only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

// ── Git fixtures ────────────────────────────────────────────────────────

/// Run a shell command in `dir`, asserting success.
pub fn sh(dir: &Path, cmd: &str) {
    let status = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .status()
        .unwrap();
    assert!(status.success(), "command failed: {cmd}");
}

/// Run a shell command in `dir` and return trimmed stdout.
pub fn sh_stdout(dir: &Path, cmd: &str) -> String {
    let output = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .unwrap();
    String::from_utf8_lossy(&output.stdout).trim().to_owned()
}

/// Bare repo with one commit on `main`. Returns its `file://` URL.
pub fn fixture_repo(dir: &Path) -> String {
    sh(dir, "git init --bare -b main bare.git");
    sh(dir, "git clone bare.git seed 2>/dev/null");
    let seed = dir.join("seed");
    sh(&seed, "git config user.name fixture && git config user.email fixture@test.invalid");
    sh(&seed, "echo hello > README.md && git add . && git commit -q -m init");
    sh(&seed, "git push -q origin main");
    format!("file://{}", dir.join("bare.git").display())
}

/// Path of the fixture's bare repository.
pub fn bare_path(dir: &Path) -> PathBuf {
    dir.join("bare.git")
}

// ── Session helpers ─────────────────────────────────────────────────────

/// Poll until the session reaches `state` or the timeout elapses.
pub async fn wait_for_state(
    handle: &Arc<SessionHandle>,
    state: SessionState,
    timeout: Duration,
) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if handle.state() == state {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

/// Poll until `predicate` over the buffered output holds.
pub async fn wait_for_output(
    handle: &Arc<SessionHandle>,
    timeout: Duration,
    predicate: impl Fn(&str) -> bool,
) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate(&handle.buffered_output()) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

// ── Mock OAuth provider ─────────────────────────────────────────────────

/// Scripted responses for the token endpoint, consumed in order; once
/// the script is empty every poll succeeds.
#[derive(Clone)]
struct OauthState {
    script: Arc<Mutex<VecDeque<&'static str>>>,
    polls: Arc<Mutex<Vec<Instant>>>,
    interval: u64,
}

/// A running in-process OAuth provider.
pub struct MockOauth {
    pub device_auth_url: String,
    pub token_url: String,
    polls: Arc<Mutex<Vec<Instant>>>,
}

impl MockOauth {
    /// Poll instants recorded by the token endpoint.
    pub fn polls(&self) -> Vec<Instant> {
        self.polls.lock().clone()
    }
}

/// Start the mock with scripted token responses (`"slow_down"`,
/// `"authorization_pending"`, `"expired_token"`, `"access_denied"`) and
/// the advertised initial poll interval.
pub async fn start_mock_oauth(script: Vec<&'static str>, interval: u64) -> MockOauth {
    let state = OauthState {
        script: Arc::new(Mutex::new(script.into())),
        polls: Arc::new(Mutex::new(Vec::new())),
        interval,
    };
    let polls = Arc::clone(&state.polls);

    let app = Router::new()
        .route("/device/code", post(device_code))
        .route("/token", post(token))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockOauth {
        device_auth_url: format!("http://{addr}/device/code"),
        token_url: format!("http://{addr}/token"),
        polls,
    }
}

async fn device_code(State(state): State<OauthState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "device_code": "dev-code-1",
        "user_code": "ABCD-1234",
        "verification_uri": "https://example.invalid/activate",
        "expires_in": 900,
        "interval": state.interval,
    }))
}

async fn token(State(state): State<OauthState>) -> Json<serde_json::Value> {
    state.polls.lock().push(Instant::now());
    match state.script.lock().pop_front() {
        Some(error) => Json(serde_json::json!({ "error": error })),
        None => Json(serde_json::json!({
            "access_token": "gho_mock_token",
            "token_type": "bearer",
            "refresh_token": "ghr_mock_refresh",
            "expires_in": 28800,
            "scope": "repo",
        })),
    }
}

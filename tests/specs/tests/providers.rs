// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider adapter behavior against an in-process GitHub API stand-in:
//! pull request creation, default-branch lookup, and branch probes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;

use parallax_workspace::credential::GrantContext;
use parallax_workspace::model::PrSpec;
use parallax_workspace::provider::github::GithubAdapter;
use parallax_workspace::provider::ProviderAdapter;

use parallax_specs::ensure_crypto;

#[derive(Clone, Default)]
struct ApiState {
    pr_bodies: Arc<Mutex<Vec<serde_json::Value>>>,
    label_bodies: Arc<Mutex<Vec<serde_json::Value>>>,
    auth_headers: Arc<Mutex<Vec<String>>>,
}

async fn create_pr(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    if let Some(auth) = headers.get("authorization") {
        state.auth_headers.lock().push(auth.to_str().unwrap_or("").to_owned());
    }
    state.pr_bodies.lock().push(body);
    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "html_url": "https://github.com/org/repo/pull/7",
            "number": 7,
        })),
    )
}

async fn add_labels(
    State(state): State<ApiState>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    state.label_bodies.lock().push(body);
    Json(serde_json::json!([]))
}

async fn repo_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "default_branch": "develop" }))
}

async fn branch_info(Path((_, _, branch)): Path<(String, String, String)>) -> StatusCode {
    if branch == "exists" {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn start_api(state: ApiState) -> String {
    let app = Router::new()
        .route("/repos/{owner}/{repo}/pulls", post(create_pr))
        .route("/repos/{owner}/{repo}/issues/{number}/labels", post(add_labels))
        .route("/repos/{owner}/{repo}", get(repo_info))
        .route("/repos/{owner}/{repo}/branches/{branch}", get(branch_info))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn create_pull_request_sends_spec_and_token() {
    ensure_crypto();
    let state = ApiState::default();
    let base = start_api(state.clone()).await;
    let adapter = GithubAdapter::with_api_base(base, None);

    let pr = adapter
        .create_pull_request(
            "https://github.com/org/repo.git",
            "parallax/exec-1/builder",
            "main",
            &PrSpec {
                title: "Add parser".to_owned(),
                body: "Generated by an execution".to_owned(),
                draft: true,
                labels: vec!["automated".to_owned()],
            },
            "ghs_pr_token",
        )
        .await
        .unwrap();

    assert_eq!(pr.number, 7);
    assert_eq!(pr.url, "https://github.com/org/repo/pull/7");

    let bodies = state.pr_bodies.lock();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["title"], "Add parser");
    assert_eq!(bodies[0]["head"], "parallax/exec-1/builder");
    assert_eq!(bodies[0]["base"], "main");
    assert_eq!(bodies[0]["draft"], true);

    let labels = state.label_bodies.lock();
    assert_eq!(labels.len(), 1);
    assert_eq!(labels[0]["labels"][0], "automated");

    let auth = state.auth_headers.lock();
    assert!(auth[0].contains("ghs_pr_token"));
}

#[tokio::test]
async fn default_branch_and_branch_probes() {
    ensure_crypto();
    let base = start_api(ApiState::default()).await;
    let adapter = GithubAdapter::with_api_base(base, None);

    let branch =
        adapter.default_branch("https://github.com/org/repo.git", "tok").await.unwrap();
    assert_eq!(branch, "develop");

    assert!(adapter
        .branch_exists("https://github.com/org/repo.git", "exists", "tok")
        .await
        .unwrap());
    assert!(!adapter
        .branch_exists("https://github.com/org/repo.git", "missing", "tok")
        .await
        .unwrap());
}

#[tokio::test]
async fn mint_is_pass_through_configuration() {
    let adapter = GithubAdapter::new(Some("ghs_installation".to_owned()));
    let minted = adapter
        .mint_token("https://github.com/org/repo.git", &GrantContext::for_execution("e"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(minted.token, "ghs_installation");
}

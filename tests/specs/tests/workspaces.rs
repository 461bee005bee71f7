// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end workspace scenarios: worktree cascade cleanup and the
//! unauthenticated-clone fallback, against real local repositories.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use parallax_workspace::credential::store::MemoryTokenStore;
use parallax_workspace::credential::{BrokerConfig, CredentialBroker};
use parallax_workspace::events::EventHub;
use parallax_workspace::model::{ExecutionRef, ProvisionRequest, Strategy, TaskRef};
use parallax_workspace::{
    FinalizeRequest, WorkspaceConfig, WorkspaceService, WorkspaceStatus,
};

use parallax_specs::{bare_path, fixture_repo, sh_stdout};

fn service(base: &Path) -> Arc<WorkspaceService> {
    let events = EventHub::default();
    let broker = CredentialBroker::new(
        BrokerConfig::default(),
        Arc::new(MemoryTokenStore::new()),
        events.clone(),
    );
    WorkspaceService::new(
        WorkspaceConfig::default().with_base_dir(base.join("workspaces")),
        broker,
        events,
    )
    .unwrap()
}

fn request(repo: &str, role: &str) -> ProvisionRequest {
    ProvisionRequest {
        repo: repo.to_owned(),
        base_branch: "main".to_owned(),
        execution: ExecutionRef { id: "exec-e2e".to_owned(), pattern_name: None },
        task: TaskRef { id: format!("task-{role}"), role: role.to_owned(), slug: None },
        ..ProvisionRequest::default()
    }
}

// ── Scenario 4: worktree cascade cleanup ────────────────────────────────

#[tokio::test]
async fn worktree_cascade_cleanup_leaves_no_trace() {
    let dir = tempfile::tempdir().unwrap();
    let repo = fixture_repo(dir.path());
    let service = service(dir.path());
    let cancel = CancellationToken::new();

    let clone_ws = service.provision(request(&repo, "builder"), &cancel).await.unwrap();

    let mut worktree_ids = Vec::new();
    for role in ["alpha", "beta"] {
        let mut req = request(&repo, role);
        req.strategy = Some(Strategy::Worktree);
        req.parent_workspace = Some(clone_ws.id.clone());
        let ws = service.provision(req, &cancel).await.unwrap();
        assert_eq!(ws.status, WorkspaceStatus::Ready);
        worktree_ids.push(ws.id);
    }

    let parent_dir = clone_ws.path.clone();
    service.cleanup(&clone_ws.id, &cancel).await.unwrap();

    // Worktrees cleaned before (and as part of) the clone, all terminal.
    for id in worktree_ids.iter().chain([&clone_ws.id]) {
        let ws = service.get(id).await.unwrap();
        assert_eq!(ws.status, WorkspaceStatus::CleanedUp);
        assert!(!ws.path.exists(), "{} must be removed", ws.path.display());
    }
    assert!(!parent_dir.exists(), "parent directory of the clone is gone");

    // A fresh clone of the repo knows only its own worktree entry.
    let probe = dir.path().join("probe");
    parallax_specs::sh(
        dir.path(),
        &format!("git clone -q {} {}", bare_path(dir.path()).display(), probe.display()),
    );
    let worktrees = sh_stdout(&probe, "git worktree list");
    assert_eq!(worktrees.lines().count(), 1, "got: {worktrees}");
}

// ── Scenario 6: unauthenticated fallback ────────────────────────────────

#[tokio::test]
async fn public_repo_clones_without_credentials_and_push_refuses() {
    let dir = tempfile::tempdir().unwrap();
    let repo = fixture_repo(dir.path());
    let service = service(dir.path());
    let cancel = CancellationToken::new();

    // No user credentials, no provider registered: the initial clone
    // succeeds unauthenticated.
    let ws = service.provision(request(&repo, "builder"), &cancel).await.unwrap();
    assert_eq!(ws.status, WorkspaceStatus::Ready);
    assert!(ws.credential.is_none(), "no credential may be attached");
    assert!(service.broker().list_grants().await.is_empty(), "no grant was issued");

    // Finalize with push fails structurally and leaves the workspace
    // usable.
    let err = service
        .finalize(
            &ws.id,
            FinalizeRequest { push: true, ..FinalizeRequest::default() },
            &cancel,
        )
        .await
        .unwrap_err();
    assert!(
        format!("{err:#}").contains("push_requires_authentication"),
        "got: {err:#}"
    );
    assert_eq!(service.get(&ws.id).await.unwrap().status, WorkspaceStatus::Ready);
}

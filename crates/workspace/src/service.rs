// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The workspace service: provision, finalize, clean up.
//!
//! Provisioning walks initializing → cloning → creating_branch →
//! configuring → ready, emitting a progress event per phase. Clones try
//! an unauthenticated shallow clone first and retry exactly once with
//! credentials on an auth-class failure. Cleanup cascades clone →
//! worktrees (in registration order) and is idempotent.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::Context;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::branch;
use crate::config::WorkspaceConfig;
use crate::credential::{
    CredentialBroker, CredentialRequest, GrantContext, ResolvedCredential, UserCredential,
};
use crate::error::ErrorKind;
use crate::events::{EventHub, WorkspaceEvent};
use crate::git::{authenticated_url, is_auth_failure, GitRunner};
use crate::helper::{self, CredentialContext};
use crate::hook;
use crate::model::{
    BranchInfo, BranchStrategy, FinalizeOutcome, FinalizeRequest, Phase, ProvisionRequest,
    Strategy, Workspace, WorkspaceId, WorkspaceStatus,
};
use crate::provider::{Provider, ProviderAdapter};
use crate::redact::Redactor;

/// Provisions and tracks Git workspaces for executions.
pub struct WorkspaceService {
    config: WorkspaceConfig,
    broker: Arc<CredentialBroker>,
    git: GitRunner,
    events: EventHub,
    redactor: Redactor,
    http: reqwest::Client,
    workspaces: RwLock<HashMap<WorkspaceId, Workspace>>,
    /// Live tokens for push/PR, keyed by workspace. In-memory only.
    secrets: RwLock<HashMap<WorkspaceId, String>>,
    providers: RwLock<HashMap<Provider, Arc<dyn ProviderAdapter>>>,
}

impl WorkspaceService {
    pub fn new(
        config: WorkspaceConfig,
        broker: Arc<CredentialBroker>,
        events: EventHub,
    ) -> anyhow::Result<Arc<Self>> {
        Ok(Arc::new(Self {
            config,
            broker,
            git: GitRunner::new()?,
            events,
            redactor: Redactor::new()?,
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            workspaces: RwLock::new(HashMap::new()),
            secrets: RwLock::new(HashMap::new()),
            providers: RwLock::new(HashMap::new()),
        }))
    }

    /// Register a provider adapter for PR creation (and token minting via
    /// the broker).
    pub async fn register_provider(&self, adapter: Arc<dyn ProviderAdapter>) {
        self.broker.register_provider(Arc::clone(&adapter)).await;
        self.providers.write().await.insert(adapter.provider(), adapter);
    }

    pub fn events(&self) -> &EventHub {
        &self.events
    }

    pub fn broker(&self) -> &Arc<CredentialBroker> {
        &self.broker
    }

    // ── Lookup ──────────────────────────────────────────────────────────

    pub async fn get(&self, id: &WorkspaceId) -> Option<Workspace> {
        self.workspaces.read().await.get(id).cloned()
    }

    pub async fn list(&self) -> Vec<Workspace> {
        self.workspaces.read().await.values().cloned().collect()
    }

    pub async fn find_by_execution(&self, execution_id: &str) -> Vec<Workspace> {
        self.workspaces
            .read()
            .await
            .values()
            .filter(|ws| ws.branch.execution_id == execution_id)
            .cloned()
            .collect()
    }

    /// Mark a ready workspace as occupied by a session.
    pub async fn mark_in_use(&self, id: &WorkspaceId) -> anyhow::Result<()> {
        let mut workspaces = self.workspaces.write().await;
        let ws = workspaces.get_mut(id).with_context(|| {
            format!("{}: unknown workspace {id}", ErrorKind::WorkspacePreconditionViolated)
        })?;
        anyhow::ensure!(
            ws.status == WorkspaceStatus::Ready,
            "{}: workspace is {}",
            ErrorKind::WorkspacePreconditionViolated,
            ws.status
        );
        ws.status = WorkspaceStatus::InUse;
        Ok(())
    }

    // ── Provision ───────────────────────────────────────────────────────

    /// Provision a workspace. On failure (or cancellation) partial state
    /// is removed: the created directory, the partly-issued grant, and
    /// any parent linkage.
    pub async fn provision(
        self: &Arc<Self>,
        request: ProvisionRequest,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Workspace> {
        let strategy = request.strategy();
        let id = WorkspaceId::generate();

        // Worktree preconditions are checked before anything touches disk.
        let parent = match strategy {
            Strategy::Worktree => Some(self.validate_worktree_parent(&request).await?),
            Strategy::Clone => None,
        };

        // Direct strategy works on the base branch itself; worktrees
        // always get their own branch (git refuses to check out a branch
        // twice).
        let branch_name = if request.branch_strategy == BranchStrategy::Direct
            && strategy == Strategy::Clone
        {
            request.base_branch.clone()
        } else {
            branch::branch_name(
                &self.config.branch_prefix,
                &request.execution.id,
                &request.task.role,
                request.task.slug.as_deref(),
            )
        };
        let path = self.config.base_dir.join(id.as_str());

        let workspace = Workspace {
            id: id.clone(),
            path: path.clone(),
            repo: request.repo.clone(),
            branch: BranchInfo {
                name: branch_name,
                base: request.base_branch.clone(),
                execution_id: request.execution.id.clone(),
                created_at: SystemTime::now(),
            },
            credential: None,
            provisioned_at: SystemTime::now(),
            status: WorkspaceStatus::Provisioning,
            strategy,
            parent: parent.as_ref().map(|p| p.id.clone()),
            children: Default::default(),
            phase: Phase::Initializing,
            on_complete: request.on_complete.clone(),
        };
        self.workspaces.write().await.insert(id.clone(), workspace);
        self.set_phase(&id, Phase::Initializing).await;

        match self.provision_inner(&id, &request, parent, cancel).await {
            Ok(()) => {
                let workspace = self.finish_status(&id, WorkspaceStatus::Ready, Phase::Ready).await;
                if let Some(ref ws) = workspace {
                    self.events.emit_workspace(WorkspaceEvent::Ready {
                        workspace: id.clone(),
                        path: ws.path.display().to_string(),
                        branch: ws.branch.name.clone(),
                    });
                    self.run_completion_hook(ws).await;
                    info!(workspace = %id, path = %ws.path.display(), "workspace ready");
                }
                workspace.context("workspace vanished during provisioning")
            }
            Err(e) => {
                let message = self.redactor.redact(&format!("{e:#}"));
                warn!(workspace = %id, err = %message, "provisioning failed");
                self.cleanup_partial(&id).await;
                let workspace =
                    self.finish_status(&id, WorkspaceStatus::Error, Phase::Error).await;
                self.events.emit_workspace(WorkspaceEvent::Error {
                    workspace: id.clone(),
                    message: message.clone(),
                });
                if let Some(ref ws) = workspace {
                    self.run_completion_hook(ws).await;
                }
                Err(e)
            }
        }
    }

    async fn validate_worktree_parent(
        &self,
        request: &ProvisionRequest,
    ) -> anyhow::Result<Workspace> {
        let parent_id = request.parent_workspace.as_ref().with_context(|| {
            format!("{}: worktree requires a parent workspace", ErrorKind::WorkspacePreconditionViolated)
        })?;
        let parent = self.get(parent_id).await.with_context(|| {
            format!("{}: parent workspace not found", ErrorKind::WorkspacePreconditionViolated)
        })?;
        anyhow::ensure!(
            parent.strategy == Strategy::Clone,
            "{}: worktree parent must be a clone",
            ErrorKind::WorkspacePreconditionViolated
        );
        anyhow::ensure!(
            parent.repo == request.repo,
            "{}: worktree repo must match its parent",
            ErrorKind::WorkspacePreconditionViolated
        );
        anyhow::ensure!(
            !parent.status.is_terminal(),
            "{}: worktree parent already cleaned up",
            ErrorKind::WorkspacePreconditionViolated
        );
        Ok(parent)
    }

    async fn provision_inner(
        &self,
        id: &WorkspaceId,
        request: &ProvisionRequest,
        parent: Option<Workspace>,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.config.base_dir)
            .with_context(|| format!("create {}", self.config.base_dir.display()))?;

        let (path, branch_name, base_branch) = {
            let workspaces = self.workspaces.read().await;
            let ws = workspaces.get(id).context("workspace vanished")?;
            (ws.path.clone(), ws.branch.name.clone(), ws.branch.base.clone())
        };

        self.set_phase(id, Phase::Cloning).await;
        let credential = match parent {
            None => {
                self.clone_repo(id, request, &path, &base_branch, cancel).await?
            }
            Some(ref parent_ws) => {
                // Worktrees share the parent's credential reference.
                self.add_worktree(parent_ws, &path, &branch_name, &base_branch, cancel).await?;
                let secret = self.secrets.read().await.get(&parent_ws.id).cloned();
                if let Some(secret) = secret {
                    self.secrets.write().await.insert(id.clone(), secret);
                }
                parent_ws.credential.clone().map(|grant| (grant, None))
            }
        };

        if let Some((grant, secret)) = credential {
            let mut workspaces = self.workspaces.write().await;
            if let Some(ws) = workspaces.get_mut(id) {
                ws.credential = Some(grant);
            }
            drop(workspaces);
            if let Some(secret) = secret {
                self.secrets.write().await.insert(id.clone(), secret);
            }
        }

        self.set_phase(id, Phase::CreatingBranch).await;
        if request.strategy() == Strategy::Clone && branch_name != base_branch {
            self.git
                .run(Some(&path), &["checkout", "-b", &branch_name], cancel)
                .await
                .context("branch creation failed")?;
        }

        self.set_phase(id, Phase::Configuring).await;
        self.configure(id, request, &path, cancel).await?;

        // Link into the parent after everything else succeeded.
        if let Some(parent_id) = self.workspaces.read().await.get(id).and_then(|ws| ws.parent.clone())
        {
            let mut workspaces = self.workspaces.write().await;
            if let Some(parent_ws) = workspaces.get_mut(&parent_id) {
                parent_ws.children.insert(id.clone());
            }
        }

        Ok(())
    }

    /// Clone with the unauthenticated-first policy. Returns the grant and
    /// live secret when credentials ended up being used.
    async fn clone_repo(
        &self,
        id: &WorkspaceId,
        request: &ProvisionRequest,
        path: &Path,
        base_branch: &str,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Option<(crate::credential::GrantId, Option<String>)>> {
        // Credentials supplied up front skip the unauthenticated attempt.
        if let Some(ref user) = request.user_credentials {
            let resolved = self
                .resolve_credential(request, Some(user.clone()), cancel)
                .await?
                .context("credential resolution returned nothing for a user credential")?;
            let url = credential_url(&request.repo, &resolved);
            self.run_clone(&url, base_branch, path, cancel)
                .await
                .context("authenticated clone failed")?;
            return Ok(Some((resolved.grant, resolved.secret)));
        }

        // Unauthenticated shallow clone first.
        match self.run_clone(&request.repo, base_branch, path, cancel).await {
            Ok(()) => {
                debug!(workspace = %id, "unauthenticated clone succeeded");
                Ok(None)
            }
            Err(e) if is_auth_failure(&format!("{e:#}")) => {
                debug!(workspace = %id, "clone needs credentials, retrying once");
                let resolved = self
                    .resolve_credential(request, None, cancel)
                    .await?
                    .with_context(|| {
                        format!("{}: clone requires credentials", ErrorKind::CredentialUnavailable)
                    })?;
                let url = credential_url(&request.repo, &resolved);
                self.run_clone(&url, base_branch, path, cancel)
                    .await
                    .context("authenticated clone failed")?;
                Ok(Some((resolved.grant, resolved.secret)))
            }
            // Non-auth failures (network, not-found) propagate immediately.
            Err(e) => Err(e),
        }
    }

    async fn run_clone(
        &self,
        url: &str,
        base_branch: &str,
        path: &Path,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let path_str = path.display().to_string();
        self.git
            .run(
                None,
                &["clone", "--depth", "1", "--branch", base_branch, url, &path_str],
                cancel,
            )
            .await
            .map(|_| ())
    }

    async fn add_worktree(
        &self,
        parent: &Workspace,
        path: &Path,
        branch_name: &str,
        base_branch: &str,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        // Freshen the base ref; an already-fresh or offline fetch is fine.
        if let Err(e) = self
            .git
            .run(Some(&parent.path), &["fetch", "origin", base_branch], cancel)
            .await
        {
            debug!(err = %e, "fetch before worktree add failed; continuing");
        }

        let path_str = path.display().to_string();
        let origin_ref = format!("origin/{base_branch}");
        self.git
            .run(
                Some(&parent.path),
                &["worktree", "add", "-b", branch_name, &path_str, &origin_ref],
                cancel,
            )
            .await
            .context("worktree add failed")?;
        Ok(())
    }

    async fn resolve_credential(
        &self,
        request: &ProvisionRequest,
        user: Option<UserCredential>,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Option<ResolvedCredential>> {
        let credential_request = CredentialRequest {
            repo: request.repo.clone(),
            context: GrantContext {
                execution_id: request.execution.id.clone(),
                task_id: Some(request.task.id.clone()),
                agent_id: request.user.clone(),
            },
            user_credential: user,
            ..CredentialRequest::default()
        };
        self.broker.resolve(&credential_request, cancel).await
    }

    async fn configure(
        &self,
        id: &WorkspaceId,
        request: &ProvisionRequest,
        path: &Path,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        self.git
            .run(Some(path), &["config", "user.name", &self.config.git_user_name], cancel)
            .await?;
        self.git
            .run(Some(path), &["config", "user.email", &self.config.git_user_email], cancel)
            .await?;

        // Token credentials get the workspace-local helper; SSH and
        // unauthenticated workspaces skip it.
        let secret = self.secrets.read().await.get(id).cloned();
        if let Some(secret) = secret {
            let (execution_id, expires_at) = {
                let workspaces = self.workspaces.read().await;
                let ws = workspaces.get(id).context("workspace vanished")?;
                (ws.branch.execution_id.clone(), None)
            };
            let files = helper::install(
                path,
                &CredentialContext {
                    workspace_id: id.to_string(),
                    execution_id,
                    repo: request.repo.clone(),
                    token: secret,
                    expires_at,
                },
            )?;
            let script = files.script_path.display().to_string();
            self.git
                .run(Some(path), &["config", "credential.helper", &script], cancel)
                .await?;
            // The helper directory holds the live token; keep it out of
            // the index so finalize's add/commit can never push it.
            self.exclude_helper_dir(path, cancel).await?;
        }
        Ok(())
    }

    /// Append the helper directory to the repository's local exclude file
    /// (worktree-aware via `--git-path`).
    async fn exclude_helper_dir(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let out = self
            .git
            .run(Some(path), &["rev-parse", "--git-path", "info/exclude"], cancel)
            .await?;
        let rel = out.stdout.trim();
        let exclude_path = if Path::new(rel).is_absolute() {
            std::path::PathBuf::from(rel)
        } else {
            path.join(rel)
        };
        if let Some(dir) = exclude_path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create {}", dir.display()))?;
        }
        let mut contents = std::fs::read_to_string(&exclude_path).unwrap_or_default();
        if !contents.lines().any(|line| line.trim() == format!("/{}/", helper::HELPER_DIR)) {
            if !contents.is_empty() && !contents.ends_with('\n') {
                contents.push('\n');
            }
            contents.push_str(&format!("/{}/\n", helper::HELPER_DIR));
            std::fs::write(&exclude_path, contents)
                .with_context(|| format!("write {}", exclude_path.display()))?;
        }
        Ok(())
    }

    // ── Finalize ────────────────────────────────────────────────────────

    /// Push and/or open a PR, then optionally clean up. With
    /// `cleanup = false` the workspace returns to `ready`.
    pub async fn finalize(
        self: &Arc<Self>,
        id: &WorkspaceId,
        request: FinalizeRequest,
        cancel: &CancellationToken,
    ) -> anyhow::Result<FinalizeOutcome> {
        let workspace = self.get(id).await.with_context(|| {
            format!("{}: unknown workspace {id}", ErrorKind::WorkspacePreconditionViolated)
        })?;
        anyhow::ensure!(
            matches!(workspace.status, WorkspaceStatus::Ready | WorkspaceStatus::InUse),
            "{}: workspace is {}",
            ErrorKind::WorkspacePreconditionViolated,
            workspace.status
        );

        let mut outcome = FinalizeOutcome::default();
        self.set_status(id, WorkspaceStatus::Finalizing).await;

        let result = self.finalize_inner(id, &workspace, &request, &mut outcome, cancel).await;
        match result {
            Ok(()) => {
                if request.cleanup {
                    self.cleanup(id, cancel).await?;
                    outcome.cleaned_up = true;
                } else {
                    self.set_status(id, WorkspaceStatus::Ready).await;
                    self.set_phase(id, Phase::Done).await;
                }
                Ok(outcome)
            }
            Err(e) => {
                // Finalize failures leave the workspace usable.
                self.set_status(id, WorkspaceStatus::Ready).await;
                Err(e)
            }
        }
    }

    async fn finalize_inner(
        &self,
        id: &WorkspaceId,
        workspace: &Workspace,
        request: &FinalizeRequest,
        outcome: &mut FinalizeOutcome,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let secret = self.secrets.read().await.get(id).cloned();

        if request.push {
            // Token workspaces push through the installed helper; SSH
            // workspaces push through the ambient agent. Unauthenticated
            // workspaces cannot push at all.
            anyhow::ensure!(
                workspace.credential.is_some(),
                "{}: push requires authentication",
                ErrorKind::PushRequiresAuthentication
            );
            if let Some(ref grant) = workspace.credential {
                anyhow::ensure!(
                    self.broker.is_valid(grant).await,
                    "{}: workspace credential expired",
                    ErrorKind::CredentialExpired
                );
            }

            self.set_phase(id, Phase::Committing).await;
            let dirty = !self
                .git
                .run(Some(&workspace.path), &["status", "--porcelain"], cancel)
                .await?
                .stdout
                .trim()
                .is_empty();
            if dirty {
                self.git.run(Some(&workspace.path), &["add", "-A"], cancel).await?;
                let message = format!("Work from execution {}", workspace.branch.execution_id);
                self.git
                    .run(Some(&workspace.path), &["commit", "-m", &message], cancel)
                    .await?;
            }

            self.set_phase(id, Phase::Pushing).await;
            self.git
                .run(
                    Some(&workspace.path),
                    &["push", "origin", &workspace.branch.name],
                    cancel,
                )
                .await
                .context("push failed")?;
            outcome.pushed = true;
        }

        if request.create_pr {
            let provider = crate::provider::detect(&workspace.repo);
            let adapter =
                self.providers.read().await.get(&provider).cloned().with_context(|| {
                    format!(
                        "{}: no provider adapter registered for {provider}",
                        ErrorKind::ProviderApiFailed
                    )
                })?;
            let secret = secret.with_context(|| {
                format!("{}: pull request requires authentication", ErrorKind::PushRequiresAuthentication)
            })?;

            self.set_phase(id, Phase::CreatingPr).await;
            let spec = request.pr.clone().unwrap_or_else(|| crate::model::PrSpec {
                title: workspace.branch.name.clone(),
                ..Default::default()
            });
            let pr = adapter
                .create_pull_request(
                    &workspace.repo,
                    &workspace.branch.name,
                    &workspace.branch.base,
                    &spec,
                    &secret,
                )
                .await?;
            info!(workspace = %id, pr = %pr.url, "pull request created");
            outcome.pr_url = Some(pr.url);
        }

        Ok(())
    }

    // ── Cleanup ─────────────────────────────────────────────────────────

    /// Remove a workspace. Clones cascade to their worktrees first (in
    /// registration order); worktrees detach via their parent. Idempotent
    /// and tolerant of missing directories.
    pub async fn cleanup(
        self: &Arc<Self>,
        id: &WorkspaceId,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let workspace = self.get(id).await.with_context(|| {
            format!("{}: unknown workspace {id}", ErrorKind::WorkspacePreconditionViolated)
        })?;
        if workspace.status.is_terminal() {
            return Ok(());
        }

        self.set_phase(id, Phase::CleaningUp).await;

        match workspace.strategy {
            Strategy::Clone => {
                for child_id in workspace.children.iter() {
                    if let Err(e) = self.remove_worktree(&workspace, child_id, cancel).await {
                        warn!(workspace = %child_id, err = %e, "worktree cleanup failed; continuing");
                        self.mark_cleaned(child_id).await;
                    }
                }

                helper::remove(&workspace.path);
                if let Some(ref grant) = workspace.credential {
                    self.broker.revoke(grant).await;
                }
                remove_dir(&workspace.path);
                self.mark_cleaned(id).await;
            }
            Strategy::Worktree => {
                let parent = match workspace.parent {
                    Some(ref parent_id) => self.get(parent_id).await,
                    None => None,
                };
                match parent {
                    Some(parent_ws) if !parent_ws.status.is_terminal() => {
                        if let Err(e) = self.remove_worktree(&parent_ws, id, cancel).await {
                            warn!(workspace = %id, err = %e, "worktree removal failed; removing directory");
                            remove_dir(&workspace.path);
                            self.mark_cleaned(id).await;
                        }
                    }
                    _ => {
                        remove_dir(&workspace.path);
                        self.mark_cleaned(id).await;
                    }
                }
            }
        }

        Ok(())
    }

    /// Remove one worktree through its parent clone and unlink it.
    async fn remove_worktree(
        &self,
        parent: &Workspace,
        child_id: &WorkspaceId,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let child_path = match self.get(child_id).await {
            Some(child) => child.path,
            None => return Ok(()),
        };
        let path_str = child_path.display().to_string();
        if child_path.exists() {
            self.git
                .run(
                    Some(&parent.path),
                    &["worktree", "remove", "--force", &path_str],
                    cancel,
                )
                .await?;
        }
        remove_dir(&child_path);
        self.mark_cleaned(child_id).await;

        let mut workspaces = self.workspaces.write().await;
        if let Some(parent_ws) = workspaces.get_mut(&parent.id) {
            parent_ws.children.shift_remove(child_id);
        }
        Ok(())
    }

    async fn mark_cleaned(&self, id: &WorkspaceId) {
        {
            let mut workspaces = self.workspaces.write().await;
            if let Some(ws) = workspaces.get_mut(id) {
                ws.status = WorkspaceStatus::CleanedUp;
                ws.phase = Phase::Done;
            }
        }
        self.secrets.write().await.remove(id);
        self.events.emit_workspace(WorkspaceEvent::CleanedUp { workspace: id.clone() });
        info!(workspace = %id, "workspace cleaned up");
    }

    /// Best-effort removal of partial state after a failed or cancelled
    /// provisioning run.
    async fn cleanup_partial(&self, id: &WorkspaceId) {
        let Some(workspace) = self.get(id).await else { return };

        if workspace.strategy == Strategy::Worktree {
            if let Some(ref parent_id) = workspace.parent {
                if let Some(parent) = self.get(parent_id).await {
                    let path_str = workspace.path.display().to_string();
                    let _ = self
                        .git
                        .run(
                            Some(&parent.path),
                            &["worktree", "remove", "--force", &path_str],
                            &CancellationToken::new(),
                        )
                        .await;
                    let mut workspaces = self.workspaces.write().await;
                    if let Some(parent_ws) = workspaces.get_mut(parent_id) {
                        parent_ws.children.shift_remove(id);
                    }
                }
            }
        }

        helper::remove(&workspace.path);
        remove_dir(&workspace.path);
        if let Some(ref grant) = workspace.credential {
            self.broker.revoke(grant).await;
        }
        self.secrets.write().await.remove(id);
    }

    // ── Bookkeeping ─────────────────────────────────────────────────────

    async fn set_phase(&self, id: &WorkspaceId, phase: Phase) {
        let status = {
            let mut workspaces = self.workspaces.write().await;
            let Some(ws) = workspaces.get_mut(id) else { return };
            ws.phase = phase;
            ws.status
        };
        self.events.emit_workspace(WorkspaceEvent::Progress {
            workspace: id.clone(),
            phase,
            status,
        });
    }

    async fn set_status(&self, id: &WorkspaceId, status: WorkspaceStatus) {
        let mut workspaces = self.workspaces.write().await;
        if let Some(ws) = workspaces.get_mut(id) {
            ws.status = status;
        }
    }

    async fn finish_status(
        &self,
        id: &WorkspaceId,
        status: WorkspaceStatus,
        phase: Phase,
    ) -> Option<Workspace> {
        let mut workspaces = self.workspaces.write().await;
        let ws = workspaces.get_mut(id)?;
        ws.status = status;
        ws.phase = phase;
        Some(ws.clone())
    }

    async fn run_completion_hook(&self, workspace: &Workspace) {
        if let Some(ref hook) = workspace.on_complete {
            hook::run(hook, workspace, &self.http).await;
        }
    }
}

/// Token credentials embed into the HTTPS URL for the clone; SSH and
/// tokenless credentials use the plain URL.
fn credential_url(repo: &str, resolved: &ResolvedCredential) -> String {
    match resolved.secret {
        Some(ref secret) => authenticated_url(repo, secret),
        None => repo.to_owned(),
    }
}

fn remove_dir(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_dir_all(path) {
            warn!(path = %path.display(), err = %e, "failed to remove workspace directory");
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;

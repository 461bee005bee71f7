// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter interface: everything the core knows about one assistant CLI.
//!
//! An adapter is a value: compiled patterns, launch assembly, and a
//! catalog of auto-response rules. Detectors are pure functions over the
//! ANSI-stripped tail window; they perform no I/O, hold no mutable state,
//! and tolerate partial TUI redraws. When several categories would match
//! the same tail, the session applies the pinned ordering
//! (blocking-prompt > login > ready > task-complete); an adapter that is
//! unsure between two categories must report the attention-requiring one.

pub mod aider;
pub mod claude;
pub mod codex;
pub mod gemini;
pub mod rules;

pub use rules::{AutoResponseRule, EscalateReason, ResponseKind, RuleDecision};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Inputs to [`Adapter::launch`], assembled by the supervisor from the
/// spawn configuration.
#[derive(Debug, Clone, Default)]
pub struct LaunchConfig {
    /// Human label for the session.
    pub name: String,
    /// Absolute working directory for the child.
    pub workdir: PathBuf,
    /// Environment delta applied on top of the parent environment.
    pub env: Vec<(String, String)>,
    /// Well-known adapter options parsed from `adapter_config`.
    pub options: AdapterOptions,
    /// Unrecognized `adapter_config` keys, preserved verbatim.
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LaunchConfig {
    /// Parse an opaque `adapter_config` value, splitting well-known keys
    /// from the passthrough remainder.
    pub fn parse_adapter_config(&mut self, config: serde_json::Value) -> anyhow::Result<()> {
        let serde_json::Value::Object(map) = config else {
            anyhow::bail!("adapter_config must be an object");
        };
        let mut known = serde_json::Map::new();
        for (key, value) in map {
            if AdapterOptions::is_known_key(&key) {
                known.insert(key, value);
            } else {
                self.extra.insert(key, value);
            }
        }
        self.options = serde_json::from_value(serde_json::Value::Object(known))?;
        Ok(())
    }
}

/// Well-known keys of the opaque `adapter_config` object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ModelProvider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_preset: Option<ApprovalPreset>,
}

impl AdapterOptions {
    fn is_known_key(key: &str) -> bool {
        matches!(
            key,
            "interactive"
                | "anthropicKey"
                | "openaiKey"
                | "googleKey"
                | "githubToken"
                | "provider"
                | "approvalPreset"
        )
    }

    /// Whether the session runs the interactive TUI (default) or a
    /// non-interactive print mode.
    pub fn interactive(&self) -> bool {
        self.interactive.unwrap_or(true)
    }
}

/// Model backend selection for adapters that support several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    Anthropic,
    Openai,
    Google,
}

/// How much autonomy the assistant gets over tool execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalPreset {
    Readonly,
    Standard,
    Permissive,
    Autonomous,
}

/// What to exec: program, argv, and environment delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl LaunchSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new(), env: Vec::new() }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// The full command line, program first.
    pub fn command(&self) -> Vec<String> {
        let mut cmd = Vec::with_capacity(self.args.len() + 1);
        cmd.push(self.program.clone());
        cmd.extend(self.args.iter().cloned());
        cmd
    }
}

/// A login requirement observed in the tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginDetection {
    /// Mechanism, e.g. `"oauth"`, `"api_key"`, `"device_code"`.
    pub kind: Option<&'static str>,
    /// Authorization URL extracted from the output, when visible.
    pub url: Option<String>,
    pub instructions: Option<String>,
}

/// A blocking prompt observed in the tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptDetection {
    /// Prompt category, e.g. `"permission"`, `"confirm"`, `"setup"`.
    pub kind: Option<&'static str>,
    /// Rule id from this adapter's catalog that would answer the prompt.
    pub suggested_rule: Option<&'static str>,
    /// Whether the suggested rule is safe to issue without a caller.
    pub can_auto_respond: bool,
    pub instructions: Option<String>,
}

/// A child exit announcement parsed from output (some CLIs print a final
/// line before closing the PTY).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitDetection {
    pub code: Option<i32>,
    pub reason: Option<String>,
}

/// Classified fragment of assistant output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOutput {
    pub kind: OutputKind,
    pub content: String,
    pub complete: bool,
    pub is_question: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Message,
    Progress,
    Question,
}

/// Install metadata for preflight tooling. Pure data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallSpec {
    /// Binary name looked up on PATH.
    pub binary: &'static str,
    /// Argv appended to the binary for a version probe.
    pub version_args: &'static [&'static str],
    /// One-line hint shown when the binary is missing.
    pub install_hint: &'static str,
}

/// Everything the core knows about one assistant CLI.
pub trait Adapter: Send + Sync {
    /// Registry tag (`"claude"`, `"gemini"`, …).
    fn kind(&self) -> &'static str;

    /// Assemble the command to exec for a session.
    fn launch(&self, cfg: &LaunchConfig) -> anyhow::Result<LaunchSpec>;

    /// The assistant is idle at its input prompt.
    fn detect_ready(&self, tail: &str) -> bool;

    /// A login/auth dialog is on screen. Never auto-responded.
    fn detect_login(&self, tail: &str) -> Option<LoginDetection>;

    /// A prompt is blocking progress until answered.
    fn detect_blocking_prompt(&self, tail: &str) -> Option<PromptDetection>;

    /// The current task finished (adapter-local heuristic).
    fn detect_task_complete(&self, tail: &str) -> bool;

    /// The CLI announced its own exit in output.
    fn detect_exit(&self, _tail: &str) -> Option<ExitDetection> {
        None
    }

    /// Extract a structured fragment from the tail, when recognizable.
    fn parse_output(&self, _tail: &str) -> Option<ParsedOutput> {
        None
    }

    /// Ordered auto-response catalog.
    fn rules(&self) -> &[AutoResponseRule];

    /// Install descriptor.
    fn install(&self) -> &InstallSpec;
}

/// Name → adapter mapping with supervisor lifetime.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<&'static str, Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the shipped adapters.
    pub fn with_defaults() -> anyhow::Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(claude::ClaudeAdapter::new()?));
        registry.register(Arc::new(codex::CodexAdapter::new()?));
        registry.register(Arc::new(gemini::GeminiAdapter::new()?));
        registry.register(Arc::new(aider::AiderAdapter::new()?));
        Ok(registry)
    }

    /// Register an adapter under its own tag, replacing any previous one.
    pub fn register(&mut self, adapter: Arc<dyn Adapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters.get(kind).cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.adapters.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

/// Shared heuristic: does a stripped line read as a question to the user?
///
/// Used by `parse_output` implementations; intentionally conservative.
pub fn looks_like_question(line: &str) -> bool {
    let trimmed = line.trim_end();
    if trimmed.ends_with('?') {
        return true;
    }
    trimmed.contains("[y/n]") || trimmed.contains("[Y/n]") || trimmed.contains("(y/N)")
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
mod tests;

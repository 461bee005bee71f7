// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter for the aider CLI.

use regex::Regex;

use super::rules::{AutoResponseRule, ResponseKind};
use super::{
    looks_like_question, Adapter, ApprovalPreset, InstallSpec, LaunchConfig, LaunchSpec,
    LoginDetection, ModelProvider, OutputKind, ParsedOutput, PromptDetection,
};

const INSTALL: InstallSpec = InstallSpec {
    binary: "aider",
    version_args: &["--version"],
    install_hint: "pip install aider-install && aider-install",
};

pub struct AiderAdapter {
    ready_re: Regex,
    complete_re: Regex,
    destructive_re: Regex,
    yn_re: Regex,
    rules: Vec<AutoResponseRule>,
}

impl AiderAdapter {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            // aider's REPL prompt is a bare "> " on the last line.
            ready_re: Regex::new(r"(?m)^>\s*$|^> \S*$")?,
            complete_re: Regex::new(r"Applied edit to|Commit [0-9a-f]{7}")?,
            destructive_re: Regex::new(r"(?i)(delete|remove|drop|overwrite|discard)\b.*\[y/n\]")?,
            yn_re: Regex::new(r"\[y/n\]|\(Y\)es/\(N\)o")?,
            rules: vec![
                AutoResponseRule::new(
                    "decline-url-open",
                    r"Open URL for more info\? \(Y\)es/\(N\)o",
                    ResponseKind::Text("n".to_owned()),
                    "decline opening documentation links",
                )?,
                AutoResponseRule::new(
                    "add-file",
                    r"Add .+ to the chat\? \(Y\)es/\(N\)o",
                    ResponseKind::Text("y".to_owned()),
                    "add a referenced file to the chat",
                )?,
                AutoResponseRule::new(
                    "destructive-confirm",
                    r"(?i)(delete|remove|drop|overwrite|discard)\b.*\[y/n\]",
                    ResponseKind::Text("y".to_owned()),
                    "confirm a destructive operation",
                )?
                .unsafe_to_auto(),
            ],
        })
    }
}

impl Adapter for AiderAdapter {
    fn kind(&self) -> &'static str {
        "aider"
    }

    fn launch(&self, cfg: &LaunchConfig) -> anyhow::Result<LaunchSpec> {
        let mut spec = LaunchSpec::new(INSTALL.binary).arg("--no-auto-commits");

        match cfg.options.provider {
            Some(ModelProvider::Anthropic) | None => {
                spec = spec.arg("--model").arg("sonnet");
                if let Some(ref key) = cfg.options.anthropic_key {
                    spec = spec.env("ANTHROPIC_API_KEY", key.clone());
                }
            }
            Some(ModelProvider::Openai) => {
                if let Some(ref key) = cfg.options.openai_key {
                    spec = spec.env("OPENAI_API_KEY", key.clone());
                }
            }
            Some(ModelProvider::Google) => {
                spec = spec.arg("--model").arg("gemini");
                if let Some(ref key) = cfg.options.google_key {
                    spec = spec.env("GEMINI_API_KEY", key.clone());
                }
            }
        }

        match cfg.options.approval_preset {
            Some(ApprovalPreset::Readonly) => {
                spec = spec.arg("--dry-run");
            }
            Some(ApprovalPreset::Autonomous) => {
                spec = spec.arg("--yes-always");
            }
            _ => {}
        }

        Ok(spec)
    }

    fn detect_ready(&self, tail: &str) -> bool {
        self.ready_re.is_match(tail)
    }

    fn detect_login(&self, tail: &str) -> Option<LoginDetection> {
        if tail.contains("API key not found") || tail.contains("Please provide an API key") {
            return Some(LoginDetection {
                kind: Some("api_key"),
                url: None,
                instructions: Some("export the model provider's API key and restart".to_owned()),
            });
        }
        None
    }

    fn detect_blocking_prompt(&self, tail: &str) -> Option<PromptDetection> {
        if self.destructive_re.is_match(tail) {
            return Some(PromptDetection {
                kind: Some("confirm"),
                suggested_rule: Some("destructive-confirm"),
                can_auto_respond: false,
                instructions: Some(
                    "a destructive confirmation is awaiting a y/n answer".to_owned(),
                ),
            });
        }
        if self.yn_re.is_match(tail) {
            return Some(PromptDetection {
                kind: Some("confirm"),
                suggested_rule: None,
                can_auto_respond: false,
                instructions: Some("a y/n confirmation is awaiting an answer".to_owned()),
            });
        }
        None
    }

    fn detect_task_complete(&self, tail: &str) -> bool {
        self.complete_re.is_match(tail)
    }

    fn parse_output(&self, tail: &str) -> Option<ParsedOutput> {
        let line = tail.lines().rev().find(|l| !l.trim().is_empty())?;
        if !looks_like_question(line) {
            return None;
        }
        Some(ParsedOutput {
            kind: OutputKind::Question,
            content: line.trim().to_owned(),
            complete: true,
            is_question: true,
        })
    }

    fn rules(&self) -> &[AutoResponseRule] {
        &self.rules
    }

    fn install(&self) -> &InstallSpec {
        &INSTALL
    }
}

#[cfg(test)]
#[path = "aider_tests.rs"]
mod tests;

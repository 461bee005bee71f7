// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter for the Codex CLI.

use regex::Regex;

use crate::keys::Key;

use super::rules::{AutoResponseRule, ResponseKind};
use super::{
    Adapter, ApprovalPreset, InstallSpec, LaunchConfig, LaunchSpec, LoginDetection, OutputKind,
    ParsedOutput, PromptDetection,
};

const INSTALL: InstallSpec = InstallSpec {
    binary: "codex",
    version_args: &["--version"],
    install_hint: "npm install -g @openai/codex",
};

pub struct CodexAdapter {
    ready_re: Regex,
    working_re: Regex,
    complete_re: Regex,
    login_url_re: Regex,
    rules: Vec<AutoResponseRule>,
}

impl CodexAdapter {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            ready_re: Regex::new(r"Ask Codex to do anything|⏎ send")?,
            working_re: Regex::new(r"Esc to interrupt")?,
            // Codex prints a token accounting line when a turn ends.
            complete_re: Regex::new(r"tokens used:? [\d,]+")?,
            login_url_re: Regex::new(r"https://auth\.openai\.com/\S+")?,
            rules: vec![
                AutoResponseRule::new(
                    "update-notice",
                    r"A new version of Codex is available",
                    ResponseKind::Keys(vec![Key::Esc]),
                    "dismiss the update notice",
                )?
                .once(),
                AutoResponseRule::new(
                    "onboarding-continue",
                    r"Press Enter to continue",
                    ResponseKind::Keys(vec![Key::Enter]),
                    "advance the onboarding screens",
                )?,
                AutoResponseRule::new(
                    "approval-request",
                    r"Allow command\?",
                    ResponseKind::Keys(vec![Key::Enter]),
                    "approve a command execution",
                )?
                .unsafe_to_auto(),
            ],
        })
    }
}

impl Adapter for CodexAdapter {
    fn kind(&self) -> &'static str {
        "codex"
    }

    fn launch(&self, cfg: &LaunchConfig) -> anyhow::Result<LaunchSpec> {
        let mut spec = LaunchSpec::new(INSTALL.binary);

        match cfg.options.approval_preset {
            Some(ApprovalPreset::Readonly) => {
                spec = spec.arg("--sandbox").arg("read-only");
            }
            Some(ApprovalPreset::Permissive) => {
                spec = spec.arg("--full-auto");
            }
            Some(ApprovalPreset::Autonomous) => {
                spec = spec.arg("--dangerously-bypass-approvals-and-sandbox");
            }
            Some(ApprovalPreset::Standard) | None => {}
        }

        if let Some(ref key) = cfg.options.openai_key {
            spec = spec.env("OPENAI_API_KEY", key.clone());
        }
        if let Some(ref token) = cfg.options.github_token {
            spec = spec.env("GH_TOKEN", token.clone());
        }

        Ok(spec)
    }

    fn detect_ready(&self, tail: &str) -> bool {
        self.ready_re.is_match(tail)
    }

    fn detect_login(&self, tail: &str) -> Option<LoginDetection> {
        if let Some(m) = self.login_url_re.find(tail) {
            return Some(LoginDetection {
                kind: Some("oauth"),
                url: Some(m.as_str().to_owned()),
                instructions: Some("complete the sign-in in a browser".to_owned()),
            });
        }
        if tail.contains("Sign in with ChatGPT") {
            return Some(LoginDetection {
                kind: Some("oauth"),
                url: None,
                instructions: Some("sign in with ChatGPT or provide an API key".to_owned()),
            });
        }
        None
    }

    fn detect_blocking_prompt(&self, tail: &str) -> Option<PromptDetection> {
        if tail.contains("Allow command?") {
            return Some(PromptDetection {
                kind: Some("permission"),
                suggested_rule: Some("approval-request"),
                can_auto_respond: false,
                instructions: Some("a command is awaiting approval".to_owned()),
            });
        }
        None
    }

    fn detect_task_complete(&self, tail: &str) -> bool {
        self.complete_re.is_match(tail)
    }

    fn parse_output(&self, tail: &str) -> Option<ParsedOutput> {
        if self.working_re.is_match(tail) {
            return Some(ParsedOutput {
                kind: OutputKind::Progress,
                content: String::new(),
                complete: false,
                is_question: false,
            });
        }
        None
    }

    fn rules(&self) -> &[AutoResponseRule] {
        &self.rules
    }

    fn install(&self) -> &InstallSpec {
        &INSTALL
    }
}

#[cfg(test)]
#[path = "codex_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter for the Gemini CLI.

use regex::Regex;

use crate::keys::Key;

use super::rules::{AutoResponseRule, ResponseKind};
use super::{
    Adapter, ApprovalPreset, ExitDetection, InstallSpec, LaunchConfig, LaunchSpec, LoginDetection,
    OutputKind, ParsedOutput, PromptDetection,
};

const INSTALL: InstallSpec = InstallSpec {
    binary: "gemini",
    version_args: &["--version"],
    install_hint: "npm install -g @google/gemini-cli",
};

pub struct GeminiAdapter {
    ready_re: Regex,
    working_re: Regex,
    complete_re: Regex,
    login_url_re: Regex,
    rules: Vec<AutoResponseRule>,
}

impl GeminiAdapter {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            ready_re: Regex::new(r"Type your message|>\s*$")?,
            working_re: Regex::new(r"\(esc to cancel")?,
            complete_re: Regex::new(r"✦.*\n+.*>\s*$|agent finished")?,
            login_url_re: Regex::new(r"https://accounts\.google\.com/o/oauth2/\S+")?,
            rules: vec![
                AutoResponseRule::new(
                    "apply-change",
                    r"Apply this change\?",
                    ResponseKind::Keys(vec![Key::Enter]),
                    "accept a proposed file edit",
                )?
                .once(),
                AutoResponseRule::new(
                    "theme-select",
                    r"Select Theme",
                    ResponseKind::Keys(vec![Key::Enter]),
                    "accept the default theme during onboarding",
                )?
                .once(),
                AutoResponseRule::new(
                    "allow-execution",
                    r"Allow execution\?",
                    ResponseKind::Keys(vec![Key::Enter]),
                    "approve a shell command",
                )?
                .unsafe_to_auto(),
            ],
        })
    }
}

impl Adapter for GeminiAdapter {
    fn kind(&self) -> &'static str {
        "gemini"
    }

    fn launch(&self, cfg: &LaunchConfig) -> anyhow::Result<LaunchSpec> {
        let mut spec = LaunchSpec::new(INSTALL.binary);

        if matches!(cfg.options.approval_preset, Some(ApprovalPreset::Autonomous)) {
            spec = spec.arg("--yolo");
        }
        if matches!(cfg.options.approval_preset, Some(ApprovalPreset::Readonly)) {
            spec = spec.arg("--sandbox");
        }

        if let Some(ref key) = cfg.options.google_key {
            spec = spec.env("GEMINI_API_KEY", key.clone());
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
                instructions: Some("complete the Google sign-in in a browser".to_owned()),
            });
        }
        if tail.contains("Sign in with Google")
            || (tail.contains("GEMINI_API_KEY") && tail.contains("not set"))
        {
            return Some(LoginDetection {
                kind: Some("oauth"),
                url: None,
                instructions: Some("authentication is required before use".to_owned()),
            });
        }
        None
    }

    fn detect_blocking_prompt(&self, tail: &str) -> Option<PromptDetection> {
        if tail.contains("Apply this change?") {
            return Some(PromptDetection {
                kind: Some("confirm"),
                suggested_rule: Some("apply-change"),
                can_auto_respond: true,
                instructions: None,
            });
        }
        if tail.contains("Allow execution?") {
            return Some(PromptDetection {
                kind: Some("permission"),
                suggested_rule: Some("allow-execution"),
                can_auto_respond: false,
                instructions: Some("a shell command is awaiting approval".to_owned()),
            });
        }
        None
    }

    fn detect_task_complete(&self, tail: &str) -> bool {
        self.complete_re.is_match(tail)
    }

    fn detect_exit(&self, tail: &str) -> Option<ExitDetection> {
        if tail.contains("Agent powering down. Goodbye!") {
            return Some(ExitDetection { code: Some(0), reason: Some("user exit".to_owned()) });
        }
        None
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
        let line = tail.lines().rev().find(|l| l.trim_start().starts_with('✦'))?;
        let content = line.trim_start().trim_start_matches('✦').trim().to_owned();
        let is_question = super::looks_like_question(&content);
        Some(ParsedOutput {
            kind: if is_question { OutputKind::Question } else { OutputKind::Message },
            content,
            complete: true,
            is_question,
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
#[path = "gemini_tests.rs"]
mod tests;

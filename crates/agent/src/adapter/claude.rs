// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter for the Claude Code CLI.

use regex::Regex;

use crate::keys::Key;

use super::rules::{AutoResponseRule, ResponseKind};
use super::{
    looks_like_question, Adapter, ApprovalPreset, ExitDetection, InstallSpec, LaunchConfig,
    LaunchSpec, LoginDetection, OutputKind, ParsedOutput, PromptDetection,
};

/// Claude Code renders `❯` (U+276F) at the start of its input line.
const PROMPT_GLYPH: char = '\u{276f}';

const INSTALL: InstallSpec = InstallSpec {
    binary: "claude",
    version_args: &["--version"],
    install_hint: "npm install -g @anthropic-ai/claude-code",
};

pub struct ClaudeAdapter {
    ready_re: Regex,
    working_re: Regex,
    complete_re: Regex,
    response_marker_re: Regex,
    oauth_url_re: Regex,
    rules: Vec<AutoResponseRule>,
}

impl ClaudeAdapter {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            ready_re: Regex::new(r"How can I help you today\?")?,
            working_re: Regex::new(r"esc to interrupt")?,
            // A finished turn shows a duration/token summary before the
            // prompt returns, e.g. "✳ Done (3 tool uses · 12.4k tokens · 41s)".
            complete_re: Regex::new(r"\(\d+ tool uses? · [\d.]+k? tokens · \d+m? ?\d*s\)")?,
            response_marker_re: Regex::new(r"⏺")?,
            oauth_url_re: Regex::new(r"https://claude\.ai/oauth/authorize\?\S+")?,
            rules: vec![
                AutoResponseRule::new(
                    "trust-folder",
                    r"Yes, I trust this folder",
                    ResponseKind::Keys(vec![Key::Enter]),
                    "accept workspace trust for the launch directory",
                )?
                .once(),
                AutoResponseRule::new(
                    "theme-picker",
                    r"Choose the text style that looks best",
                    ResponseKind::Keys(vec![Key::Enter]),
                    "accept the default theme during onboarding",
                )?
                .once(),
                AutoResponseRule::new(
                    "security-notes",
                    r"Security notes:[\s\S]*Press Enter to continue",
                    ResponseKind::Keys(vec![Key::Enter]),
                    "dismiss the first-run security notes",
                )?
                .once(),
                AutoResponseRule::new(
                    "terminal-setup",
                    r"Use Claude Code's terminal setup\?",
                    ResponseKind::Keys(vec![Key::Enter]),
                    "accept the recommended terminal settings",
                )?
                .once(),
                AutoResponseRule::new(
                    "login-success",
                    r"Login successful\. Press Enter to continue",
                    ResponseKind::Keys(vec![Key::Enter]),
                    "dismiss the login confirmation screen",
                )?
                .once(),
                AutoResponseRule::new(
                    "tool-permission",
                    r"Do you want to proceed\?",
                    ResponseKind::Text("1".to_owned()),
                    "approve a tool invocation",
                )?
                .unsafe_to_auto(),
                AutoResponseRule::new(
                    "plan-approval",
                    r"Would you like to proceed with this plan\?",
                    ResponseKind::Text("1".to_owned()),
                    "approve a proposed plan",
                )?
                .unsafe_to_auto(),
            ],
        })
    }
}

impl Adapter for ClaudeAdapter {
    fn kind(&self) -> &'static str {
        "claude"
    }

    fn launch(&self, cfg: &LaunchConfig) -> anyhow::Result<LaunchSpec> {
        let mut spec = LaunchSpec::new(INSTALL.binary);

        if !cfg.options.interactive() {
            spec = spec.arg("--print").arg("--output-format").arg("stream-json");
        }

        match cfg.options.approval_preset {
            Some(ApprovalPreset::Readonly) => {
                spec = spec.arg("--permission-mode").arg("plan");
            }
            Some(ApprovalPreset::Permissive) => {
                spec = spec.arg("--permission-mode").arg("acceptEdits");
            }
            Some(ApprovalPreset::Autonomous) => {
                spec = spec.arg("--dangerously-skip-permissions");
            }
            Some(ApprovalPreset::Standard) | None => {}
        }

        if let Some(ref key) = cfg.options.anthropic_key {
            spec = spec.env("ANTHROPIC_API_KEY", key.clone());
        }
        if let Some(ref token) = cfg.options.github_token {
            spec = spec.env("GH_TOKEN", token.clone());
        }

        Ok(spec)
    }

    fn detect_ready(&self, tail: &str) -> bool {
        if self.ready_re.is_match(tail) {
            return true;
        }
        // Status hints may render below the input line; scan all lines.
        tail.lines().rev().any(|line| line.trim_start().starts_with(PROMPT_GLYPH))
    }

    fn detect_login(&self, tail: &str) -> Option<LoginDetection> {
        if let Some(m) = self.oauth_url_re.find(tail) {
            return Some(LoginDetection {
                kind: Some("oauth"),
                url: Some(m.as_str().to_owned()),
                instructions: Some(
                    "open the authorization URL in a browser and paste the code if prompted"
                        .to_owned(),
                ),
            });
        }
        if tail.contains("Select login method") {
            return Some(LoginDetection {
                kind: Some("oauth"),
                url: None,
                instructions: Some("a login method must be selected interactively".to_owned()),
            });
        }
        if tail.contains("Invalid API key") || tail.contains("Please run /login") {
            return Some(LoginDetection {
                kind: Some("api_key"),
                url: None,
                instructions: Some("set a valid ANTHROPIC_API_KEY or run /login".to_owned()),
            });
        }
        None
    }

    fn detect_blocking_prompt(&self, tail: &str) -> Option<PromptDetection> {
        if tail.contains("Do you want to proceed?") {
            return Some(PromptDetection {
                kind: Some("permission"),
                suggested_rule: Some("tool-permission"),
                can_auto_respond: false,
                instructions: Some("a tool invocation is awaiting approval".to_owned()),
            });
        }
        if tail.contains("Would you like to proceed with this plan?") {
            return Some(PromptDetection {
                kind: Some("plan"),
                suggested_rule: Some("plan-approval"),
                can_auto_respond: false,
                instructions: Some("a plan is awaiting approval".to_owned()),
            });
        }
        if tail.contains("Yes, I trust this folder") {
            return Some(PromptDetection {
                kind: Some("trust"),
                suggested_rule: Some("trust-folder"),
                can_auto_respond: true,
                instructions: None,
            });
        }
        None
    }

    fn detect_task_complete(&self, tail: &str) -> bool {
        if self.complete_re.is_match(tail) {
            return true;
        }
        // A response marker together with the returned prompt means the
        // turn finished without a summary line.
        self.response_marker_re.is_match(tail)
            && tail.lines().rev().any(|l| l.trim_start().starts_with(PROMPT_GLYPH))
    }

    fn detect_exit(&self, tail: &str) -> Option<ExitDetection> {
        if tail.contains("Goodbye!") {
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
        // Last response bullet, if one is fully rendered.
        let line = tail.lines().rev().find(|l| l.trim_start().starts_with('⏺'))?;
        let content = line.trim_start().trim_start_matches('⏺').trim().to_owned();
        let is_question = looks_like_question(&content);
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
#[path = "claude_tests.rs"]
mod tests;

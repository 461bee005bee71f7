// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Helpers for exercising sessions against scripted children.
//!
//! Real assistant binaries are not available on CI, so tests register a
//! [`ScriptAdapter`]: the detectors and rule catalog of a real adapter,
//! launched as a shell script that plays the assistant's part.

use std::sync::Arc;

use crate::adapter::{
    Adapter, AutoResponseRule, ExitDetection, InstallSpec, LaunchConfig, LaunchSpec,
    LoginDetection, ParsedOutput, PromptDetection,
};

/// An adapter that keeps another adapter's classification behavior but
/// launches `sh -c <script>` instead of the real binary.
pub struct ScriptAdapter {
    inner: Arc<dyn Adapter>,
    script: String,
}

impl ScriptAdapter {
    pub fn new(inner: Arc<dyn Adapter>, script: impl Into<String>) -> Self {
        Self { inner, script: script.into() }
    }
}

impl Adapter for ScriptAdapter {
    fn kind(&self) -> &'static str {
        self.inner.kind()
    }

    fn launch(&self, _cfg: &LaunchConfig) -> anyhow::Result<LaunchSpec> {
        Ok(LaunchSpec::new("sh").arg("-c").arg(self.script.clone()))
    }

    fn detect_ready(&self, tail: &str) -> bool {
        self.inner.detect_ready(tail)
    }

    fn detect_login(&self, tail: &str) -> Option<LoginDetection> {
        self.inner.detect_login(tail)
    }

    fn detect_blocking_prompt(&self, tail: &str) -> Option<PromptDetection> {
        self.inner.detect_blocking_prompt(tail)
    }

    fn detect_task_complete(&self, tail: &str) -> bool {
        self.inner.detect_task_complete(tail)
    }

    fn detect_exit(&self, tail: &str) -> Option<ExitDetection> {
        self.inner.detect_exit(tail)
    }

    fn parse_output(&self, tail: &str) -> Option<ParsedOutput> {
        self.inner.parse_output(tail)
    }

    fn rules(&self) -> &[AutoResponseRule] {
        self.inner.rules()
    }

    fn install(&self) -> &InstallSpec {
        self.inner.install()
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Detector cascade with the pinned authoritative ordering.
//!
//! A tail can satisfy several detectors at once: a residual login banner
//! under a fresh prompt, a completion summary next to a permission menu.
//! The contract is: exit first, then blocking-prompt > login > ready >
//! task-complete. Attention states win; this function is the only place
//! the ordering lives.

use std::panic::AssertUnwindSafe;

use crate::adapter::{Adapter, ExitDetection, LoginDetection, PromptDetection};

/// The single classification a tail resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Exit(ExitDetection),
    Prompt(PromptDetection),
    Login(LoginDetection),
    Ready,
    TaskComplete,
    None,
}

/// Run the cascade over a stripped tail.
pub fn classify(adapter: &dyn Adapter, tail: &str) -> Classification {
    if let Some(exit) = adapter.detect_exit(tail) {
        return Classification::Exit(exit);
    }
    if let Some(prompt) = adapter.detect_blocking_prompt(tail) {
        return Classification::Prompt(prompt);
    }
    if let Some(login) = adapter.detect_login(tail) {
        return Classification::Login(login);
    }
    if adapter.detect_ready(tail) {
        return Classification::Ready;
    }
    if adapter.detect_task_complete(tail) {
        return Classification::TaskComplete;
    }
    Classification::None
}

/// Cascade with a panic guard around the adapter's detectors.
///
/// Detectors are third-party-adjacent code; a panicking regex or slice
/// must not take the session down. Returns the classification and whether
/// a panic was swallowed (logged by the caller as `classifier_panic`).
pub fn classify_guarded(adapter: &dyn Adapter, tail: &str) -> (Classification, bool) {
    match std::panic::catch_unwind(AssertUnwindSafe(|| classify(adapter, tail))) {
        Ok(classification) => (classification, false),
        Err(_) => (Classification::None, true),
    }
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;

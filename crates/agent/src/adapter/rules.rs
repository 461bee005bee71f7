// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Auto-response rule records and matching.
//!
//! Rules are ordered; the first pattern match wins. A rule marked
//! `once` fires at most one write per session. A rule with `safe = false`
//! is never written automatically; it exists so the session can surface
//! the prompt with a suggested response attached.

use std::collections::HashSet;

use regex::Regex;

use crate::keys::{encode_sequence, Key};

/// What a rule writes to the child when it fires.
#[derive(Debug, Clone)]
pub enum ResponseKind {
    /// Literal text; a carriage return is appended to submit it.
    Text(String),
    /// A short key sequence from the fixed vocabulary.
    Keys(Vec<Key>),
}

impl ResponseKind {
    /// Encode into the bytes written to the PTY.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Text(text) => {
                let mut out = text.as_bytes().to_vec();
                out.push(b'\r');
                out
            }
            Self::Keys(keys) => encode_sequence(keys),
        }
    }
}

/// One entry in an adapter's auto-response catalog.
#[derive(Debug)]
pub struct AutoResponseRule {
    /// Stable identity; `once` bookkeeping is keyed on this.
    pub id: &'static str,
    /// Matched against the ANSI-stripped tail.
    pub pattern: Regex,
    pub response: ResponseKind,
    /// Unsafe rules are surfaced, never written.
    pub safe: bool,
    /// Fire at most once per session.
    pub once: bool,
    pub description: &'static str,
}

impl AutoResponseRule {
    pub fn new(
        id: &'static str,
        pattern: &str,
        response: ResponseKind,
        description: &'static str,
    ) -> anyhow::Result<Self> {
        Ok(Self { id, pattern: Regex::new(pattern)?, response, safe: true, once: false, description })
    }

    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    pub fn unsafe_to_auto(mut self) -> Self {
        self.safe = false;
        self
    }
}

/// Outcome of evaluating the rule catalog against a tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleDecision {
    /// No rule matched.
    None,
    /// A safe, unexhausted rule matched; write these bytes and record
    /// the id if the rule is `once`.
    Respond { rule: &'static str, bytes: Vec<u8>, once: bool },
    /// A rule matched but must not fire; surface as a blocking prompt.
    Escalate { rule: &'static str, reason: EscalateReason, description: &'static str },
}

/// Why a matched rule did not fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalateReason {
    Unsafe,
    OnceExhausted,
}

impl EscalateReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unsafe => "unsafe rule requires caller response",
            Self::OnceExhausted => "rule already fired for this session",
        }
    }
}

/// Evaluate an ordered rule catalog against the stripped tail.
///
/// First match decides; later rules are not consulted.
pub fn evaluate(
    rules: &[AutoResponseRule],
    tail: &str,
    fired: &HashSet<&'static str>,
) -> RuleDecision {
    for rule in rules {
        if !rule.pattern.is_match(tail) {
            continue;
        }
        if !rule.safe {
            return RuleDecision::Escalate {
                rule: rule.id,
                reason: EscalateReason::Unsafe,
                description: rule.description,
            };
        }
        if rule.once && fired.contains(rule.id) {
            return RuleDecision::Escalate {
                rule: rule.id,
                reason: EscalateReason::OnceExhausted,
                description: rule.description,
            };
        }
        return RuleDecision::Respond {
            rule: rule.id,
            bytes: rule.response.encode(),
            once: rule.once,
        };
    }
    RuleDecision::None
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod tests;

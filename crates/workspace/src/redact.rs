// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret scrubbing for every log line and error message this crate
//! produces. Git loves to echo credentialed remote URLs back in stderr;
//! nothing leaves this crate without passing through here.

use regex::Regex;

/// Scrubber applied to git stderr, provider errors, and log fields.
#[derive(Debug, Clone)]
pub struct Redactor {
    url_token: Regex,
    basic_auth: Regex,
    bearer: Regex,
}

impl Redactor {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            url_token: Regex::new(r"x-access-token:[^@\s]*@")?,
            basic_auth: Regex::new(r"(https?://)[^/@\s:]+:[^@\s]+@")?,
            bearer: Regex::new(r"(?i)(bearer|token|authorization:)\s+[A-Za-z0-9._~+/=-]{8,}")?,
        })
    }

    /// Mask every credential shape we know about.
    pub fn redact(&self, input: &str) -> String {
        let out = self.url_token.replace_all(input, "x-access-token:***@");
        let out = self.basic_auth.replace_all(&out, "${1}***@");
        let out = self.bearer.replace_all(&out, "$1 ***");
        out.into_owned()
    }

    /// Mask occurrences of a known secret value outright.
    pub fn redact_secret<'a>(&self, input: &'a str, secret: &str) -> String {
        if secret.is_empty() {
            return input.to_owned();
        }
        input.replace(secret, "***")
    }
}

/// Shorten a secret to an audit-safe reference like `pat:****3kq9`.
pub fn secret_reference(kind: &str, secret: &str) -> String {
    let visible: String = secret.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    if secret.len() <= 4 {
        format!("{kind}:****")
    } else {
        format!("{kind}:****{visible}")
    }
}

#[cfg(test)]
#[path = "redact_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Branch naming: `<prefix>/<executionId>/<role>[-<slug>]`.
//!
//! Names are unique per (execution, role, slug) by construction; the slug
//! is normalized to lowercase alphanumerics and single dashes and the
//! whole name is truncated to a conservative length so every Git host
//! accepts it.

/// Default branch prefix.
pub const DEFAULT_PREFIX: &str = "parallax";

/// Conservative maximum branch name length.
const MAX_LEN: usize = 120;

/// Normalize free text into a slug: lowercase alphanumerics and dashes,
/// runs of dashes collapsed, no leading/trailing dash.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_dash = true; // suppress a leading dash
    for c in input.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            out.push(c);
            prev_dash = false;
        } else if !prev_dash {
            out.push('-');
            prev_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Assemble a branch name for an execution/role pair.
pub fn branch_name(prefix: &str, execution_id: &str, role: &str, slug: Option<&str>) -> String {
    let prefix = if prefix.is_empty() { DEFAULT_PREFIX } else { prefix };
    let mut role = slugify(role);
    if role.is_empty() {
        role = "task".to_owned();
    }
    let mut name = match slug.map(slugify).filter(|s| !s.is_empty()) {
        Some(slug) => format!("{prefix}/{execution_id}/{role}-{slug}"),
        None => format!("{prefix}/{execution_id}/{role}"),
    };
    if name.len() > MAX_LEN {
        name.truncate(MAX_LEN);
        while name.ends_with('-') || name.ends_with('/') {
            name.pop();
        }
    }
    name
}

#[cfg(test)]
#[path = "branch_tests.rs"]
mod tests;

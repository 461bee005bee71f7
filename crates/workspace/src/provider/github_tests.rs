// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use yare::parameterized;

use super::*;

#[parameterized(
    https = { "https://github.com/org/repo.git", "org/repo" },
    https_no_suffix = { "https://github.com/org/repo", "org/repo" },
    ssh = { "git@github.com:org/repo.git", "org/repo" },
    shorthand = { "github:org/repo", "org/repo" },
    trailing_slash = { "https://github.com/org/repo/", "org/repo" },
)]
fn slug_parsing(input: &str, expected: &str) {
    assert_eq!(repo_slug(input).unwrap(), expected);
}

#[test]
fn slug_rejects_non_github() {
    assert!(repo_slug("https://gitlab.com/org/repo.git").is_err());
    assert!(repo_slug("github:justowner").is_err());
}

#[tokio::test]
async fn mint_returns_configured_token() {
    let adapter = GithubAdapter::new(Some("ghs_app".to_owned()));
    let minted = adapter
        .mint_token("https://github.com/o/r.git", &GrantContext::for_execution("e"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(minted.token, "ghs_app");

    let bare = GithubAdapter::new(None);
    assert!(bare
        .mint_token("https://github.com/o/r.git", &GrantContext::for_execution("e"))
        .await
        .unwrap()
        .is_none());
}

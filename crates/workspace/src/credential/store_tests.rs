// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::os::unix::fs::PermissionsExt;

use super::*;

fn token(provider: Provider, secret: &str) -> OAuthToken {
    OAuthToken {
        access_token: secret.to_owned(),
        token_type: "bearer".to_owned(),
        scopes: vec!["repo".to_owned()],
        expires_at: Some(2_000_000_000),
        refresh_token: Some("refresh-1".to_owned()),
        provider,
        created_at: 1_700_000_000,
    }
}

#[test]
fn memory_round_trip_and_clear() {
    let store = MemoryTokenStore::new();
    let t = token(Provider::Github, "gho_secret");
    store.save(&t).unwrap();
    assert_eq!(store.get(Provider::Github).unwrap(), Some(t));
    assert_eq!(store.get(Provider::Gitlab).unwrap(), None);

    store.clear(Some(Provider::Github)).unwrap();
    assert_eq!(store.get(Provider::Github).unwrap(), None);
}

#[test]
fn plaintext_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(dir.path().join("tokens"), None).unwrap();
    let t = token(Provider::Github, "gho_plain");
    store.save(&t).unwrap();
    assert_eq!(store.get(Provider::Github).unwrap(), Some(t));

    let raw = std::fs::read_to_string(dir.path().join("tokens/github.token")).unwrap();
    assert!(raw.contains("gho_plain"), "plaintext store holds JSON");
}

#[test]
fn encrypted_round_trip_hides_secret_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(dir.path().join("tokens"), Some("passphrase-1")).unwrap();
    let t = token(Provider::Github, "gho_encrypted_secret");
    store.save(&t).unwrap();
    assert_eq!(store.get(Provider::Github).unwrap(), Some(t));

    let raw = std::fs::read_to_string(dir.path().join("tokens/github.token")).unwrap();
    assert!(!raw.contains("gho_encrypted_secret"));
    let (iv_hex, cipher_hex) = raw.trim().split_once(':').unwrap();
    assert_eq!(iv_hex.len(), 32, "16-byte IV as hex");
    assert!(cipher_hex.len() % 32 == 0, "whole AES blocks");
    assert!(iv_hex.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn wrong_passphrase_fails_closed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tokens");
    FileTokenStore::new(&path, Some("right"))
        .unwrap()
        .save(&token(Provider::Github, "s3cret"))
        .unwrap();

    let wrong = FileTokenStore::new(&path, Some("wrong")).unwrap();
    assert!(wrong.get(Provider::Github).is_err());
}

#[test]
fn random_iv_differs_between_writes() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(dir.path().join("tokens"), Some("p")).unwrap();
    let t = token(Provider::Github, "same-secret");
    store.save(&t).unwrap();
    let first = std::fs::read_to_string(dir.path().join("tokens/github.token")).unwrap();
    store.save(&t).unwrap();
    let second = std::fs::read_to_string(dir.path().join("tokens/github.token")).unwrap();
    assert_ne!(first, second, "fresh IV per write");
}

#[test]
fn file_modes_are_owner_only() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("tokens");
    let store = FileTokenStore::new(&base, Some("p")).unwrap();
    store.save(&token(Provider::Github, "s")).unwrap();

    let dir_mode = std::fs::metadata(&base).unwrap().permissions().mode() & 0o777;
    assert_eq!(dir_mode, 0o700);
    let file_mode =
        std::fs::metadata(base.join("github.token")).unwrap().permissions().mode() & 0o777;
    assert_eq!(file_mode, 0o600);
}

#[test]
fn list_and_clear_all() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(dir.path().join("tokens"), None).unwrap();
    store.save(&token(Provider::Github, "a")).unwrap();
    store.save(&token(Provider::Gitlab, "b")).unwrap();

    let mut listed = store.list().unwrap();
    listed.sort_by_key(|p| p.as_str());
    assert_eq!(listed, vec![Provider::Github, Provider::Gitlab]);

    store.clear(None).unwrap();
    assert!(store.list().unwrap().is_empty());
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use crate::error::SpawnErrorCause;

use super::*;

#[test]
fn preflight_rejects_missing_workdir() {
    let err = preflight("sh", Path::new("/nonexistent/dir")).unwrap_err();
    assert_eq!(err.cause, SpawnErrorCause::InvalidWorkdir);
}

#[test]
fn preflight_rejects_missing_binary() {
    let err = preflight("definitely-not-a-real-binary-xyz", Path::new("/tmp")).unwrap_err();
    assert_eq!(err.cause, SpawnErrorCause::CommandNotFound);
}

#[test]
fn resolve_finds_path_binaries() {
    let path = resolve_executable("sh").unwrap();
    assert!(path.ends_with("sh"));
}

#[test]
fn resolve_rejects_non_executable_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("data.txt");
    std::fs::write(&file, "hello").unwrap();
    let err = resolve_executable(file.to_str().unwrap()).unwrap_err();
    assert_eq!(err.cause, SpawnErrorCause::PermissionDenied);
}

#[test]
fn surfaced_codes() {
    assert_eq!(ExitStatus { code: Some(0), signal: None }.surfaced_code(), 0);
    assert_eq!(ExitStatus { code: Some(2), signal: None }.surfaced_code(), 2);
    assert_eq!(
        ExitStatus { code: None, signal: Some(nix::sys::signal::Signal::SIGINT as i32) }
            .surfaced_code(),
        130
    );
}

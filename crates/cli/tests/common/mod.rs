// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test utilities for CLI integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Temp working directory with a coordination config
pub fn setup_test_env() -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp directory");
    fs::write(
        temp.path().join("tollgate.toml"),
        r#"
[facilitator]
barrier_initial_wait = "3s"
restraint_initial_wait = "2s"

[restraint.deploy-slots]
capacity = 3

[restraint.db-migrations]
capacity = 2
strategy = "asap"
"#,
    )
    .expect("Failed to write config");
    temp
}

/// `tg` command running inside `dir`
pub fn tg(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("tg").expect("tg binary");
    cmd.current_dir(dir);
    cmd
}

/// Write a JSON file into `dir`
pub fn write_json(dir: &Path, name: &str, value: serde_json::Value) {
    fs::write(dir.join(name), value.to_string()).expect("Failed to write json");
}

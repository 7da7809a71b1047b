//! Integration tests for the command-line interface
//!
//! Runs the built binary against temporary inputs. No real Android tooling
//! is involved: the runs here either stop at input validation or fail to
//! start the configured tools.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn command(args: &[&str]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_apk-patcher"));
    cmd.args(args)
        .env_remove("DEBUG")
        .env_remove("APK_PATCHER_CONFIG")
        .env("RUST_LOG", "off");
    cmd
}

fn apk_patcher(args: &[&str]) -> Output {
    command(args).output().unwrap()
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

/// Workspace with an empty target and source, plus a settings file whose
/// Java launcher does not exist.
fn setup_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("app.apk"), b"").unwrap();
    fs::write(dir.path().join("library.aar"), b"").unwrap();
    fs::write(
        dir.path().join("config.toml"),
        "[tools]\njava = \"/nonexistent/bin/java\"\n",
    )
    .unwrap();
    dir
}

#[test]
fn test_patch_help() {
    let output = apk_patcher(&["patch", "--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--target"));
    assert!(stdout.contains("--source"));
}

#[test]
fn test_missing_source_is_reported() {
    let workspace = setup_workspace();
    let missing = workspace.path().join("missing.aar");

    let output = apk_patcher(&[
        "patch",
        "--target",
        path_str(&workspace.path().join("app.apk")),
        "--source",
        path_str(&missing),
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("File does not exist! Provided path:"));
    assert!(stderr.contains("missing.aar"));
}

#[test]
fn test_missing_target_is_reported_first() {
    let workspace = setup_workspace();

    let output = apk_patcher(&[
        "patch",
        "-t",
        path_str(&workspace.path().join("gone.apk")),
        "-s",
        path_str(&workspace.path().join("also-gone.aar")),
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("gone.apk"));
    assert!(!stderr.contains("also-gone.aar"));
}

#[test]
fn test_source_is_required() {
    let workspace = setup_workspace();

    let output = apk_patcher(&[
        "patch",
        "--target",
        path_str(&workspace.path().join("app.apk")),
    ]);

    assert!(!output.status.success());
}

#[test]
fn test_tool_failure_reports_generic_error() {
    let workspace = setup_workspace();
    let workdir = workspace.path().join("work");

    let output = apk_patcher(&[
        "patch",
        "--target",
        path_str(&workspace.path().join("app.apk")),
        "--source",
        path_str(&workspace.path().join("library.aar")),
        "--config",
        path_str(&workspace.path().join("config.toml")),
        "--workdir",
        path_str(&workdir),
    ]);

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Decode target APK file"));
    assert!(stdout.contains("Error patching APK. Please check logs!"));
    assert!(!stdout.contains("Successfully patched APK!"));
    // The decode stage failed, so nothing was decoded.
    assert!(!workdir.join("decompiled-apk").exists());
}

#[test]
fn test_invalid_settings_fail_the_run() {
    let workspace = setup_workspace();
    fs::write(
        workspace.path().join("config.toml"),
        "[compile]\nmin_api = 0\n",
    )
    .unwrap();

    let output = apk_patcher(&[
        "patch",
        "--target",
        path_str(&workspace.path().join("app.apk")),
        "--source",
        path_str(&workspace.path().join("library.aar")),
        "--config",
        path_str(&workspace.path().join("config.toml")),
    ]);

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Error patching APK. Please check logs!"));
}

#[test]
fn test_debug_mode_prints_underlying_error() {
    let workspace = setup_workspace();
    let workdir = workspace.path().join("work");

    let output = command(&[
        "patch",
        "--target",
        path_str(&workspace.path().join("app.apk")),
        "--source",
        path_str(&workspace.path().join("library.aar")),
        "--config",
        path_str(&workspace.path().join("config.toml")),
        "--workdir",
        path_str(&workdir),
    ])
    .env("DEBUG", "true")
    .output()
    .unwrap();

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.contains("Error patching APK. Please check logs!"));
    assert!(stdout.contains("[DEBUG] Prepare workspace"));
    assert!(stderr.contains("failed to start apktool"));
}

#[test]
fn test_underlying_error_hidden_without_debug() {
    let workspace = setup_workspace();

    let output = apk_patcher(&[
        "patch",
        "--target",
        path_str(&workspace.path().join("app.apk")),
        "--source",
        path_str(&workspace.path().join("library.aar")),
        "--config",
        path_str(&workspace.path().join("config.toml")),
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("failed to start apktool"));
}

//! Integration tests for the `magick-forge` binary
//!
//! Covers the commands that run without the SDK or any native build tool:
//! `plan`, `clean`, `doctor`, and `build` up to its precondition checks.

mod common;

use assert_fs::prelude::*;
use common::TestProject;
use predicates::prelude::*;
use std::process::Command;

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ============================================
// plan
// ============================================

#[test]
fn test_plan_json_lists_recipes_in_build_order() {
    let project = TestProject::with_sources();

    let output = project.run(&["plan", "--json"], None);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let plan: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let names: Vec<&str> = plan["recipes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 15);
    assert_eq!(names.first(), Some(&"zlib"));
    assert_eq!(names.last(), Some(&"ImageMagick"));
    assert_eq!(plan["profile"], "debug");
    assert_eq!(plan["link"]["label"], "link");
    let reset = plan["recipes"][0]["reset"].as_str().unwrap();
    assert!(reset.contains("lib/zlib && git clean -xdf && git checkout ."));
}

#[test]
fn test_plan_honours_release_signal() {
    let project = TestProject::with_sources();

    let output = Command::new(env!("CARGO_BIN_EXE_magick-forge"))
        .arg("-C")
        .arg(project.path())
        .args(["plan", "--json"])
        .env("RELEASE", "1")
        .env("EMSDK", "/opt/emsdk")
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let plan: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(plan["profile"], "release");
    assert!(plan["environment"]["CFLAGS"]
        .as_str()
        .unwrap()
        .contains("-Oz"));
    assert_eq!(
        plan["environment"]["TOOLCHAIN_FILE"],
        "/opt/emsdk/upstream/emscripten/cmake/Modules/Platform/Emscripten.cmake"
    );
}

#[test]
fn test_plan_clamps_requested_jobs() {
    let project = TestProject::with_sources();

    let output = project.run(&["plan", "--json", "-j", "64"], None);

    let plan: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(plan["jobs"], 5);
}

#[test]
fn test_plan_text_names_every_phase() {
    let project = TestProject::with_sources();

    let output = project.run(&["plan"], None);

    let text = stdout(&output);
    assert!(output.status.success());
    assert!(predicate::str::contains("[1/15] zlib (autotools)").eval(&text));
    assert!(predicate::str::contains("configure: emconfigure ./configure").eval(&text));
    assert!(predicate::str::contains("link: /bin/bash ./libtool").eval(&text));
}

// ============================================
// build
// ============================================

#[test]
fn test_build_without_sdk_fails() {
    let project = TestProject::with_sources();

    let output = project.run(&["build"], None);

    assert_eq!(output.status.code(), Some(1));
    assert!(predicate::str::contains("EMSDK").eval(&stderr(&output)));
    assert!(!project.file_exists("out/magick.wasm"));
}

#[test]
fn test_build_with_missing_tree_names_it() {
    let project = TestProject::new();
    project.create_file("js/pre.js", "");
    project.create_file("js/post.js", "");
    let sdk = tempfile::TempDir::new().unwrap();

    let output = project.run(&[], Some(sdk.path()));

    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(predicate::str::contains("Source tree for 'zlib' not found").eval(&err));
}

#[test]
fn test_build_without_host_tools_fails_before_any_step() {
    let project = TestProject::with_sources();
    let sdk = tempfile::TempDir::new().unwrap();
    let empty_path = tempfile::TempDir::new().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_magick-forge"))
        .arg("-C")
        .arg(project.path())
        .arg("build")
        .env("EMSDK", sdk.path())
        .env("PATH", empty_path.path())
        .env_remove("RELEASE")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(predicate::str::contains("Required tool 'git' not found").eval(&stderr(&output)));
    assert!(!project.file_exists("out"));
}

#[test]
fn test_invalid_config_is_reported() {
    let project = TestProject::with_sources();
    project.create_file("magick-forge.toml", "[build]\nmax_jobs = 0\n");

    let output = project.run(&["plan"], None);

    assert!(!output.status.success());
    assert!(predicate::str::contains("build.max_jobs").eval(&stderr(&output)));
}

// ============================================
// clean
// ============================================

#[test]
fn test_clean_removes_prefix_but_keeps_sources() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("out/lib/libz.a").touch().unwrap();
    temp.child("out/magick.wasm").touch().unwrap();
    temp.child("lib/zlib/configure").touch().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_magick-forge"))
        .arg("-C")
        .arg(temp.path())
        .arg("clean")
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    temp.child("out").assert(predicate::path::missing());
    temp.child("lib/zlib/configure").assert(predicate::path::exists());
}

#[test]
fn test_clean_twice_is_harmless() {
    let project = TestProject::new();

    let first = project.run(&["clean"], None);
    let second = project.run(&["clean"], None);

    assert!(first.status.success());
    assert!(second.status.success());
    assert!(stdout(&second).contains("Nothing to clean"));
}

// ============================================
// doctor
// ============================================

#[test]
fn test_doctor_json_reports_missing_inputs() {
    let project = TestProject::new();

    let output = project.run(&["doctor", "--json"], None);

    assert!(!output.status.success());
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["status"], "error");
    let checks = report["checks"].as_array().unwrap();
    let scripts = checks
        .iter()
        .find(|c| c["name"] == "Loader scripts")
        .unwrap();
    assert_eq!(scripts["passed"], false);
    assert!(checks.iter().any(|c| c["name"] == "zlib" && c["passed"] == false));
}

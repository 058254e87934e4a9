//! Integration Test: Layering
//!
//! **Policy**: `actionq-core` is headless. Terminal crates belong to the TUI,
//! and the event loop never touches the file system directly.

use std::fs;

use architectural_enforcement::{assert_no_violations, rust_sources, workspace_root};

const UI_CRATES: &[&str] = &["ratatui", "crossterm"];

#[test]
fn test_core_manifest_has_no_ui_crates() {
    let manifest = fs::read_to_string(workspace_root().join("monitor/core/Cargo.toml"))
        .expect("read monitor/core/Cargo.toml");

    let violations: Vec<String> = manifest
        .lines()
        .filter(|line| {
            let key = line.split('=').next().unwrap_or("").trim();
            UI_CRATES.contains(&key)
        })
        .map(|line| format!("monitor/core/Cargo.toml - UI dependency: {}", line.trim()))
        .collect();

    assert_no_violations(&violations, "actionq-core must not depend on terminal UI crates");
}

#[test]
fn test_core_sources_do_not_use_ui_crates() {
    let violations: Vec<String> = rust_sources("monitor/core/src")
        .iter()
        .flat_map(|file| {
            file.violations("UI crate", |line| {
                UI_CRATES
                    .iter()
                    .any(|krate| line.contains(&format!("{krate}::")))
            })
        })
        .collect();

    assert_no_violations(&violations, "actionq-core must not use terminal UI crates");
}

#[test]
fn test_event_loop_does_no_blocking_file_io() {
    let violations: Vec<String> = ["monitor/core/src/monitor.rs", "monitor/core/src/transport"]
        .iter()
        .flat_map(|dir| rust_sources(dir))
        .flat_map(|file| {
            file.violations("Blocking file I/O", |line| {
                line.contains("std::fs") || line.contains("File::open")
            })
        })
        .collect();

    assert_no_violations(
        &violations,
        "The monitor event loop must not block on the file system",
    );
}

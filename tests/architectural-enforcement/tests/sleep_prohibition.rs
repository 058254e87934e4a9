//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code must not block a thread to wait. Timers go
//! through `tokio::time`; audio completion arrives as events.
//! **Exceptions**: test code.

use architectural_enforcement::{assert_no_violations, rust_sources};

const PRODUCTION_DIRS: &[&str] = &["monitor/core/src", "tui/src"];

#[test]
fn test_no_thread_sleep_in_production_code() {
    let violations: Vec<String> = PRODUCTION_DIRS
        .iter()
        .flat_map(|dir| rust_sources(dir))
        .flat_map(|file| {
            file.violations("Thread sleep", |line| line.contains("thread::sleep"))
        })
        .collect();

    assert_no_violations(
        &violations,
        "Thread sleeps found; use tokio::time or wait on an event",
    );
}

#[test]
fn test_production_dirs_exist() {
    for dir in PRODUCTION_DIRS {
        assert!(
            !rust_sources(dir).is_empty(),
            "no sources found under {dir}; the scan would be vacuous"
        );
    }
}

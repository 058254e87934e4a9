//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - No thread sleeps in production code
//! - No blocking file I/O on the monitor event loop
//! - The monitor core stays free of terminal UI crates
//!
//! These tests are designed to catch violations early in the development cycle.

use std::fs;
use std::path::{Path, PathBuf};

/// Workspace root, two levels above this crate
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .canonicalize()
        .unwrap_or_else(|_| PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../..")))
}

/// A source file with its production lines
pub struct SourceFile {
    /// Path relative to the workspace root
    pub path: PathBuf,
    /// Lines before the first `#[cfg(test)]`, comments stripped
    pub lines: Vec<String>,
}

impl SourceFile {
    /// Report `what` for every production line matching `pred`
    pub fn violations(&self, what: &str, pred: impl Fn(&str) -> bool) -> Vec<String> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, line)| pred(line))
            .map(|(idx, line)| {
                format!("{}:{} - {}: {}", self.path.display(), idx + 1, what, line.trim())
            })
            .collect()
    }
}

/// Every `.rs` file under `dir` (relative to the workspace root)
pub fn rust_sources(dir: &str) -> Vec<SourceFile> {
    let root = workspace_root();
    let base = root.join(dir);
    if !base.exists() {
        return Vec::new();
    }

    walkdir::WalkDir::new(&base)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .filter_map(|e| {
            let content = fs::read_to_string(e.path()).ok()?;
            let lines = content
                .lines()
                .take_while(|line| line.trim() != "#[cfg(test)]")
                .map(|line| line.split("//").next().unwrap_or(line).to_string())
                .collect();
            Some(SourceFile {
                path: e.path().strip_prefix(&root).unwrap_or(e.path()).to_path_buf(),
                lines,
            })
        })
        .collect()
}

/// Fail with every violation listed
pub fn assert_no_violations(violations: &[String], rule: &str) {
    if violations.is_empty() {
        return;
    }
    eprintln!("\n❌ {rule}\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    panic!("\nFound {} violation(s).\nFix these before merging!", violations.len());
}

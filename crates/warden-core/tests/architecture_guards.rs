//! Architecture guard tests for the warden workspace.
//!
//! These tests scan source files to enforce design-level consistency:
//! - Error handling style (thiserror vs hand-written Display)
//! - No `Result<_, String>` in warden-core
//! - File size limits
//! - Sandbox output never leaves the orchestrator unredacted
//!
//! Run: `cargo test --package warden-core --test architecture_guards -- --nocapture`

use std::fs;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Walk `dir` recursively, collecting .rs files that pass `filter`.
fn collect_rs_files(dir: &Path, filter: &dyn Fn(&Path) -> bool) -> Vec<PathBuf> {
    let mut result = Vec::new();
    if !dir.exists() {
        return result;
    }
    for entry in walkdir(dir) {
        if entry.extension().is_some_and(|e| e == "rs") && filter(&entry) {
            result.push(entry);
        }
    }
    result
}

/// Simple recursive directory walk (no external dep).
fn walkdir(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(walkdir(&path));
            } else {
                files.push(path);
            }
        }
    }
    files
}

/// Return the workspace root (two levels up from warden-core/tests/).
fn workspace_root() -> PathBuf {
    let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR")); // crates/warden-core
    manifest
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .expect("cannot determine workspace root")
        .to_path_buf()
}

fn is_test_file(path: &Path) -> bool {
    let s = path.to_string_lossy();
    s.contains("/tests/") || s.ends_with("/tests.rs") || s.ends_with("_tests.rs")
}

/// Source text before the first inline test module.
fn non_test_source(content: &str) -> &str {
    content
        .find("#[cfg(test)]")
        .map_or(content, |pos| &content[..pos])
}

/// Strip the workspace root prefix for display.
fn rel(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

fn fail(rule: &str, summary: &str, violations: &[String]) {
    if violations.is_empty() {
        return;
    }
    let mut msg = format!("\n[{rule}] {summary}\n\n");
    for v in violations {
        msg.push_str(&format!("  {v}\n"));
    }
    panic!("{msg}");
}

// ---------------------------------------------------------------------------
// RS-ERR-01: Error types must use thiserror, no hand-written Display
// ---------------------------------------------------------------------------

#[test]
fn test_error_types_use_thiserror() {
    let root = workspace_root();
    let files = collect_rs_files(&root.join("crates"), &|p| !is_test_file(p));
    let mut violations = Vec::new();

    for file in &files {
        let Ok(content) = fs::read_to_string(file) else {
            continue;
        };
        for (i, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.starts_with("impl")
                && trimmed.contains("Display for")
                && trimmed.contains("Error")
            {
                violations.push(format!("{}:{} -> {}", rel(file, &root), i + 1, trimmed));
            }
        }
    }

    fail(
        "RS-ERR-01",
        "Hand-written Display for Error types detected. Use #[derive(thiserror::Error)] instead.",
        &violations,
    );
}

// ---------------------------------------------------------------------------
// RS-ERR-02: No Result<_, String> in warden-core (use WardenError/thiserror)
// ---------------------------------------------------------------------------

#[test]
fn test_no_result_string_in_core() {
    let root = workspace_root();
    let files = collect_rs_files(&root.join("crates/warden-core/src"), &|p| !is_test_file(p));
    let mut violations = Vec::new();

    for file in &files {
        let Ok(content) = fs::read_to_string(file) else {
            continue;
        };
        for (i, line) in non_test_source(&content).lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.starts_with("//") {
                continue;
            }
            if let Some(pos) = trimmed.find("Result<") {
                let after = &trimmed[pos..];
                if after.contains(", String>") || after.contains(",String>") {
                    violations.push(format!("{}:{} -> {}", rel(file, &root), i + 1, trimmed));
                }
            }
        }
    }

    fail(
        "RS-ERR-02",
        "Result<_, String> found in warden-core. Use WardenResult or a thiserror type.",
        &violations,
    );
}

// ---------------------------------------------------------------------------
// RS-SIZE-01: File size limits (500 lines for non-test files)
// ---------------------------------------------------------------------------

#[test]
fn test_file_size_limits() {
    const MAX_LINES: usize = 500;

    let root = workspace_root();
    let files = collect_rs_files(&root.join("crates"), &|p| !is_test_file(p));
    let mut violations = Vec::new();

    for file in &files {
        let Ok(content) = fs::read_to_string(file) else {
            continue;
        };
        let count = content.lines().count();
        if count > MAX_LINES {
            violations.push(format!("{} ({} lines)", rel(file, &root), count));
        }
    }

    fail(
        "RS-SIZE-01",
        "Files exceeding 500 lines (split into submodules).",
        &violations,
    );
}

// ---------------------------------------------------------------------------
// RS-SBX-01: Orchestrator redacts both output streams
// ---------------------------------------------------------------------------

#[test]
fn test_orchestrator_redacts_output() {
    let root = workspace_root();
    let path = root.join("crates/warden-core/src/sandbox/orchestrator.rs");
    let content = fs::read_to_string(&path).expect("orchestrator source present");

    let mut violations = Vec::new();
    for stream in ["result.stdout", "result.stderr"] {
        let needle = format!("{stream} = SecretRedactor::redact(&{stream})");
        if !content.contains(&needle) {
            violations.push(format!("{}: missing `{}`", rel(&path, &root), needle));
        }
    }

    fail(
        "RS-SBX-01",
        "Sandbox output must pass through SecretRedactor before leaving the orchestrator.",
        &violations,
    );
}

//! Structural tests for architectural boundary enforcement.
//!
//! These tests scan source files to verify that the layer boundaries
//! (domain → application → infra / output → commands) are maintained.

use std::path::{Path, PathBuf};

fn src_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src")
}

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

fn rel(file: &Path) -> String {
    file.strip_prefix(env!("CARGO_MANIFEST_DIR"))
        .unwrap_or(file)
        .display()
        .to_string()
        .replace('\\', "/")
}

/// Read a file and strip comment lines to avoid false positives.
fn read_non_comment_lines(path: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .filter(|l| {
            let trimmed = l.trim();
            !trimmed.starts_with("//") && !trimmed.starts_with("/*") && !trimmed.starts_with('*')
        })
        .map(String::from)
        .collect()
}

/// Track brace depth and return whether a line is inside a `#[cfg(test)]` block.
struct CfgTestTracker {
    in_test_block: bool,
    brace_depth: i32,
    test_block_start_depth: i32,
}

impl CfgTestTracker {
    fn new() -> Self {
        Self {
            in_test_block: false,
            brace_depth: 0,
            test_block_start_depth: 0,
        }
    }

    /// Process a line and return `true` if it's inside a `#[cfg(test)]` block.
    fn process_line(&mut self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.contains("#[cfg(test)]") {
            self.in_test_block = true;
            self.test_block_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_test_block && self.brace_depth <= self.test_block_start_depth {
                        self.in_test_block = false;
                    }
                }
                _ => {}
            }
        }
        self.in_test_block
    }
}

/// Non-comment lines outside `#[cfg(test)]` blocks, with 1-based line numbers.
fn production_lines(path: &Path) -> Vec<(usize, String)> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let mut tracker = CfgTestTracker::new();
    content
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let in_test = tracker.process_line(line);
            let trimmed = line.trim();
            (!in_test && !trimmed.is_empty() && !trimmed.starts_with("//"))
                .then(|| (i + 1, line.to_string()))
        })
        .collect()
}

/// Flag every production line under `dir` containing one of `patterns`.
fn scan(dir: &Path, patterns: &[&str]) -> Vec<String> {
    let mut violations = Vec::new();
    for file in collect_rs_files(dir) {
        for (lineno, line) in production_lines(&file) {
            for pattern in patterns {
                if line.contains(pattern) {
                    violations.push(format!("{}:{lineno}: `{pattern}`: {}", rel(&file), line.trim()));
                }
            }
        }
    }
    violations
}

// ── Layer dependencies ───────────────────────────────────────────────────────

#[test]
fn domain_is_pure() {
    let violations = scan(
        &src_dir().join("domain"),
        &[
            "crate::infra",
            "crate::application",
            "crate::commands",
            "crate::output",
            "tokio::",
            "std::fs",
            "std::process",
            "std::net",
        ],
    );
    assert!(
        violations.is_empty(),
        "domain/ must stay free of I/O and outer layers:\n{}",
        violations.join("\n")
    );
}

#[test]
fn application_has_no_infra_or_output_imports() {
    let violations = scan(
        &src_dir().join("application"),
        &["crate::infra::", "crate::output::", "crate::commands::"],
    );
    assert!(
        violations.is_empty(),
        "application/ must not import from infra/, output/ or commands/:\n{}",
        violations.join("\n")
    );
}

#[test]
fn application_has_no_blocking_io() {
    let violations = scan(
        &src_dir().join("application"),
        &["std::fs::", "std::process::Command", "std::net::", "reqwest::"],
    );
    assert!(
        violations.is_empty(),
        "application/ must reach the outside world through ports only:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_imports_from_commands_or_output() {
    let violations = scan(&src_dir().join("infra"), &["crate::commands", "crate::output"]);
    assert!(
        violations.is_empty(),
        "infra/ must not import from commands/ or output/:\n{}",
        violations.join("\n")
    );
}

#[test]
fn services_and_adapters_have_no_print_macros() {
    let mut violations = scan(&src_dir().join("infra"), &["println!", "eprintln!"]);
    violations.extend(scan(&src_dir().join("application"), &["println!", "eprintln!"]));
    assert!(
        violations.is_empty(),
        "use tracing or the ProgressReporter port instead of print macros:\n{}",
        violations.join("\n")
    );
}

// ── Trait bounds over concrete types ─────────────────────────────────────────

#[test]
fn no_concrete_adapter_types_in_service_signatures() {
    let concrete_types = [
        "OciCli",
        "OpenSshSession",
        "OpenSshFactory",
        "CloudflareDns",
        "TokioCommandRunner",
    ];
    let mut violations = Vec::new();
    for file in collect_rs_files(&src_dir().join("application")) {
        for line in read_non_comment_lines(&file) {
            for concrete in &concrete_types {
                if line.contains(concrete) {
                    violations.push(format!("{}: `{concrete}`: {}", rel(&file), line.trim()));
                }
            }
        }
    }
    assert!(
        violations.is_empty(),
        "application/ must depend on port traits, not adapters:\n{}",
        violations.join("\n")
    );
}

#[test]
fn process_runner_constructed_only_in_infra_or_app() {
    let mut violations = Vec::new();
    for file in collect_rs_files(&src_dir()) {
        let path = rel(&file);
        if path.contains("/infra/") || path.ends_with("app.rs") {
            continue;
        }
        for (lineno, line) in production_lines(&file) {
            if line.contains("TokioCommandRunner::") {
                violations.push(format!("{path}:{lineno}: {}", line.trim()));
            }
        }
    }
    assert!(
        violations.is_empty(),
        "TokioCommandRunner must be built by AppContext::runner():\n{}",
        violations.join("\n")
    );
}

// ── Command handlers ─────────────────────────────────────────────────────────

#[test]
fn no_inline_json_branching_in_commands() {
    let mut violations = Vec::new();
    for file in collect_rs_files(&src_dir().join("commands")) {
        for (i, line) in read_non_comment_lines(&file).iter().enumerate() {
            let trimmed = line.trim();
            if line.contains("json: bool")
                || trimmed.starts_with("if json")
                || trimmed.starts_with("if !json")
                || line.contains("serde_json::")
            {
                violations.push(format!("{}:{}: {trimmed}", rel(&file), i + 1));
            }
        }
    }
    assert!(
        violations.is_empty(),
        "Found inline JSON handling in commands/ (use app.renderer() instead):\n{}",
        violations.join("\n")
    );
}

#[test]
fn command_handlers_accept_app_context() {
    let mut violations = Vec::new();
    for file in collect_rs_files(&src_dir().join("commands")) {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        if !content.contains("pub async fn run(") && !content.contains("pub fn run(") {
            continue;
        }
        if !content.contains("app: &AppContext") {
            violations.push(rel(&file));
        }
    }
    assert!(
        violations.is_empty(),
        "Command handlers must accept &AppContext:\n{}",
        violations.join("\n")
    );
}

#[test]
fn commands_use_standardized_confirmation() {
    let violations = scan(
        &src_dir().join("commands"),
        &["stdin().lock()", "dialoguer::", "Confirm::new()"],
    );
    assert!(
        violations.is_empty(),
        "Commands must use app.confirm() for user prompts:\n{}",
        violations.join("\n")
    );
}

/// Each file in `commands/` stays a thin adapter over application services.
#[test]
fn command_handlers_are_reasonably_sized() {
    let mut violations = Vec::new();
    for file in collect_rs_files(&src_dir().join("commands")) {
        let line_count = production_lines(&file).len();
        if line_count > 125 {
            violations.push(format!("{}: {line_count} non-test lines (limit: 125)", rel(&file)));
        }
    }
    assert!(
        violations.is_empty(),
        "Command handler files exceed 125-line limit (extract logic to application services):\n{}",
        violations.join("\n")
    );
}

#[test]
fn no_module_level_dead_code_allows_in_layers() {
    let mut violations = Vec::new();
    for layer in ["domain", "application", "infra", "output", "commands"] {
        for file in collect_rs_files(&src_dir().join(layer)) {
            let Ok(content) = std::fs::read_to_string(&file) else {
                continue;
            };
            for (i, line) in content.lines().enumerate() {
                if line.trim() == "#![allow(dead_code)]" {
                    violations.push(format!("{}:{}", rel(&file), i + 1));
                }
            }
        }
    }
    assert!(
        violations.is_empty(),
        "Module-level #![allow(dead_code)] found (use item-level suppression:\n{}",
        violations.join("\n")
    );
}

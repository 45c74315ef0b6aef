//! Preflight checks for release readiness.
//!
//! Validates the git state, branch, and remote sync before a release.
//! Returns structured results that the CLI formats; this module never
//! writes anything.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::Compiled;
use crate::git;
use crate::release_type;

/// A single preflight check result.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// Human-readable name of the check.
    pub name: String,
    /// Whether the check passed.
    pub passed: bool,
    /// Description of the result (reason for failure, or confirmation).
    pub message: String,
}

/// Full preflight report.
#[derive(Debug, Clone, Serialize)]
pub struct PreflightReport {
    /// Individual check results.
    pub checks: Vec<CheckResult>,
    /// Whether all checks passed.
    pub all_passed: bool,
}

/// Run all preflight checks.
///
/// # Arguments
/// * `compiled` — compiled configuration, for matching the active release type
/// * `env` — environment variables consulted by release-type matching
#[instrument(skip_all)]
pub fn run_preflight(compiled: &Compiled, env: &HashMap<String, String>) -> PreflightReport {
    let mut checks = Vec::new();

    let in_repo = check_git_repo();
    let is_repo = in_repo.passed;
    checks.push(in_repo);

    if !is_repo {
        return PreflightReport { all_passed: false, checks };
    }

    let clean = match git::is_clean() {
        Ok(clean) => {
            checks.push(CheckResult {
                name: "Working tree".into(),
                passed: true,
                message: if clean { "Clean working tree".into() } else { "Uncommitted changes present (may still be allowed by the active release type)".into() },
            });
            clean
        }
        Err(e) => {
            checks.push(CheckResult { name: "Working tree".into(), passed: false, message: format!("Failed to check: {e}") });
            false
        }
    };

    checks.push(check_release_type(compiled, env, clean));
    checks.push(check_remote_sync());

    let all_passed = checks.iter().all(|c| c.passed);
    debug!(all_passed, check_count = checks.len(), "preflight complete");

    PreflightReport { checks, all_passed }
}

fn check_git_repo() -> CheckResult {
    match git::is_inside_repo() {
        Ok(true) => CheckResult { name: "Git repository".into(), passed: true, message: "Inside a git repository".into() },
        Ok(false) => CheckResult { name: "Git repository".into(), passed: false, message: "Not inside a git repository".into() },
        Err(e) => CheckResult { name: "Git repository".into(), passed: false, message: format!("Failed to check: {e}") },
    }
}

fn check_release_type(compiled: &Compiled, env: &HashMap<String, String>, clean: bool) -> CheckResult {
    let current = match git::current_branch() {
        Ok(Some(b)) => b,
        Ok(None) => return CheckResult { name: "Release type".into(), passed: false, message: "Detached HEAD — not on any branch".into() },
        Err(e) => return CheckResult { name: "Release type".into(), passed: false, message: format!("Failed to check: {e}") },
    };

    let active = release_type::select(&compiled.release_types, &current, env, clean);
    if active.name == "default" {
        CheckResult { name: "Release type".into(), passed: false, message: format!("No configured release type matches branch '{current}' — falling back to the no-op default") }
    } else {
        CheckResult { name: "Release type".into(), passed: true, message: format!("On '{current}', active release type '{}'", active.name) }
    }
}

fn check_remote_sync() -> CheckResult {
    match git::is_remote_in_sync() {
        Ok(true) => CheckResult { name: "Remote sync".into(), passed: true, message: "Local branch is in sync with remote".into() },
        Ok(false) => CheckResult { name: "Remote sync".into(), passed: false, message: "Local branch is out of sync with remote (pull or push needed)".into() },
        Err(e) => CheckResult { name: "Remote sync".into(), passed: false, message: format!("Failed to check: {e}") },
    }
}

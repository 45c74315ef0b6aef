//! State record: the root object threaded through a run and persisted
//! between invocations.

use std::io::Write as _;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scope::Scope;
use crate::version::Version;

/// Errors raised while loading or persisting [`State`].
#[derive(Error, Debug)]
pub enum StateError {
    /// Failed to read or write the state file.
    #[error("state I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to deserialize a YAML state file.
    #[error("invalid YAML state: {0}")]
    Yaml(String),

    /// Failed to (de)serialize a JSON state file.
    #[error("invalid JSON state: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using [`StateError`].
pub type StateResult<T> = Result<T, StateError>;

/// The full engine state: a root record holding the effective
/// configuration snapshot, active scheme, branch, bump, scope, inferred
/// version, version range, release-type name, changelog path, timestamp,
/// working directory, and capability caches.
///
/// Serializable to YAML or JSON (dispatched by file extension). Unknown
/// fields round-trip via `extra`, for forward compatibility with newer
/// state files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    /// Version scheme in effect (currently always `"semver"`).
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// The current branch name.
    #[serde(default)]
    pub branch: String,

    /// Aggregate bump component chosen for this run, if any.
    #[serde(default)]
    pub bump: Option<String>,

    /// Computed release scope, once Infer has run.
    #[serde(default)]
    pub scope: Option<Scope>,

    /// Inferred next version, once Infer has run.
    #[serde(default)]
    pub version: Option<Version>,

    /// The version-range pattern enforced against `version`.
    #[serde(default)]
    pub version_range: Option<String>,

    /// Name of the active release type.
    #[serde(default)]
    pub release_type: Option<String>,

    /// Path to the rendered changelog, if `Make` produced one.
    #[serde(default)]
    pub changelog: Option<Utf8PathBuf>,

    /// ISO-8601 timestamp of when Infer ran.
    #[serde(default)]
    pub timestamp: String,

    /// Working directory the run executed in.
    #[serde(default)]
    pub directory: Utf8PathBuf,

    /// Explicit version override, if the user configured one.
    /// `previousVersion` is still computed from history even when this is
    /// set.
    #[serde(default)]
    pub overridden_version: Option<Version>,

    /// Resolved string-valued configuration fields referenced by
    /// `{{configuration.*}}` templates (e.g. `releasePrefix`).
    #[serde(default)]
    pub configuration: std::collections::BTreeMap<String, String>,

    /// Whether Mark has recorded a successful commit+tag for `version`.
    #[serde(default)]
    pub mark_succeeded: bool,

    /// Whether Make has recorded a successful changelog render for `version`.
    #[serde(default)]
    pub make_succeeded: bool,

    /// Names of publication services that succeeded for `version`.
    #[serde(default)]
    pub publish_succeeded: Vec<String>,

    /// Unknown fields preserved across a load/save round-trip.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_scheme() -> String {
    "semver".to_string()
}

impl State {
    /// Resolve a dotted template path (`releaseScope.finalCommit`,
    /// `configuration.releasePrefix`, bare `version`, ...) against this
    /// state. Returns `None` for anything unrecognized.
    #[must_use]
    pub fn lookup(&self, root: &str, rest: &[&str]) -> Option<String> {
        match root {
            "branch" => Some(self.branch.clone()),
            "version" => self.version.as_ref().map(ToString::to_string),
            "bump" => self.bump.clone(),
            "releaseType" => self.release_type.clone(),
            "versionRange" => self.version_range.clone(),
            "directory" => Some(self.directory.to_string()),
            "releaseScope" => self.scope.as_ref().and_then(|scope| scope.lookup(rest.first().copied()?)),
            "configuration" => rest.first().and_then(|key| self.configuration.get(*key)).cloned(),
            _ => None,
        }
    }

    /// Compact `YYYYMMDDHHMMSS` form of `timestamp`, for the
    /// `timestampYYYYMMDDHHMMSS` template helper.
    #[must_use]
    pub fn timestamp_compact(&self) -> String {
        self.timestamp.chars().filter(|c| c.is_ascii_digit()).collect()
    }

    /// A state populated with fixed, deterministic values — used by unit
    /// tests in this crate that render templates without a real repository.
    #[cfg(test)]
    #[must_use]
    pub fn empty_for_test() -> Self {
        use crate::git::Commit;

        Self {
            branch: "main".to_string(),
            version: Some(Version::new(1, 2, 3)),
            timestamp: "2026-01-02T03:04:05Z".to_string(),
            scope: Some(Scope {
                previous_version: Version::new(1, 2, 2),
                previous_version_commit: Some("cafebabe".to_string()),
                prime_version: Version::new(1, 2, 2),
                initial_commit: "deadbeef".to_string(),
                final_commit: "deadbeef".to_string(),
                significant_commits: vec![Commit {
                    sha: "deadbeef".to_string(),
                    short_sha: "dead".to_string(),
                    author: "Ada <ada@example.com>".to_string(),
                    committer: "Ada <ada@example.com>".to_string(),
                    timestamp: 0,
                    message: "feat: thing".to_string(),
                    parents: Vec::new(),
                    tags_at_commit: Vec::new(),
                }],
            }),
            ..Self::default()
        }
    }
}

/// Load a state file if it exists and is readable. Returns `Ok(None)` if
/// the path does not exist; a missing state file is not an error.
pub fn load(path: &Utf8Path) -> StateResult<Option<State>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(Some(deserialize(path, &raw)?))
}

fn deserialize(path: &Utf8Path, raw: &str) -> StateResult<State> {
    if is_yaml(path) { Ok(serde_saphyr::from_str(raw).map_err(|e| StateError::Yaml(e.to_string()))?) } else { Ok(serde_json::from_str(raw)?) }
}

fn is_yaml(path: &Utf8Path) -> bool {
    matches!(path.extension(), Some("yml" | "yaml"))
}

/// Serialize `state` and write it atomically: write to a sibling temp file
/// in the same directory, then rename over the target. Format is chosen by
/// `path`'s extension: YAML via `serde-saphyr` for `.yml`/`.yaml`, JSON
/// (pretty-printed) otherwise.
pub fn save_atomic(path: &Utf8Path, state: &State) -> StateResult<()> {
    let serialized = if is_yaml(path) {
        serde_saphyr::to_string(state).map_err(|e| StateError::Yaml(e.to_string()))?
    } else {
        serde_json::to_string_pretty(state)?
    };
    let dir = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(serialized.as_bytes())?;
    tmp.persist(path).map_err(|e| StateError::Io(e.error))?;
    Ok(())
}

/// Staleness check on resume: invalidate computed fields if HEAD
/// SHA, configuration hash, or working directory differ from what was
/// recorded.
#[must_use]
pub fn is_stale(state: &State, head_sha: &str, config_hash: u64, directory: &Utf8Path) -> bool {
    let recorded_head = state.scope.as_ref().map(|s| s.final_commit.as_str()).unwrap_or_default();
    let recorded_hash: u64 = state
        .extra
        .get("configurationHash")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(0);

    recorded_head != head_sha || recorded_hash != config_hash || state.directory != directory
}

//! Scope Resolver: walks history from HEAD to the most recent
//! matching tag, building the list of significant commits and the anchor
//! versions the Version Inferrer needs.

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::convention::{self, Convention};
use crate::git::{Commit, Repository};
use crate::version::{self, Version};

/// Errors raised while resolving scope.
#[derive(Error, Debug)]
pub enum ScopeError {
    /// HEAD does not point at a branch.
    #[error("cannot resolve scope on a detached HEAD")]
    DetachedHead,

    /// The repository has no commits.
    #[error("repository has no commits")]
    NoCommits,

    /// Underlying git operation failed.
    #[error(transparent)]
    Git(#[from] crate::git::GitError),

    /// A `filterTags` or collapsed-qualifier pattern failed to compile.
    #[error("invalid pattern {0:?}: {1}")]
    InvalidPattern(String, regex::Error),
}

/// Result type alias using [`ScopeError`].
pub type ScopeResult<T> = Result<T, ScopeError>;

/// Computed, read-only release scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    /// Highest version whose tag matches the active type's `filterTags`,
    /// reachable from HEAD. Falls back to `configuration.initialVersion`.
    pub previous_version: Version,

    /// Commit SHA `previous_version`'s tag points at, if any (`None` for a
    /// first release with no matching tag).
    pub previous_version_commit: Option<String>,

    /// Highest non-collapsed version reachable from HEAD — the stable base
    /// collapsed tracks advance from.
    pub prime_version: Version,

    /// First commit after `previous_version_commit` (oldest exclusive), or
    /// the oldest commit in the window if there is no significant commit.
    pub initial_commit: String,

    /// HEAD SHA at the start of Infer.
    pub final_commit: String,

    /// Commits from `initial_commit` through `final_commit`, in
    /// chronological order, whose message contributes at least a patch
    /// bump under the active conventions.
    pub significant_commits: Vec<Commit>,
}

impl Scope {
    /// Resolve a single dotted-path segment for the Template Engine
    /// (`releaseScope.finalCommit`, `releaseScope.previousVersion`, ...).
    #[must_use]
    pub fn lookup(&self, field: &str) -> Option<String> {
        match field {
            "previousVersion" => Some(self.previous_version.to_string()),
            "previousVersionCommit" => self.previous_version_commit.clone(),
            "primeVersion" => Some(self.prime_version.to_string()),
            "initialCommit" => Some(self.initial_commit.clone()),
            "finalCommit" => Some(self.final_commit.clone()),
            _ => None,
        }
    }
}

/// Resolve the release scope for `filter_tags` (the active release type's
/// tag filter), `collapsed_qualifiers` (every collapsing type's normalized
/// qualifier, used to exclude collapsed versions from `primeVersion`), the
/// enabled commit conventions, and the configured `initial_version`
/// fallback.
pub fn resolve(
    repo: &dyn Repository,
    filter_tags: &str,
    release_prefix: &str,
    collapsed_qualifiers: &[String],
    conventions: &[Convention],
    initial_version: &Version,
) -> ScopeResult<Scope> {
    repo.current_branch()?.ok_or(ScopeError::DetachedHead)?;

    let history = repo.walk_history()?;
    if history.is_empty() {
        return Err(ScopeError::NoCommits);
    }

    let filter_re = Regex::new(filter_tags).map_err(|e| ScopeError::InvalidPattern(filter_tags.to_string(), e))?;

    let final_commit = history[0].sha.clone();

    let (previous_version, previous_version_commit) =
        find_previous(repo, &history, &filter_re, release_prefix, initial_version, false, collapsed_qualifiers)?;
    let (prime_version, _) =
        find_previous(repo, &history, &filter_re, release_prefix, initial_version, true, collapsed_qualifiers)?;

    // Commits strictly after previous_version_commit (exclusive), in
    // chronological (oldest-first) order.
    let window: Vec<Commit> = match &previous_version_commit {
        Some(anchor) => {
            let idx = history.iter().position(|c| &c.sha == anchor);
            match idx {
                Some(idx) => history[..idx].iter().rev().cloned().collect(),
                None => history.iter().rev().cloned().collect(),
            }
        }
        None => history.iter().rev().cloned().collect(),
    };

    let significant_commits: Vec<Commit> = window
        .into_iter()
        .filter(|c| {
            let bump = convention::classify(conventions, &c.message);
            convention::significance_rank(bump.as_ref()) > 0
        })
        .collect();

    let initial_commit = significant_commits
        .first()
        .map(|c| c.sha.clone())
        .unwrap_or_else(|| final_commit.clone());

    Ok(Scope {
        previous_version,
        previous_version_commit,
        prime_version,
        initial_commit,
        final_commit,
        significant_commits,
    })
}

/// Walk `history` looking for the first commit whose tags match
/// `filter_re`. When `ignore_collapsed` is set, tags whose pre-release
/// qualifier matches any entry in `collapsed_qualifiers` are skipped, per
/// the `primeVersion` rule.
fn find_previous(
    repo: &dyn Repository,
    history: &[Commit],
    filter_re: &Regex,
    release_prefix: &str,
    initial_version: &Version,
    ignore_collapsed: bool,
    collapsed_qualifiers: &[String],
) -> ScopeResult<(Version, Option<String>)> {
    for commit in history {
        let tags = repo.commit_tags(&commit.sha)?;
        let mut candidates: Vec<Version> = tags
            .iter()
            .filter(|t| filter_re.is_match(&t.name))
            .filter_map(|t| version::parse(&t.name, true, release_prefix).ok())
            .filter(|v| !ignore_collapsed || !is_collapsed(v, collapsed_qualifiers))
            .collect();
        candidates.sort_by(version::compare);
        if let Some(best) = candidates.pop() {
            return Ok((best, Some(commit.sha.clone())));
        }
    }
    Ok((initial_version.clone(), None))
}

fn is_collapsed(v: &Version, collapsed_qualifiers: &[String]) -> bool {
    if v.pre.is_empty() {
        return false;
    }
    let qualifier = v.pre.as_str().split('.').next().unwrap_or_default();
    collapsed_qualifiers.iter().any(|q| q == qualifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::Tag;
    use std::sync::Mutex;

    struct FakeRepo {
        branch: Option<String>,
        history: Vec<Commit>,
        tags: Mutex<std::collections::HashMap<String, Vec<Tag>>>,
    }

    impl Repository for FakeRepo {
        fn add(&self, _: &[&str]) -> crate::git::GitResult<()> {
            Ok(())
        }
        fn commit(&self, _: &str) -> crate::git::GitResult<String> {
            Ok("newsha".into())
        }
        fn tag(&self, _: &str, _: &str, _: &str) -> crate::git::GitResult<()> {
            Ok(())
        }
        fn push(&self, _: &str, _: &str, _: bool) -> crate::git::GitResult<()> {
            Ok(())
        }
        fn walk_history(&self) -> crate::git::GitResult<Vec<Commit>> {
            Ok(self.history.clone())
        }
        fn commit_tags(&self, sha: &str) -> crate::git::GitResult<Vec<Tag>> {
            Ok(self.tags.lock().unwrap().get(sha).cloned().unwrap_or_default())
        }
        fn current_branch(&self) -> crate::git::GitResult<Option<String>> {
            Ok(self.branch.clone())
        }
        fn is_clean(&self) -> crate::git::GitResult<bool> {
            Ok(true)
        }
        fn latest_commit(&self) -> crate::git::GitResult<Commit> {
            self.history.first().cloned().ok_or(crate::git::GitError::NoCommits)
        }
        fn root_commit(&self) -> crate::git::GitResult<Commit> {
            self.history.last().cloned().ok_or(crate::git::GitError::NoCommits)
        }
        fn remote_names(&self) -> crate::git::GitResult<Vec<String>> {
            Ok(vec!["origin".into()])
        }
    }

    fn commit(sha: &str, message: &str) -> Commit {
        Commit {
            sha: sha.to_string(),
            short_sha: sha[..4.min(sha.len())].to_string(),
            author: "a <a@x.com>".into(),
            committer: "a <a@x.com>".into(),
            timestamp: 0,
            message: message.to_string(),
            parents: Vec::new(),
            tags_at_commit: Vec::new(),
        }
    }

    fn conventions() -> Vec<Convention> {
        vec![convention::Convention::conventional_commits()]
    }

    #[test]
    fn detached_head_is_an_error() {
        let repo = FakeRepo {
            branch: None,
            history: vec![commit("a", "feat: x")],
            tags: Mutex::new(Default::default()),
        };
        let result = resolve(&repo, "^v", "v", &[], &conventions(), &Version::new(0, 1, 0));
        assert!(matches!(result, Err(ScopeError::DetachedHead)));
    }

    #[test]
    fn no_commits_is_an_error() {
        let repo = FakeRepo {
            branch: Some("main".into()),
            history: vec![],
            tags: Mutex::new(Default::default()),
        };
        let result = resolve(&repo, "^v", "v", &[], &conventions(), &Version::new(0, 1, 0));
        assert!(matches!(result, Err(ScopeError::NoCommits)));
    }

    #[test]
    fn first_release_uses_initial_version() {
        let repo = FakeRepo {
            branch: Some("main".into()),
            history: vec![commit("a", "feat: initial")],
            tags: Mutex::new(Default::default()),
        };
        let scope = resolve(&repo, "^v", "v", &[], &conventions(), &Version::new(0, 1, 0)).unwrap();
        assert_eq!(scope.previous_version, Version::new(0, 1, 0));
        assert!(scope.previous_version_commit.is_none());
        assert_eq!(scope.significant_commits.len(), 1);
    }

    #[test]
    fn patch_bump_scope_finds_tagged_parent() {
        let mut tags = std::collections::HashMap::new();
        tags.insert(
            "parent".to_string(),
            vec![Tag { name: "v1.2.3".into(), target_sha: "parent".into(), annotated: false, message: None }],
        );
        let repo = FakeRepo {
            branch: Some("main".into()),
            history: vec![commit("head", "fix: npe"), commit("parent", "chore: release 1.2.3")],
            tags: Mutex::new(tags),
        };
        let scope = resolve(&repo, "^v", "v", &[], &conventions(), &Version::new(0, 1, 0)).unwrap();
        assert_eq!(scope.previous_version, Version::new(1, 2, 3));
        assert_eq!(scope.previous_version_commit.as_deref(), Some("parent"));
        assert_eq!(scope.significant_commits.len(), 1);
        assert_eq!(scope.significant_commits[0].sha, "head");
    }

    #[test]
    fn prime_version_ignores_collapsed_tags() {
        let mut tags = std::collections::HashMap::new();
        tags.insert(
            "collapsed".to_string(),
            vec![Tag { name: "v1.3.0-alpha.1".into(), target_sha: "collapsed".into(), annotated: false, message: None }],
        );
        tags.insert(
            "stable".to_string(),
            vec![Tag { name: "v1.2.0".into(), target_sha: "stable".into(), annotated: false, message: None }],
        );
        let repo = FakeRepo {
            branch: Some("alpha".into()),
            history: vec![commit("head", "feat: x"), commit("collapsed", "x"), commit("stable", "y")],
            tags: Mutex::new(tags),
        };
        let scope = resolve(&repo, "^v", "v", &["alpha".to_string()], &conventions(), &Version::new(0, 1, 0)).unwrap();
        assert_eq!(scope.prime_version, Version::new(1, 2, 0));
        assert_eq!(scope.previous_version, Version::parse("1.3.0-alpha.1").unwrap());
    }
}

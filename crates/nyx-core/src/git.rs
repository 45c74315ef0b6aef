//! Repository facade: the engine's only way to touch Git.
//!
//! Shells out to the `git` binary for every operation. This keeps the
//! engine thin and means it inherits the user's SSH keys, GPG signing, and
//! hooks for free, the same tradeoff the predecessor of this module made.
//!
//! The facade is deliberately narrow — Add, Commit, Tag, Push, WalkHistory,
//! GetCommitTags, GetCurrentBranch, IsClean, GetLatestCommit, GetRootCommit,
//! GetRemoteNames — so it can be implemented over a different backend later
//! without touching anything above it.

use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed (e.g., "status").
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepo,

    /// HEAD does not point at a branch.
    #[error("detached HEAD")]
    DetachedHead,

    /// The repository has no commits at all.
    #[error("repository has no commits")]
    NoCommits,
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// An observed, immutable commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Full SHA.
    pub sha: String,
    /// Abbreviated SHA.
    pub short_sha: String,
    /// Author identity (`name <email>`).
    pub author: String,
    /// Committer identity (`name <email>`).
    pub committer: String,
    /// Unix timestamp of the commit.
    pub timestamp: i64,
    /// Full commit message (subject + body).
    pub message: String,
    /// Parent SHAs, in order.
    pub parents: Vec<String>,
    /// Names of tags pointing at this commit.
    pub tags_at_commit: Vec<String>,
}

impl Commit {
    /// The commit message's subject line (first line).
    #[must_use]
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

/// A named tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Tag name, unique within the repository.
    pub name: String,
    /// SHA the tag points at (the commit, for lightweight tags; the
    /// annotated-tag object is dereferenced).
    pub target_sha: String,
    /// Whether this is an annotated tag.
    pub annotated: bool,
    /// Annotation message, if any.
    pub message: Option<String>,
}

/// Abstract Git operations the engine depends on.
///
/// Narrow by design: history walk, tag inspection, current branch,
/// clean check, plus the mutating operations (add/commit/tag/push) the
/// Mark phase performs.
pub trait Repository: Send + Sync {
    /// Stage `paths` for the next commit.
    fn add(&self, paths: &[&str]) -> GitResult<()>;

    /// Commit currently staged changes, returning the new commit's SHA.
    fn commit(&self, message: &str) -> GitResult<String>;

    /// Create a tag named `name` at `target` (`HEAD` if empty). Annotated
    /// iff `message` is non-empty.
    fn tag(&self, name: &str, target: &str, message: &str) -> GitResult<()>;

    /// Push `branch` (and, if `with_tags`, all tags) to `remote`.
    fn push(&self, remote: &str, branch: &str, with_tags: bool) -> GitResult<()>;

    /// Walk first-parent history from HEAD, newest first.
    fn walk_history(&self) -> GitResult<Vec<Commit>>;

    /// Tags pointing directly at `sha`.
    fn commit_tags(&self, sha: &str) -> GitResult<Vec<Tag>>;

    /// The current branch name, or `None` in detached HEAD.
    fn current_branch(&self) -> GitResult<Option<String>>;

    /// Whether the working tree has no staged or unstaged changes.
    fn is_clean(&self) -> GitResult<bool>;

    /// HEAD's commit.
    fn latest_commit(&self) -> GitResult<Commit>;

    /// The repository's first commit (oldest ancestor of HEAD).
    fn root_commit(&self) -> GitResult<Commit>;

    /// Configured remote names.
    fn remote_names(&self) -> GitResult<Vec<String>>;
}

/// [`Repository`] implementation backed by the `git` CLI.
pub struct GitRepository {
    root: Utf8PathBuf,
}

impl GitRepository {
    /// Open a repository rooted at `root`. Does not verify the path is
    /// actually a git repository — call [`is_inside_repo`] for that.
    #[must_use]
    pub fn open(root: &Utf8Path) -> Self {
        Self { root: root.to_owned() }
    }

    fn git(&self, args: &[&str]) -> GitResult<String> {
        git_in(&self.root, args)
    }
}

const LOG_FIELD_SEP: &str = "\u{1f}";
const LOG_RECORD_SEP: &str = "\u{1e}";

impl Repository for GitRepository {
    #[instrument(skip(self))]
    fn add(&self, paths: &[&str]) -> GitResult<()> {
        let mut args = vec!["add"];
        args.extend(paths);
        self.git(&args)?;
        Ok(())
    }

    #[instrument(skip(self, message))]
    fn commit(&self, message: &str) -> GitResult<String> {
        self.git(&["commit", "-m", message])?;
        Ok(self.git(&["rev-parse", "HEAD"])?.trim().to_string())
    }

    #[instrument(skip(self, message))]
    fn tag(&self, name: &str, target: &str, message: &str) -> GitResult<()> {
        let target = if target.is_empty() { "HEAD" } else { target };
        if message.is_empty() {
            self.git(&["tag", name, target])?;
        } else {
            self.git(&["tag", "-a", name, target, "-m", message])?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    fn push(&self, remote: &str, branch: &str, with_tags: bool) -> GitResult<()> {
        self.git(&["push", remote, branch])?;
        if with_tags {
            self.git(&["push", remote, "refs/tags/*:refs/tags/*"])?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    fn walk_history(&self) -> GitResult<Vec<Commit>> {
        let format = format!(
            "%H{LOG_FIELD_SEP}%h{LOG_FIELD_SEP}%an <%ae>{LOG_FIELD_SEP}%cn <%ce>{LOG_FIELD_SEP}%at{LOG_FIELD_SEP}%P{LOG_FIELD_SEP}%B{LOG_RECORD_SEP}"
        );
        let output = self.git(&["log", "--first-parent", &format!("--format={format}")])?;
        parse_log_records(&output)
    }

    #[instrument(skip(self))]
    fn commit_tags(&self, sha: &str) -> GitResult<Vec<Tag>> {
        let output = self.git(&["tag", "--points-at", sha])?;
        output
            .lines()
            .filter(|l| !l.is_empty())
            .map(|name| self.describe_tag(name))
            .collect()
    }

    #[instrument(skip(self))]
    fn current_branch(&self) -> GitResult<Option<String>> {
        current_branch_in(&self.root)
    }

    #[instrument(skip(self))]
    fn is_clean(&self) -> GitResult<bool> {
        is_clean_in(&self.root)
    }

    #[instrument(skip(self))]
    fn latest_commit(&self) -> GitResult<Commit> {
        self.walk_history()?.into_iter().next().ok_or(GitError::NoCommits)
    }

    #[instrument(skip(self))]
    fn root_commit(&self) -> GitResult<Commit> {
        self.walk_history()?.into_iter().last().ok_or(GitError::NoCommits)
    }

    #[instrument(skip(self))]
    fn remote_names(&self) -> GitResult<Vec<String>> {
        let output = self.git(&["remote"])?;
        Ok(output.lines().filter(|l| !l.is_empty()).map(str::to_string).collect())
    }
}

impl GitRepository {
    fn describe_tag(&self, name: &str) -> GitResult<Tag> {
        let object_type = self.git(&["cat-file", "-t", name]).unwrap_or_default();
        let annotated = object_type.trim() == "tag";
        let target_sha = self.git(&["rev-list", "-n", "1", name])?.trim().to_string();
        let message = if annotated {
            let msg = self.git(&["tag", "-l", "--format=%(contents)", name])?;
            let trimmed = msg.trim();
            if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
        } else {
            None
        };
        Ok(Tag { name: name.to_string(), target_sha, annotated, message })
    }
}

fn parse_log_records(output: &str) -> GitResult<Vec<Commit>> {
    output
        .split(LOG_RECORD_SEP)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|record| {
            let mut fields = record.splitn(7, LOG_FIELD_SEP);
            let sha = fields.next().unwrap_or_default().trim().to_string();
            let short_sha = fields.next().unwrap_or_default().to_string();
            let author = fields.next().unwrap_or_default().to_string();
            let committer = fields.next().unwrap_or_default().to_string();
            let timestamp = fields.next().unwrap_or_default().parse().unwrap_or(0);
            let parents = fields
                .next()
                .unwrap_or_default()
                .split_whitespace()
                .map(str::to_string)
                .collect();
            let message = fields.next().unwrap_or_default().trim().to_string();
            Commit {
                sha,
                short_sha,
                author,
                committer,
                timestamp,
                message,
                parents,
                tags_at_commit: Vec::new(),
            }
        })
        .map(Ok)
        .collect()
}

/// Check whether the working tree is clean (no uncommitted changes).
#[instrument]
pub fn is_clean() -> GitResult<bool> {
    let output = git(&["status", "--porcelain"])?;
    let clean = output.trim().is_empty();
    debug!(clean, "working tree status");
    Ok(clean)
}

fn is_clean_in(root: &Utf8Path) -> GitResult<bool> {
    Ok(git_in(root, &["status", "--porcelain"])?.trim().is_empty())
}

/// Get the current branch name. Returns `None` in detached HEAD.
#[instrument]
pub fn current_branch() -> GitResult<Option<String>> {
    let output = git(&["rev-parse", "--abbrev-ref", "HEAD"])?;
    let branch = output.trim().to_string();
    if branch == "HEAD" { Ok(None) } else { Ok(Some(branch)) }
}

fn current_branch_in(root: &Utf8Path) -> GitResult<Option<String>> {
    let output = git_in(root, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    let branch = output.trim().to_string();
    if branch == "HEAD" { Ok(None) } else { Ok(Some(branch)) }
}

/// Detect the release branch by checking for `main` then `master`.
#[instrument]
pub fn detect_release_branch() -> GitResult<Option<String>> {
    for candidate in &["main", "master"] {
        if git(&["rev-parse", "--verify", candidate]).is_ok() {
            return Ok(Some((*candidate).to_string()));
        }
    }
    Ok(None)
}

/// Whether the local branch is in sync with its upstream.
///
/// Returns `true` if there is no upstream configured (nothing to diverge
/// from) or if local and remote HEAD match.
#[instrument]
#[expect(clippy::literal_string_with_formatting_args)]
pub fn is_remote_in_sync() -> GitResult<bool> {
    let upstream = git(&["rev-parse", "--abbrev-ref", "@{upstream}"]);
    let Ok(upstream) = upstream else {
        return Ok(true);
    };
    let upstream = upstream.trim();
    let _ = git(&["fetch", "--quiet"]);
    let local = git(&["rev-parse", "HEAD"])?.trim().to_string();
    let remote = git(&["rev-parse", upstream])?.trim().to_string();
    Ok(local == remote)
}

/// Get the latest semver tag, if any, matching `v*`.
#[instrument]
pub fn latest_version_tag() -> GitResult<Option<String>> {
    let output = git(&["tag", "--list", "v*", "--sort=-version:refname"]);
    let Ok(output) = output else { return Ok(None) };
    Ok(output.lines().next().map(str::trim).map(str::to_string))
}

/// Get the remote URL for a named remote.
#[instrument]
pub fn remote_url(remote: &str) -> GitResult<Option<String>> {
    match git(&["remote", "get-url", remote]) {
        Ok(url) => Ok(Some(url.trim().to_string())),
        Err(GitError::Command { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Parse owner and repo from a git remote URL (HTTPS or SSH form).
#[must_use]
pub fn parse_owner_repo(url: &str) -> Option<(String, String)> {
    let path = url.strip_prefix("git@").map_or_else(
        || url.split("//").nth(1).and_then(|after| after.split_once('/').map(|(_, path)| path)),
        |rest| rest.split_once(':').map(|(_, path)| path),
    )?;

    let path = path.strip_suffix(".git").unwrap_or(path);
    let (owner, repo) = path.split_once('/')?;

    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

/// Check if we're inside a git repository.
#[instrument]
pub fn is_inside_repo() -> GitResult<bool> {
    match git(&["rev-parse", "--is-inside-work-tree"]) {
        Ok(output) => Ok(output.trim() == "true"),
        Err(GitError::Command { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

fn git(args: &[&str]) -> GitResult<String> {
    git_in(Utf8Path::new("."), args)
}

fn git_in(root: &Utf8Path, args: &[&str]) -> GitResult<String> {
    let output = Command::new("git").arg("-C").arg(root.as_str()).args(args).output()?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.contains("not a git repository") {
            return Err(GitError::NotARepo);
        }
        Err(GitError::Command {
            command: args.first().unwrap_or(&"").to_string(),
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_inside_repo_returns_bool() {
        assert!(is_inside_repo().is_ok());
    }

    #[test]
    fn parse_owner_repo_https() {
        let result = parse_owner_repo("https://github.com/example/nyx.git");
        assert_eq!(result, Some(("example".into(), "nyx".into())));
    }

    #[test]
    fn parse_owner_repo_https_no_suffix() {
        let result = parse_owner_repo("https://github.com/example/nyx");
        assert_eq!(result, Some(("example".into(), "nyx".into())));
    }

    #[test]
    fn parse_owner_repo_ssh() {
        let result = parse_owner_repo("git@github.com:example/nyx.git");
        assert_eq!(result, Some(("example".into(), "nyx".into())));
    }

    #[test]
    fn parse_owner_repo_ssh_no_suffix() {
        let result = parse_owner_repo("git@github.com:example/nyx");
        assert_eq!(result, Some(("example".into(), "nyx".into())));
    }

    #[test]
    fn parse_owner_repo_invalid() {
        assert!(parse_owner_repo("not-a-url").is_none());
        assert!(parse_owner_repo("").is_none());
    }

    #[test]
    fn parse_log_records_splits_fields() {
        let raw = format!(
            "abc123{sep}abc{sep}A <a@x.com>{sep}C <c@x.com>{sep}1000{sep}{sep}feat: thing{rsep}",
            sep = LOG_FIELD_SEP,
            rsep = LOG_RECORD_SEP
        );
        let commits = parse_log_records(&raw).unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].sha, "abc123");
        assert_eq!(commits[0].subject(), "feat: thing");
        assert!(commits[0].parents.is_empty());
    }

    #[test]
    fn walk_history_works_in_repo() {
        if is_inside_repo().unwrap_or(false) {
            let repo = GitRepository::open(Utf8Path::new("."));
            let result = repo.walk_history();
            assert!(result.is_ok());
        }
    }

    #[test]
    fn current_branch_works_in_repo() {
        if is_inside_repo().unwrap_or(false) {
            assert!(current_branch().is_ok());
        }
    }
}

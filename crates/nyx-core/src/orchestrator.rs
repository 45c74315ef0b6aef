//! Pipeline Orchestrator: sequences Infer, Mark, Make, and Publish
//! phases against a persisted [`State`], with resume semantics.
//!
//! Mirrors the narrow-facade approach the rest of this engine takes: the
//! orchestrator only calls through the [`Repository`] and [`HostingService`]
//! traits, never shelling out or making HTTP calls itself, so it stays
//! testable with fakes.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use camino::Utf8Path;
use tracing::{debug, info, instrument, warn};

use crate::changelog;
use crate::config::Compiled;
use crate::error::Error;
use crate::git::Repository;
use crate::hosting::{self, ReleaseRequest};
use crate::infer::{self, InferContext};
use crate::release_type::{self, ReleaseType};
use crate::scope;
use crate::state::{self, State};
use crate::template;
use crate::version;

/// How much of the pipeline a run should execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Run Infer only; never touch Git or a hosting provider regardless of
    /// the active type's flags.
    InferOnly,
    /// Run every phase the active release type enables.
    Release,
}

/// Everything a run needs beyond the loaded configuration.
pub struct RunOptions<'a> {
    /// Repository facade for the project being released.
    pub repo: &'a dyn Repository,
    /// Fully compiled configuration.
    pub compiled: &'a Compiled,
    /// Working directory the run executes in.
    pub cwd: &'a Utf8Path,
    /// How much of the pipeline to run.
    pub mode: Mode,
    /// Short-circuit every side-effecting call to a logged no-op.
    pub dry_run: bool,
    /// Resume from `state_path` if it exists and is not stale.
    pub resume: bool,
    /// Where to persist State; `None` disables persistence entirely.
    pub state_path: Option<&'a Utf8Path>,
    /// Environment variables consulted by release-type matching and
    /// `{{environment.*}}` templates.
    pub env: HashMap<String, String>,
}

/// One service's Publish-phase failure, kept so the caller can report a
/// non-zero exit without losing which service(s) failed and why.
#[derive(Debug, Clone)]
pub struct PublishFailure {
    /// The service's configured name.
    pub service: String,
    /// The error message recorded.
    pub message: String,
}

/// Outcome of a run.
#[derive(Debug)]
pub struct RunOutcome {
    /// The final state after every phase that ran.
    pub state: State,
    /// Publish-phase failures, collected best-effort across services.
    pub publish_failures: Vec<PublishFailure>,
}

impl RunOutcome {
    /// Whether every phase that ran succeeded completely, with no
    /// per-service publish failures.
    #[must_use]
    pub fn fully_succeeded(&self) -> bool {
        self.publish_failures.is_empty()
    }
}

/// Run the pipeline per `opts`, returning the final [`RunOutcome`].
///
/// Phase order is fixed: Infer (unless a resumed, non-stale state already
/// has one), then — for [`Mode::Release`] — Mark, Make, Publish, each
/// skipped if its recorded success already matches the inferred version.
#[instrument(skip_all, fields(dry_run = opts.dry_run, resume = opts.resume))]
pub fn run(opts: &RunOptions<'_>) -> Result<RunOutcome, Error> {
    let branch = opts.repo.current_branch()?.ok_or(crate::scope::ScopeError::DetachedHead)?;
    let clean = opts.repo.is_clean()?;
    let active = release_type::select(&opts.compiled.release_types, &branch, &opts.env, clean).clone();
    let head_sha = opts.repo.latest_commit()?.sha;
    let config_hash = config_hash(opts.compiled);

    let mut state = load_resumable(opts, &head_sha, config_hash)?;

    if state.scope.is_none() {
        state = infer_phase(opts, &branch, &active, config_hash)?;
        persist(opts, &state)?;
    } else {
        info!(version = %state.version.as_ref().map(ToString::to_string).unwrap_or_default(), "resuming from persisted state");
    }

    if matches!(opts.mode, Mode::InferOnly) {
        return Ok(RunOutcome { state, publish_failures: Vec::new() });
    }

    // A stale resume already reset `mark_succeeded`/`make_succeeded` to
    // `false` in `fresh_state`, so checking the flag alone is enough to
    // implement "skipped only if recorded success matches the current
    // version".
    if !state.mark_succeeded {
        mark_phase(opts, &active, &mut state)?;
        persist(opts, &state)?;
    }

    if !state.make_succeeded {
        make_phase(opts, &active, &mut state)?;
        persist(opts, &state)?;
    }

    let publish_failures = publish_phase(opts, &active, &mut state)?;
    persist(opts, &state)?;

    Ok(RunOutcome { state, publish_failures })
}

/// Load a persisted state if resuming and it is fresh; otherwise return an
/// empty state stamped with the current directory.
fn load_resumable(opts: &RunOptions<'_>, head_sha: &str, config_hash: u64) -> Result<State, Error> {
    let Some(path) = opts.state_path else {
        return Ok(fresh_state(opts));
    };
    if !opts.resume {
        return Ok(fresh_state(opts));
    }
    match state::load(path)? {
        Some(loaded) if !state::is_stale(&loaded, head_sha, config_hash, opts.cwd) => Ok(loaded),
        Some(_) => {
            debug!("persisted state is stale, re-inferring");
            Ok(fresh_state(opts))
        }
        None => Ok(fresh_state(opts)),
    }
}

fn fresh_state(opts: &RunOptions<'_>) -> State {
    State { directory: opts.cwd.to_path_buf(), ..State::default() }
}

/// Persist `state` if a state path was configured. A no-op
/// otherwise, including in dry-run mode — recording the plan does not
/// violate "no writes" since the state file is the engine's own
/// bookkeeping, not a project artifact.
fn persist(opts: &RunOptions<'_>, state: &State) -> Result<(), Error> {
    let Some(path) = opts.state_path else { return Ok(()) };
    state::save_atomic(path, state)?;
    Ok(())
}

fn config_hash(compiled: &Compiled) -> u64 {
    let mut hasher = DefaultHasher::new();
    compiled.initial_version.hash(&mut hasher);
    compiled.version.hash(&mut hasher);
    compiled.bump_override.hash(&mut hasher);
    compiled.release_types.len().hash(&mut hasher);
    compiled.conventions.len().hash(&mut hasher);
    compiled.services.len().hash(&mut hasher);
    hasher.finish()
}

#[instrument(skip_all, fields(branch, release_type = %active.name))]
fn infer_phase(opts: &RunOptions<'_>, branch: &str, active: &ReleaseType, config_hash: u64) -> Result<State, Error> {
    let collapsed_qualifiers = collapsed_qualifiers(opts.compiled, branch);
    let initial_version = version::parse(&opts.compiled.initial_version, true, "")?;

    let scope = scope::resolve(opts.repo, &active.filter_tags, &opts.compiled.release_prefix, &collapsed_qualifiers, &opts.compiled.conventions, &initial_version)?;

    let ctx = InferContext { conventions: &opts.compiled.conventions, branch, bump_override: opts.compiled.bump_override.as_ref() };
    let inferred = infer::infer(&scope, active, &ctx)?;

    let candidate = opts
        .compiled
        .version
        .as_ref()
        .map(|v| version::parse(v, true, "").unwrap_or_else(|_| inferred.version.clone()))
        .unwrap_or_else(|| inferred.version.clone());

    let mut configuration = std::collections::BTreeMap::new();
    configuration.insert("releasePrefix".to_string(), opts.compiled.release_prefix.clone());

    let mut state = State {
        scheme: "semver".to_string(),
        branch: branch.to_string(),
        bump: inferred.bump.as_ref().map(ToString::to_string),
        version: Some(candidate),
        version_range: inferred.version_range.clone(),
        release_type: Some(active.name.clone()),
        timestamp: template::now_iso8601(),
        directory: opts.cwd.to_path_buf(),
        overridden_version: opts.compiled.version.as_ref().map(|_| inferred.version.clone()),
        configuration,
        scope: Some(scope),
        ..State::default()
    };
    state.extra.insert("configurationHash".to_string(), serde_json::Value::from(config_hash));

    Ok(state)
}

fn collapsed_qualifiers(compiled: &Compiled, branch: &str) -> Vec<String> {
    compiled
        .release_types
        .iter()
        .filter(|rt| rt.collapse_versions)
        .filter_map(|rt| rt.collapsed_version_qualifier.as_ref())
        .map(|template_source| {
            let probe = State { branch: branch.to_string(), ..State::default() };
            template::render(template_source, &probe).unwrap_or_else(|_| template_source.clone())
        })
        .collect()
}

#[instrument(skip_all, fields(release_type = %active.name))]
fn mark_phase(opts: &RunOptions<'_>, active: &ReleaseType, state: &mut State) -> Result<(), Error> {
    if !active.git_commit && !active.git_tag && !active.git_push {
        state.mark_succeeded = true;
        return Ok(());
    }

    if opts.dry_run {
        info!(git_commit = active.git_commit, git_tag = active.git_tag, git_push = active.git_push, "dry run: skipping Mark side effects");
        state.mark_succeeded = true;
        return Ok(());
    }

    let mut commit_sha = state.scope.as_ref().map(|s| s.final_commit.clone()).unwrap_or_default();

    if active.git_commit {
        let mut paths: Vec<&str> = Vec::new();
        if let Some(path) = &state.changelog {
            paths.push(path.as_str());
        }
        if !paths.is_empty() {
            opts.repo.add(&paths)?;
        }
        let message = template::render(&active.git_commit_message, state)?;
        commit_sha = opts.repo.commit(&message)?;
        debug!(%commit_sha, "committed");
    }

    if active.git_tag {
        let tag_name = tag_name(opts.compiled, state);
        let message = if active.git_tag_message.is_empty() { String::new() } else { template::render(&active.git_tag_message, state)? };
        opts.repo.tag(&tag_name, &commit_sha, &message)?;
        debug!(tag = %tag_name, "tagged");
    }

    if active.git_push {
        for remote in &active.remote_repositories {
            opts.repo.push(remote, &state.branch, active.git_tag)?;
            debug!(%remote, "pushed");
        }
    }

    state.mark_succeeded = true;
    Ok(())
}

fn tag_name(compiled: &Compiled, state: &State) -> String {
    let version = state.version.as_ref().map(ToString::to_string).unwrap_or_default();
    format!("{}{version}", compiled.release_prefix)
}

#[instrument(skip_all, fields(release_type = %active.name))]
fn make_phase(opts: &RunOptions<'_>, active: &ReleaseType, state: &mut State) -> Result<(), Error> {
    let _ = active;
    let Some(scope) = state.scope.clone() else {
        state.make_succeeded = true;
        return Ok(());
    };
    let Some(version) = state.version.clone() else {
        state.make_succeeded = true;
        return Ok(());
    };

    if opts.dry_run {
        info!("dry run: skipping changelog write");
        state.make_succeeded = true;
        return Ok(());
    }

    let date = &state.timestamp[..10.min(state.timestamp.len())];
    let written = changelog::write(&scope, &version, date, &opts.compiled.changelog, state)?;
    state.changelog = written;
    state.make_succeeded = true;
    Ok(())
}

#[instrument(skip_all, fields(release_type = %active.name))]
fn publish_phase(opts: &RunOptions<'_>, active: &ReleaseType, state: &mut State) -> Result<Vec<PublishFailure>, Error> {
    if !active.publish || active.publication_services.is_empty() {
        return Ok(Vec::new());
    }

    let mut failures = Vec::new();

    for service_name in &active.publication_services {
        if state.publish_succeeded.contains(service_name) {
            continue;
        }

        let Some((_, service_config)) = opts.compiled.services.iter().find(|(name, _)| name == service_name) else {
            warn!(service = %service_name, "release type references an unconfigured service, skipping");
            failures.push(PublishFailure { service: service_name.clone(), message: "service not configured".to_string() });
            continue;
        };

        if opts.dry_run {
            info!(service = %service_name, "dry run: skipping publish");
            state.publish_succeeded.push(service_name.clone());
            continue;
        }

        match publish_one(service_config.clone(), &opts.compiled.release_prefix, active, state) {
            Ok(url) => {
                state.release_url_for(service_name, &url);
                state.publish_succeeded.push(service_name.clone());
            }
            Err(err) => {
                warn!(service = %service_name, error = %err, "publish failed");
                failures.push(PublishFailure { service: service_name.clone(), message: err.to_string() });
            }
        }
    }

    Ok(failures)
}

fn publish_one(service_config: hosting::ServiceConfig, release_prefix: &str, active: &ReleaseType, state: &State) -> Result<String, Error> {
    let service = hosting::build_service(service_config).map_err(Error::from)?;
    let version = state.version.as_ref().map(ToString::to_string).unwrap_or_default();
    let prerelease = state.version.as_ref().is_some_and(|v| !v.pre.is_empty());

    let (owner, repo) = owner_repo(state);
    let tag_name = format!("{release_prefix}{version}");
    let body = state.changelog_excerpt();
    let name = if active.description.is_empty() { version.clone() } else { template::render(&active.description, state).unwrap_or(version.clone()) };

    let request = ReleaseRequest { owner, repo, tag_name, name, body, draft: false, prerelease };

    service.publish_release(&request).map_err(Error::from)
}

fn owner_repo(state: &State) -> (String, String) {
    let owner = state.configuration.get("repositoryOwner").cloned().unwrap_or_default();
    let repo = state.configuration.get("repositoryName").cloned().unwrap_or_default();
    (owner, repo)
}

impl State {
    fn changelog_excerpt(&self) -> String {
        self.changelog
            .as_ref()
            .and_then(|path| std::fs::read_to_string(path).ok())
            .map(|full| full.split("\n\n").next().unwrap_or_default().to_string())
            .unwrap_or_default()
    }

    fn release_url_for(&mut self, service: &str, url: &str) {
        self.extra.insert(format!("releaseUrl.{service}"), serde_json::Value::from(url.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::{Commit, GitResult, Tag};
    use crate::version::Version;
    use std::sync::Mutex;

    struct FakeRepo {
        branch: Option<String>,
        history: Vec<Commit>,
        clean: bool,
        committed: Mutex<Vec<String>>,
        tagged: Mutex<Vec<String>>,
        pushed: Mutex<Vec<String>>,
    }

    impl FakeRepo {
        fn with_one_commit(message: &str) -> Self {
            Self {
                branch: Some("main".to_string()),
                history: vec![Commit {
                    sha: "deadbeef".to_string(),
                    short_sha: "dead".to_string(),
                    author: "a <a@x.com>".to_string(),
                    committer: "a <a@x.com>".to_string(),
                    timestamp: 0,
                    message: message.to_string(),
                    parents: Vec::new(),
                    tags_at_commit: Vec::new(),
                }],
                clean: true,
                committed: Mutex::new(Vec::new()),
                tagged: Mutex::new(Vec::new()),
                pushed: Mutex::new(Vec::new()),
            }
        }
    }

    impl Repository for FakeRepo {
        fn add(&self, _: &[&str]) -> GitResult<()> {
            Ok(())
        }
        fn commit(&self, message: &str) -> GitResult<String> {
            self.committed.lock().unwrap().push(message.to_string());
            Ok("newsha".to_string())
        }
        fn tag(&self, name: &str, _: &str, _: &str) -> GitResult<()> {
            self.tagged.lock().unwrap().push(name.to_string());
            Ok(())
        }
        fn push(&self, remote: &str, _: &str, _: bool) -> GitResult<()> {
            self.pushed.lock().unwrap().push(remote.to_string());
            Ok(())
        }
        fn walk_history(&self) -> GitResult<Vec<Commit>> {
            Ok(self.history.clone())
        }
        fn commit_tags(&self, _: &str) -> GitResult<Vec<Tag>> {
            Ok(Vec::new())
        }
        fn current_branch(&self) -> GitResult<Option<String>> {
            Ok(self.branch.clone())
        }
        fn is_clean(&self) -> GitResult<bool> {
            Ok(self.clean)
        }
        fn latest_commit(&self) -> GitResult<Commit> {
            self.history.first().cloned().ok_or(crate::git::GitError::NoCommits)
        }
        fn root_commit(&self) -> GitResult<Commit> {
            self.history.last().cloned().ok_or(crate::git::GitError::NoCommits)
        }
        fn remote_names(&self) -> GitResult<Vec<String>> {
            Ok(vec!["origin".to_string()])
        }
    }

    fn compiled_with(active: ReleaseType) -> Compiled {
        Compiled {
            version: None,
            initial_version: "0.1.0".to_string(),
            release_prefix: "v".to_string(),
            conventions: vec![crate::convention::Convention::conventional_commits()],
            release_types: vec![active],
            changelog: crate::changelog::ChangelogConfig { path: None, title: "Changelog".to_string(), sections: Vec::new(), substitutions: Vec::new(), template: None },
            services: Vec::new(),
        }
    }

    #[test]
    fn infer_only_never_touches_git() {
        let repo = FakeRepo::with_one_commit("feat: widget");
        let active = ReleaseType { match_branches: None, ..ReleaseType::default_type() };
        let compiled = compiled_with(active);
        let opts = RunOptions { repo: &repo, compiled: &compiled, cwd: Utf8Path::new("/repo"), mode: Mode::InferOnly, dry_run: false, resume: false, state_path: None, env: HashMap::new() };

        let outcome = run(&opts).unwrap();
        assert_eq!(outcome.state.version.unwrap(), Version::new(0, 2, 0));
        assert!(repo.committed.lock().unwrap().is_empty());
        assert!(repo.tagged.lock().unwrap().is_empty());
    }

    #[test]
    fn default_type_disables_every_side_effect() {
        let repo = FakeRepo::with_one_commit("feat: widget");
        let compiled = compiled_with(ReleaseType { match_branches: Some(regex::Regex::new("^never$").unwrap()), ..ReleaseType::default_type() });
        let opts = RunOptions { repo: &repo, compiled: &compiled, cwd: Utf8Path::new("/repo"), mode: Mode::Release, dry_run: false, resume: false, state_path: None, env: HashMap::new() };

        let outcome = run(&opts).unwrap();
        assert!(outcome.fully_succeeded());
        assert!(repo.committed.lock().unwrap().is_empty());
        assert!(repo.tagged.lock().unwrap().is_empty());
        assert!(repo.pushed.lock().unwrap().is_empty());
    }

    #[test]
    fn release_mode_commits_and_tags_when_enabled() {
        let repo = FakeRepo::with_one_commit("feat: widget");
        let active = ReleaseType {
            match_branches: None,
            git_commit: true,
            git_commit_message: "chore(release): {{version}}".to_string(),
            git_tag: true,
            git_tag_message: String::new(),
            ..ReleaseType::default_type()
        };
        let compiled = compiled_with(active);
        let opts = RunOptions { repo: &repo, compiled: &compiled, cwd: Utf8Path::new("/repo"), mode: Mode::Release, dry_run: false, resume: false, state_path: None, env: HashMap::new() };

        let outcome = run(&opts).unwrap();
        assert!(outcome.fully_succeeded());
        assert_eq!(repo.committed.lock().unwrap().as_slice(), ["chore(release): 0.2.0".to_string()]);
        assert_eq!(repo.tagged.lock().unwrap().as_slice(), ["v0.2.0".to_string()]);
    }

    #[test]
    fn dry_run_skips_every_side_effect() {
        let repo = FakeRepo::with_one_commit("feat: widget");
        let active = ReleaseType { match_branches: None, git_commit: true, git_tag: true, git_push: true, remote_repositories: vec!["origin".to_string()], ..ReleaseType::default_type() };
        let compiled = compiled_with(active);
        let opts = RunOptions { repo: &repo, compiled: &compiled, cwd: Utf8Path::new("/repo"), mode: Mode::Release, dry_run: true, resume: false, state_path: None, env: HashMap::new() };

        let outcome = run(&opts).unwrap();
        assert!(outcome.fully_succeeded());
        assert!(repo.committed.lock().unwrap().is_empty());
        assert!(repo.tagged.lock().unwrap().is_empty());
        assert!(repo.pushed.lock().unwrap().is_empty());
    }

    #[test]
    fn resume_skips_infer_when_state_is_fresh() {
        let repo = FakeRepo::with_one_commit("feat: widget");
        let active = ReleaseType::default_type();
        let compiled = compiled_with(active);
        let state_path = camino::Utf8PathBuf::from(std::env::temp_dir().join("nyx-orchestrator-resume-test.json").to_string_lossy().to_string());

        let opts = RunOptions { repo: &repo, compiled: &compiled, cwd: Utf8Path::new("/repo"), mode: Mode::InferOnly, dry_run: false, resume: true, state_path: Some(&state_path), env: HashMap::new() };
        let first = run(&opts).unwrap();
        assert!(first.state.scope.is_some());

        let second = run(&opts).unwrap();
        assert_eq!(second.state.version, first.state.version);
        std::fs::remove_file(&state_path).ok();
    }
}

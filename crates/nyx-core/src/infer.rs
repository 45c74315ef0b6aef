//! Version Inferrer: combines the resolved scope, the active
//! release type, and the commit conventions into the next version.

use thiserror::Error;

use crate::convention::{self, Convention};
use crate::release_type::ReleaseType;
use crate::scope::Scope;
use crate::template::{self, TemplateError};
use crate::version::{self, BumpComponent, Position, Version};

/// Errors raised while inferring the next version.
#[derive(Error, Debug)]
pub enum VersionRangeError {
    /// The inferred version does not satisfy the active type's
    /// `versionRange` (explicit or branch-derived).
    #[error("inferred version {version} does not satisfy range {range:?}")]
    OutOfRange {
        /// The version that failed the range check.
        version: Version,
        /// The range pattern it was checked against.
        range: String,
    },

    /// The active type requested a branch-derived range but the branch
    /// name carries no recognizable version fragment.
    #[error("branch {0:?} has no version fragment to derive a range from")]
    NoBranchVersionFragment(String),

    /// A range or identifier pattern failed to compile or render.
    #[error(transparent)]
    Version(#[from] version::VersionError),

    /// An identifier's value template failed to render.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Result type alias using [`VersionRangeError`].
pub type InferResult<T> = Result<T, VersionRangeError>;

/// Everything [`infer`] needs beyond the scope and active type: the
/// commit conventions (to re-derive the aggregate bump and per-commit
/// context is already folded into `scope`), and anything identifier
/// templates may reference.
pub struct InferContext<'a> {
    /// Enabled commit conventions, in priority order.
    pub conventions: &'a [Convention],
    /// Current branch name, for `versionRangeFromBranchName`.
    pub branch: &'a str,
    /// Explicit bump override from configuration, bypassing commit
    /// classification entirely when set.
    pub bump_override: Option<&'a BumpComponent>,
}

/// Outcome of a successful inference.
#[derive(Debug, Clone)]
pub struct Inferred {
    /// The computed next version, including any appended identifiers.
    pub version: Version,
    /// Aggregate bump component chosen across `scope.significant_commits`,
    /// or `None` if nothing in the window was significant.
    pub bump: Option<BumpComponent>,
    /// The version-range pattern enforced, if any.
    pub version_range: Option<String>,
    /// Whether `version` differs from `scope.previous_version`.
    pub new_version: bool,
    /// Whether this run should produce a publishable release: `new_version`
    /// gated by the active type's `publish` flag.
    pub new_release: bool,
}

/// Infer the next version for `scope` under `active`:
///
/// 1. Classify every commit in `scope.significant_commits` and take the
///    most significant resulting bump component.
/// 2. Bump `scope.prime_version` if `active.collapse_versions`, else bump
///    `scope.previous_version`, by that component.
/// 3. When collapsing, further bump the result by a named identifier
///    rendered from `active.collapsed_version_qualifier`.
/// 4. Append every configured identifier, in order.
/// 5. Resolve the active version range (explicit, or derived from the
///    branch name) and reject a candidate that falls outside it.
pub fn infer(scope: &Scope, active: &ReleaseType, ctx: &InferContext<'_>) -> InferResult<Inferred> {
    let bump = ctx.bump_override.cloned().or_else(|| aggregate_bump(scope, ctx.conventions));

    let base = if active.collapse_versions { &scope.prime_version } else { &scope.previous_version };

    let mut candidate = match &bump {
        Some(component) => version::bump(base, component),
        None => scope.previous_version.clone(),
    };

    let template_state = crate::state::State { branch: ctx.branch.to_string(), scope: Some(scope.clone()), ..Default::default() };

    if active.collapse_versions
        && let Some(qualifier_template) = &active.collapsed_version_qualifier
    {
        let qualifier = template::render(qualifier_template, &template_state)?;

        // Continue the previous release's ordinal when it already sits on
        // the same major.minor.patch under the same qualifier, rather than
        // restarting at `.1` every time.
        if same_base(&scope.previous_version, &candidate) && scope.previous_version.pre.as_str().starts_with(&format!("{qualifier}.")) {
            candidate.pre = scope.previous_version.pre.clone();
        }

        candidate = version::bump(&candidate, &BumpComponent::Named(qualifier));
    }

    for identifier in &active.identifiers {
        let value = template::render(&identifier.value_template, &template_state)?;
        candidate = version::with_identifier(&candidate, identifier.position, &identifier.qualifier, &value);
    }

    let version_range = resolve_range(active, ctx.branch)?;
    if let Some(range) = &version_range
        && !version::in_range(&candidate, range)?
    {
        return Err(VersionRangeError::OutOfRange { version: candidate, range: range.clone() });
    }

    let new_version = candidate != scope.previous_version;
    let new_release = new_version && active.publish;

    Ok(Inferred { version: candidate, bump, version_range, new_version, new_release })
}

fn same_base(a: &Version, b: &Version) -> bool {
    a.major == b.major && a.minor == b.minor && a.patch == b.patch
}

fn aggregate_bump(scope: &Scope, conventions: &[Convention]) -> Option<BumpComponent> {
    scope
        .significant_commits
        .iter()
        .filter_map(|commit| convention::classify(conventions, &commit.message))
        .max_by_key(|component| convention::significance_rank(Some(component)))
}

fn resolve_range(active: &ReleaseType, branch: &str) -> InferResult<Option<String>> {
    if active.version_range_from_branch_name {
        return version::range_from_branch_name(branch)
            .map(Some)
            .ok_or_else(|| VersionRangeError::NoBranchVersionFragment(branch.to_string()));
    }
    Ok(active.version_range.clone())
}

/// Identifier slot convenience re-export, so callers configuring
/// [`crate::release_type::IdentifierRule`] do not need a separate import.
pub use Position as IdentifierPosition;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::Commit;

    fn significant(sha: &str, message: &str) -> Commit {
        Commit {
            sha: sha.to_string(),
            short_sha: sha.to_string(),
            author: "a <a@x.com>".into(),
            committer: "a <a@x.com>".into(),
            timestamp: 0,
            message: message.to_string(),
            parents: Vec::new(),
            tags_at_commit: Vec::new(),
        }
    }

    fn scope_with(commits: Vec<Commit>) -> Scope {
        Scope {
            previous_version: Version::new(1, 2, 3),
            previous_version_commit: Some("parent".into()),
            prime_version: Version::new(1, 2, 3),
            initial_commit: commits.first().map(|c| c.sha.clone()).unwrap_or_default(),
            final_commit: commits.last().map(|c| c.sha.clone()).unwrap_or_default(),
            significant_commits: commits,
        }
    }

    fn conventions() -> Vec<Convention> {
        vec![Convention::conventional_commits()]
    }

    #[test]
    fn infers_patch_bump_from_fix_commit() {
        let scope = scope_with(vec![significant("a", "fix: npe")]);
        let active = ReleaseType::default_type();
        let ctx = InferContext { conventions: &conventions(), branch: "main", bump_override: None };
        let inferred = infer(&scope, &active, &ctx).unwrap();
        assert_eq!(inferred.version, Version::new(1, 2, 4));
        assert_eq!(inferred.bump, Some(BumpComponent::Patch));
    }

    #[test]
    fn most_significant_commit_wins() {
        let scope = scope_with(vec![significant("a", "fix: npe"), significant("b", "feat: widget"), significant("c", "fix: other")]);
        let active = ReleaseType::default_type();
        let ctx = InferContext { conventions: &conventions(), branch: "main", bump_override: None };
        let inferred = infer(&scope, &active, &ctx).unwrap();
        assert_eq!(inferred.version, Version::new(1, 3, 0));
    }

    #[test]
    fn explicit_bump_override_bypasses_classification() {
        let scope = scope_with(vec![significant("a", "fix: npe")]);
        let active = ReleaseType::default_type();
        let major = BumpComponent::Major;
        let ctx = InferContext { conventions: &conventions(), branch: "main", bump_override: Some(&major) };
        let inferred = infer(&scope, &active, &ctx).unwrap();
        assert_eq!(inferred.version, Version::new(2, 0, 0));
        assert_eq!(inferred.bump, Some(BumpComponent::Major));
    }

    #[test]
    fn no_significant_commits_leaves_version_unchanged() {
        let scope = scope_with(vec![]);
        let active = ReleaseType::default_type();
        let ctx = InferContext { conventions: &conventions(), branch: "main", bump_override: None };
        let inferred = infer(&scope, &active, &ctx).unwrap();
        assert_eq!(inferred.version, Version::new(1, 2, 3));
        assert!(inferred.bump.is_none());
    }

    #[test]
    fn collapse_continues_ordinal_from_previous_version() {
        let mut scope = scope_with(vec![significant("a", "feat: widget")]);
        scope.prime_version = Version::new(1, 2, 0);
        scope.previous_version = Version::parse("1.3.0-alpha.2").unwrap();
        let active = ReleaseType { collapse_versions: true, collapsed_version_qualifier: Some("alpha".to_string()), ..ReleaseType::default_type() };
        let ctx = InferContext { conventions: &conventions(), branch: "alpha", bump_override: None };
        let inferred = infer(&scope, &active, &ctx).unwrap();
        assert_eq!(inferred.version.major, 1);
        assert_eq!(inferred.version.minor, 3);
        assert_eq!(inferred.version.pre.as_str(), "alpha.3");
    }

    #[test]
    fn collapse_starts_fresh_qualifier_on_new_base() {
        let mut scope = scope_with(vec![significant("a", "feat: widget")]);
        scope.prime_version = Version::new(1, 2, 0);
        scope.previous_version = Version::new(1, 2, 3);
        let active = ReleaseType { collapse_versions: true, collapsed_version_qualifier: Some("alpha".to_string()), ..ReleaseType::default_type() };
        let ctx = InferContext { conventions: &conventions(), branch: "alpha", bump_override: None };
        let inferred = infer(&scope, &active, &ctx).unwrap();
        assert_eq!(inferred.version.major, 1);
        assert_eq!(inferred.version.minor, 3);
        assert_eq!(inferred.version.pre.as_str(), "alpha.1");
    }

    #[test]
    fn out_of_range_candidate_is_rejected() {
        let scope = scope_with(vec![significant("a", "feat: widget")]);
        let active = ReleaseType { version_range: Some(r"^1\.2\.".to_string()), ..ReleaseType::default_type() };
        let ctx = InferContext { conventions: &conventions(), branch: "main", bump_override: None };
        let result = infer(&scope, &active, &ctx);
        assert!(matches!(result, Err(VersionRangeError::OutOfRange { .. })));
    }

    #[test]
    fn branch_derived_range_without_fragment_errors() {
        let scope = scope_with(vec![]);
        let active = ReleaseType { version_range_from_branch_name: true, ..ReleaseType::default_type() };
        let ctx = InferContext { conventions: &conventions(), branch: "main", bump_override: None };
        let result = infer(&scope, &active, &ctx);
        assert!(matches!(result, Err(VersionRangeError::NoBranchVersionFragment(_))));
    }
}

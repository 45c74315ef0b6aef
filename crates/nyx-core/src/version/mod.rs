//! Version algebra for the SemVer 2.0.0 scheme.
//!
//! Wraps [`semver::Version`] rather than re-implementing SemVer parsing,
//! adding the operations the engine needs beyond plain parse/compare:
//! component-or-named-identifier bumps, positional identifier insertion,
//! and range matching.

use std::cmp::Ordering;
use std::fmt;

use regex::Regex;
use semver::{BuildMetadata, Prerelease};
use thiserror::Error;

/// Errors raised while parsing or manipulating a version.
#[derive(Error, Debug)]
pub enum VersionError {
    /// The input string is not a valid (or lenient-tolerable) SemVer string.
    #[error("invalid version {input:?}: {source}")]
    InvalidSemver {
        /// The string that failed to parse.
        input: String,
        /// Underlying parser error.
        #[source]
        source: semver::Error,
    },

    /// A version-range pattern failed to compile as a regex.
    #[error("invalid version range pattern {0:?}: {1}")]
    InvalidRange(String, regex::Error),
}

/// Result type alias using [`VersionError`].
pub type VersionResult<T> = Result<T, VersionError>;

/// The axis along which the next version is incremented: a standard
/// component, or a named pre-release identifier whose numeric tail is
/// incremented (adding `.1` if absent).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BumpComponent {
    /// Major version bump; resets minor, patch, and pre-release.
    Major,
    /// Minor version bump; resets patch and pre-release.
    Minor,
    /// Patch version bump; resets pre-release.
    Patch,
    /// Bump a named pre-release identifier's numeric tail.
    Named(String),
}

impl fmt::Display for BumpComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
            Self::Patch => write!(f, "patch"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}

/// Which identifier slot [`with_identifier`] writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// The SemVer pre-release slot (`-alpha.1`).
    PreRelease,
    /// The SemVer build-metadata slot (`+build.7`).
    Build,
}

/// A parsed version under the SemVer scheme.
pub type Version = semver::Version;

/// Parse a version string.
///
/// In lenient mode, a configurable prefix (typically `"v"`) is stripped and
/// surrounding whitespace is tolerated; strict mode requires a
/// scheme-canonical string.
pub fn parse(s: &str, lenient: bool, prefix: &str) -> VersionResult<Version> {
    let trimmed = s.trim();
    let stripped = if lenient {
        trimmed.strip_prefix(prefix).unwrap_or(trimmed)
    } else {
        trimmed
    };
    Version::parse(stripped).map_err(|source| VersionError::InvalidSemver {
        input: s.to_string(),
        source,
    })
}

/// Compare two versions per SemVer precedence. Build identifiers never
/// affect order — this is exactly `Ord` on `semver::Version`, which already
/// excludes build metadata from comparison.
#[must_use]
pub fn compare(a: &Version, b: &Version) -> Ordering {
    a.cmp(b)
}

/// Bump `v` along `component`.
///
/// Standard components reset every field of lower significance. Bumping a
/// named identifier increments its numeric tail (`alpha.3` → `alpha.4`),
/// appending `.1` if the identifier had no numeric tail yet, and leaves
/// major/minor/patch untouched (collapsed-qualifier bumps operate on an
/// already-bumped base — see `infer.rs`).
#[must_use]
pub fn bump(v: &Version, component: &BumpComponent) -> Version {
    match component {
        BumpComponent::Major => Version::new(v.major + 1, 0, 0),
        BumpComponent::Minor => Version::new(v.major, v.minor + 1, 0),
        BumpComponent::Patch => Version::new(v.major, v.minor, v.patch + 1),
        BumpComponent::Named(name) => {
            let mut out = v.clone();
            out.pre = bump_named_identifier(&v.pre, name);
            out
        }
    }
}

fn bump_named_identifier(pre: &Prerelease, qualifier: &str) -> Prerelease {
    let current = pre.as_str();
    let next_tail = current
        .strip_prefix(qualifier)
        .and_then(|rest| rest.strip_prefix('.'))
        .and_then(|rest| rest.parse::<u64>().ok())
        .map_or(1, |n| n + 1);
    Prerelease::new(&format!("{qualifier}.{next_tail}")).unwrap_or(Prerelease::EMPTY)
}

/// Append `qualifier.value` into the pre-release or build slot of `v`,
/// preserving declaration order and de-duplicating by qualifier (a repeat
/// call with the same qualifier replaces the prior value rather than
/// appending a second one).
#[must_use]
pub fn with_identifier(v: &Version, position: Position, qualifier: &str, value: &str) -> Version {
    let mut out = v.clone();
    let existing = match position {
        Position::PreRelease => out.pre.as_str(),
        Position::Build => out.build.as_str(),
    };

    let mut segments: Vec<String> = if existing.is_empty() {
        Vec::new()
    } else {
        existing.split('.').map(str::to_string).collect()
    };

    let new_segment = format!("{qualifier}.{value}");
    let prefix = format!("{qualifier}.");
    if let Some(idx) = segments.iter().position(|s| s.starts_with(&prefix) || s == qualifier) {
        segments[idx] = new_segment;
    } else {
        segments.push(new_segment);
    }

    let joined = segments.join(".");
    match position {
        Position::PreRelease => out.pre = Prerelease::new(&joined).unwrap_or(Prerelease::EMPTY),
        Position::Build => out.build = BuildMetadata::new(&joined).unwrap_or(BuildMetadata::EMPTY),
    }
    out
}

/// Does `v` match `pattern` (a regex applied to `v`'s canonical string form)?
pub fn in_range(v: &Version, pattern: &str) -> VersionResult<bool> {
    let re = Regex::new(pattern).map_err(|e| VersionError::InvalidRange(pattern.to_string(), e))?;
    Ok(re.is_match(&v.to_string()))
}

/// Derive a version-range regex from a release-branch name, e.g.
/// `rel/1.2.x` → `^1\.2\.`. Returns `None` if the branch name carries
/// no recognizable version fragment.
#[must_use]
pub fn range_from_branch_name(branch: &str) -> Option<String> {
    let digits: String = branch
        .rsplit('/')
        .next()
        .unwrap_or(branch)
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let trimmed = digits.trim_end_matches('.');
    if trimmed.is_empty() || !trimmed.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("^{}\\.", trimmed.replace('.', "\\.")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_strict_rejects_prefix() {
        assert!(parse("v1.2.3", false, "v").is_err());
    }

    #[test]
    fn parse_lenient_strips_prefix() {
        let v = parse("v1.2.3", true, "v").unwrap();
        assert_eq!(v, Version::new(1, 2, 3));
    }

    #[test]
    fn bump_major_resets_lower_fields() {
        let v = Version::parse("1.2.3").unwrap();
        assert_eq!(bump(&v, &BumpComponent::Major), Version::new(2, 0, 0));
    }

    #[test]
    fn bump_named_identifier_starts_at_one() {
        let v = Version::parse("1.3.0").unwrap();
        let bumped = bump(&v, &BumpComponent::Named("alpha".into()));
        assert_eq!(bumped.pre.as_str(), "alpha.1");
    }

    #[test]
    fn bump_named_identifier_increments_existing_tail() {
        let v = Version::parse("1.3.0-alpha.4").unwrap();
        let bumped = bump(&v, &BumpComponent::Named("alpha".into()));
        assert_eq!(bumped.pre.as_str(), "alpha.5");
    }

    #[test]
    fn with_identifier_appends_and_dedupes() {
        let v = Version::parse("1.0.0").unwrap();
        let once = with_identifier(&v, Position::PreRelease, "rc", "1");
        assert_eq!(once.pre.as_str(), "rc.1");
        let twice = with_identifier(&once, Position::PreRelease, "rc", "2");
        assert_eq!(twice.pre.as_str(), "rc.2");
    }

    #[test]
    fn compare_ignores_build_metadata() {
        let a = Version::parse("1.0.0+build1").unwrap();
        let b = Version::parse("1.0.0+build2").unwrap();
        assert_eq!(compare(&a, &b), Ordering::Equal);
    }

    #[test]
    fn in_range_matches_pattern() {
        let v = Version::parse("1.4.1-rel").unwrap();
        assert!(in_range(&v, r"^1\.4\.").unwrap());
        let too_far = Version::parse("1.5.0").unwrap();
        assert!(!in_range(&too_far, r"^1\.4\.").unwrap());
    }

    #[test]
    fn range_from_branch_name_extracts_prefix() {
        assert_eq!(range_from_branch_name("rel/1.2.x").as_deref(), Some(r"^1\.2\."));
        assert_eq!(range_from_branch_name("main"), None);
    }
}

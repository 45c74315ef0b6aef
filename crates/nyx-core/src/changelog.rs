//! Changelog Builder: renders a Markdown changelog from the
//! significant commits in a [`Scope`], natively rather than delegating to
//! an external changelog generator.

use indexmap::IndexMap;
use regex::Regex;
use thiserror::Error;

use crate::convention;
use crate::git::Commit;
use crate::scope::Scope;
use crate::state::State;
use crate::template::{self, TemplateError};
use crate::version::Version;

/// Errors raised while building a changelog.
#[derive(Error, Debug)]
pub enum ChangelogError {
    /// A `changelog.sections` or `changelog.substitutions` pattern failed
    /// to compile.
    #[error("invalid changelog pattern {0:?}: {1}")]
    InvalidPattern(String, regex::Error),

    /// Reading the existing file (for the idempotency check) or writing
    /// the new one failed.
    #[error("changelog I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured `changelog.template` failed to render.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Result type alias using [`ChangelogError`].
pub type ChangelogResult<T> = Result<T, ChangelogError>;

/// One `sectionName → regex` rule, matched against a commit's
/// conventional-commits `type`.
#[derive(Debug, Clone)]
pub struct Section {
    /// Heading text for this section (`"Features"`, `"Bug Fixes"`).
    pub name: String,
    /// Matched against the commit's conventional-commits `type` prefix.
    pub type_pattern: Regex,
}

/// Ordered `pattern → replacement` rewrite applied to each rendered line.
#[derive(Debug, Clone)]
pub struct Substitution {
    /// Pattern matched against a rendered bullet line.
    pub pattern: Regex,
    /// Replacement text (may reference capture groups, e.g. `$1`).
    pub replacement: String,
}

/// Changelog-building configuration (`changelog.*`).
#[derive(Debug, Clone)]
pub struct ChangelogConfig {
    /// Destination path. Building is a no-op when unset.
    pub path: Option<camino::Utf8PathBuf>,
    /// Project title used in the header.
    pub title: String,
    /// Ordered sections, most-specific first; a commit lands in the first
    /// section whose pattern matches its `type`.
    pub sections: Vec<Section>,
    /// Ordered rewrite rules applied after section rendering.
    pub substitutions: Vec<Substitution>,
    /// Overrides the default header+sections layout when set.
    pub template: Option<String>,
}

/// Build the Markdown body for `scope`'s significant commits under
/// `config`, without touching the filesystem. Used both by [`write`] and
/// directly by callers (e.g. a hosting-service release body) that want
/// the text without the idempotency check.
#[must_use]
pub fn render(scope: &Scope, version: &Version, date: &str, config: &ChangelogConfig, state: &State) -> ChangelogResult<String> {
    if let Some(template_source) = &config.template {
        return Ok(template::render(template_source, state)?);
    }

    let mut out = String::new();
    out.push_str(&format!("## {} {version} ({date})\n\n", config.title));

    let mut grouped: IndexMap<String, Vec<&Commit>> = IndexMap::new();
    for section in &config.sections {
        grouped.insert(section.name.clone(), Vec::new());
    }

    for commit in &scope.significant_commits {
        let commit_type = commit_type(&commit.message);
        if let Some(section) = config.sections.iter().find(|s| s.type_pattern.is_match(&commit_type)) {
            grouped.entry(section.name.clone()).or_default().push(commit);
        }
    }

    for (name, commits) in &grouped {
        if commits.is_empty() {
            continue;
        }
        out.push_str(&format!("### {name}\n\n"));
        for commit in commits {
            let title = commit_title(&commit.message);
            let mut line = format!("- {title} ({})\n", &commit.short_sha);
            for substitution in &config.substitutions {
                line = substitution.pattern.replace_all(&line, substitution.replacement.as_str()).into_owned();
            }
            out.push_str(&line);
        }
        out.push('\n');
    }

    Ok(out)
}

/// Prepend `render`'s output to the existing file at `config.path` (or
/// create it), unless the result would be byte-identical to what is
/// already there. No-op if `config.path` is unset.
pub fn write(scope: &Scope, version: &Version, date: &str, config: &ChangelogConfig, state: &State) -> ChangelogResult<Option<camino::Utf8PathBuf>> {
    let Some(path) = &config.path else { return Ok(None) };

    let new_entry = render(scope, version, date, config, state)?;
    let existing = std::fs::read_to_string(path).unwrap_or_default();

    let combined = if existing.is_empty() { new_entry.clone() } else { format!("{new_entry}\n{existing}") };

    if existing_is_up_to_date(&existing, &new_entry) {
        return Ok(Some(path.clone()));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, combined)?;
    Ok(Some(path.clone()))
}

fn existing_is_up_to_date(existing: &str, new_entry: &str) -> bool {
    !new_entry.is_empty() && existing.starts_with(new_entry)
}

fn commit_type(message: &str) -> String {
    let subject = message.lines().next().unwrap_or_default();
    subject.split(['(', ':', '!']).next().unwrap_or_default().to_string()
}

fn commit_title(message: &str) -> String {
    let subject = message.lines().next().unwrap_or_default();
    match subject.split_once(':') {
        Some((_, rest)) => rest.trim().to_string(),
        None => subject.to_string(),
    }
}

/// Build the [`Section`] list conventional commits typically group into,
/// matching the significance ranking [`convention::significance_rank`]
/// implies: breaking changes and features before fixes and chores.
#[must_use]
pub fn conventional_sections() -> Vec<Section> {
    vec![
        Section { name: "Features".to_string(), type_pattern: Regex::new("^feat$").unwrap() },
        Section { name: "Bug Fixes".to_string(), type_pattern: Regex::new("^fix$").unwrap() },
        Section { name: "Performance".to_string(), type_pattern: Regex::new("^perf$").unwrap() },
    ]
}

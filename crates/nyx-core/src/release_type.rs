//! Release-Type Selector: matches branch/environment/workspace
//! status against an ordered set of rules, yielding the active rule.

use std::collections::HashMap;

use indexmap::IndexMap;
use regex::Regex;

/// Workspace cleanliness predicate a release type can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkspaceStatus {
    /// No uncommitted changes required.
    Clean,
    /// Uncommitted changes required.
    Dirty,
    /// Matches regardless of working-tree state.
    #[default]
    Any,
}

/// One identifier the active type appends to the inferred version.
#[derive(Debug, Clone)]
pub struct IdentifierRule {
    /// Slot to write into.
    pub position: crate::version::Position,
    /// Identifier qualifier (e.g. `"build"`).
    pub qualifier: String,
    /// Template producing the identifier's value.
    pub value_template: String,
}

/// A named release-type rule.
#[derive(Debug, Clone)]
pub struct ReleaseType {
    /// Rule name, used as `State.releaseType` once active.
    pub name: String,
    /// Branch-name regex this rule applies to.
    pub match_branches: Option<Regex>,
    /// Environment variable name → required-value regex, all must match.
    pub match_environment_variables: IndexMap<String, Regex>,
    /// Workspace cleanliness requirement.
    pub match_workspace_status: WorkspaceStatus,
    /// Which tags count as "previous version" candidates for this type.
    pub filter_tags: String,
    /// Whether this type collapses many commits onto one shared base
    /// version distinguished by an incrementing qualifier ordinal.
    pub collapse_versions: bool,
    /// Template producing the collapsed pre-release qualifier.
    pub collapsed_version_qualifier: Option<String>,
    /// Explicit version-range regex the candidate must match.
    pub version_range: Option<String>,
    /// Derive the version range from the current branch name instead.
    pub version_range_from_branch_name: bool,
    /// Extra identifiers appended to the candidate, in order.
    pub identifiers: Vec<IdentifierRule>,
    /// Whether Mark should commit.
    pub git_commit: bool,
    /// Commit-message template, if `git_commit`.
    pub git_commit_message: String,
    /// Whether Mark should push.
    pub git_push: bool,
    /// Whether Mark should tag.
    pub git_tag: bool,
    /// Tag-message template, if `git_tag` (empty ⇒ lightweight tag).
    pub git_tag_message: String,
    /// Whether Publish should run for this type.
    pub publish: bool,
    /// Remotes pushed to, in order, when `git_push`.
    pub remote_repositories: Vec<String>,
    /// Hosting services published to, in declaration order.
    pub publication_services: Vec<String>,
    /// Human-readable description template.
    pub description: String,
}

impl ReleaseType {
    /// The built-in fallback rule activated when no configured type
    /// matches: all side effects disabled.
    #[must_use]
    pub fn default_type() -> Self {
        Self {
            name: "default".to_string(),
            match_branches: None,
            match_environment_variables: IndexMap::new(),
            match_workspace_status: WorkspaceStatus::Any,
            filter_tags: "^v".to_string(),
            collapse_versions: false,
            collapsed_version_qualifier: None,
            version_range: None,
            version_range_from_branch_name: false,
            identifiers: Vec::new(),
            git_commit: false,
            git_commit_message: String::new(),
            git_push: false,
            git_tag: false,
            git_tag_message: String::new(),
            publish: false,
            remote_repositories: Vec::new(),
            publication_services: Vec::new(),
            description: "No release type matched; all side effects disabled.".to_string(),
        }
    }

    fn matches(&self, branch: &str, env: &HashMap<String, String>, clean: bool) -> bool {
        if let Some(re) = &self.match_branches
            && !re.is_match(branch)
        {
            return false;
        }
        for (name, re) in &self.match_environment_variables {
            let Some(value) = env.get(name) else { return false };
            if !re.is_match(value) {
                return false;
            }
        }
        match self.match_workspace_status {
            WorkspaceStatus::Clean => clean,
            WorkspaceStatus::Dirty => !clean,
            WorkspaceStatus::Any => true,
        }
    }
}

/// Select the first release type (in declaration order) whose predicates
/// all pass, falling back to [`ReleaseType::default_type`] if none do.
#[must_use]
pub fn select<'a>(types: &'a [ReleaseType], branch: &str, env: &HashMap<String, String>, clean: bool) -> &'a ReleaseType {
    types
        .iter()
        .find(|t| t.matches(branch, env, clean))
        .unwrap_or(DEFAULT_TYPE.get_or_init(ReleaseType::default_type))
}

static DEFAULT_TYPE: std::sync::OnceLock<ReleaseType> = std::sync::OnceLock::new();

#[cfg(test)]
mod tests {
    use super::*;

    fn mainline() -> ReleaseType {
        ReleaseType {
            match_branches: Some(Regex::new("^main$").unwrap()),
            ..ReleaseType::default_type()
        }
    }

    fn release_branch() -> ReleaseType {
        ReleaseType {
            name: "release".to_string(),
            match_branches: Some(Regex::new(r"^rel/").unwrap()),
            version_range_from_branch_name: true,
            ..ReleaseType::default_type()
        }
    }

    #[test]
    fn selects_first_matching_rule() {
        let types = vec![mainline(), release_branch()];
        let active = select(&types, "main", &HashMap::new(), true);
        assert_eq!(active.match_branches.as_ref().unwrap().as_str(), "^main$");
    }

    #[test]
    fn falls_back_to_default_when_nothing_matches() {
        let types = vec![mainline(), release_branch()];
        let active = select(&types, "topic/foo", &HashMap::new(), true);
        assert_eq!(active.name, "default");
        assert!(!active.publish);
        assert!(!active.git_tag);
    }

    #[test]
    fn environment_predicate_must_all_match() {
        let mut with_env = mainline();
        with_env.match_environment_variables.insert("CI".to_string(), Regex::new("^true$").unwrap());
        let types = vec![with_env];

        let mut env = HashMap::new();
        env.insert("CI".to_string(), "false".to_string());
        let active = select(&types, "main", &env, true);
        assert_eq!(active.name, "default");

        env.insert("CI".to_string(), "true".to_string());
        let active = select(&types, "main", &env, true);
        assert_ne!(active.name, "default");
    }

    #[test]
    fn workspace_status_dirty_requires_uncommitted_changes() {
        let mut dirty_only = mainline();
        dirty_only.match_workspace_status = WorkspaceStatus::Dirty;
        let types = vec![dirty_only];
        assert_eq!(select(&types, "main", &HashMap::new(), true).name, "default");
        assert_ne!(select(&types, "main", &HashMap::new(), false).name, "default");
    }
}

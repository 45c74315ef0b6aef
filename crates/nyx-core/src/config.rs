//! Configuration Layer Stack.
//!
//! Deserialization happens into plain, pattern-as-string "raw" structs
//! (`Raw*`), since `regex::Regex` is not `Deserialize`; [`compile`] turns
//! a fully-merged [`RawConfig`] into the runtime types the rest of the
//! engine consumes (`Convention`, `ReleaseType`, `ChangelogConfig`,
//! `ServiceConfig`).
//!
//! # Layers (highest precedence first)
//! 1. Command-line/environment overrides (applied by the CLI crate on
//!    top of the value this module returns).
//! 2. Explicit file (`--config`/`configurationFile`).
//! 3. Shared file (`sharedConfigurationFile`, typically checked into a
//!    parent or org-wide location).
//! 4. Named preset (`extended`, `simple`, `extendedGitFlow`).
//! 5. Built-in defaults.
//!
//! Resolution is deep-merge on maps, replace on scalars and lists —
//! `figment`'s `Provider` merge semantics give us this for free.

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Format, Json, Serialized, Toml, Yaml};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::changelog::{ChangelogConfig, Section, Substitution};
use crate::convention::Convention;
use crate::error::{ConfigError, ConfigResult};
use crate::hosting::ServiceConfig;
use crate::release_type::{IdentifierRule, ReleaseType, WorkspaceStatus};
use crate::version::{BumpComponent, Position};

/// Deserializable configuration, before pattern compilation.
///
/// All section fields carry built-in defaults — a config file overrides
/// only the keys it sets, per the deep-merge rule.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RawConfig {
    /// Log level for the application (`"debug"`, `"info"`, `"warn"`, `"error"`).
    pub log_level: LogLevel,
    /// Directory for JSONL log files (falls back to platform defaults if unset).
    pub log_dir: Option<Utf8PathBuf>,
    /// Fallback version when no tag matches a type's `filterTags`.
    pub initial_version: String,
    /// Explicit version override. When set, `infer` still resolves the
    /// scope against history but replaces the inferred candidate with this
    /// value, recording the original in `State.overridden_version`.
    pub version: Option<String>,
    /// Prefix stripped/added when parsing/rendering tags (e.g. `"v"`).
    pub release_prefix: String,
    /// Version scheme identifier (currently only `"semver"`).
    pub scheme: String,
    /// Explicit bump override, bypassing commit classification.
    pub bump: Option<String>,
    /// Named preset to merge beneath file-based layers (`"simple"`,
    /// `"extended"`, `"extendedGitFlow"`).
    pub preset: Option<String>,
    /// Path to a second configuration file merged beneath the project file.
    pub shared_configuration_file: Option<Utf8PathBuf>,
    /// Skip every side-effecting operation, logging what would have run.
    pub dry_run: bool,
    /// Resume from `state_file` if present and not stale.
    pub resume: bool,
    /// Where to persist/load State; `None` disables persistence.
    pub state_file: Option<Utf8PathBuf>,
    /// Changelog rendering configuration.
    pub changelog: RawChangelogConfig,
    /// Enabled commit message conventions, in priority order.
    pub commit_message_conventions: IndexMap<String, RawConvention>,
    /// Configured release types, in priority order.
    pub release_types: IndexMap<String, RawReleaseType>,
    /// Configured hosting services, keyed by a user-chosen name.
    pub services: IndexMap<String, RawServiceConfig>,
}

/// Raw (string-pattern) form of [`Convention`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RawConvention {
    /// Regex source matched against a commit message's subject line.
    pub expression: String,
    /// Bump component name (`"major"`, `"minor"`, `"patch"`, or any other
    /// string used as a named pre-release qualifier) → regex source.
    pub bump_expressions: IndexMap<String, String>,
}

/// Raw (string-pattern/template) form of [`IdentifierRule`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RawIdentifierRule {
    /// `"preRelease"` or `"build"`.
    pub position: String,
    /// Identifier qualifier.
    pub qualifier: String,
    /// Template producing the identifier's value.
    pub value_template: String,
}

/// Raw (string-pattern/template) form of [`ReleaseType`].
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RawReleaseType {
    /// Branch-name regex source.
    pub match_branches: Option<String>,
    /// Environment variable name → required-value regex source.
    pub match_environment_variables: IndexMap<String, String>,
    /// `"clean"`, `"dirty"`, or `"any"`.
    pub match_workspace_status: String,
    /// Tag filter regex source.
    pub filter_tags: String,
    /// Whether this type collapses versions onto a shared base.
    pub collapse_versions: bool,
    /// Template producing the collapsed pre-release qualifier.
    pub collapsed_version_qualifier: Option<String>,
    /// Explicit version-range regex source.
    pub version_range: Option<String>,
    /// Derive the version range from the branch name instead.
    pub version_range_from_branch_name: bool,
    /// Extra identifiers appended to the candidate, in order.
    pub identifiers: Vec<RawIdentifierRule>,
    pub git_commit: bool,
    pub git_commit_message: String,
    pub git_push: bool,
    pub git_tag: bool,
    pub git_tag_message: String,
    pub publish: bool,
    pub remote_repositories: Vec<String>,
    pub publication_services: Vec<String>,
    pub description: String,
}

/// Raw (string-pattern) form of a [`Section`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RawSection {
    /// Heading text.
    pub name: String,
    /// Regex source matched against a commit's conventional-commits type.
    pub type_pattern: String,
}

/// Raw (string-pattern) form of a [`Substitution`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RawSubstitution {
    /// Regex source matched against a rendered bullet line.
    pub pattern: String,
    /// Replacement text.
    pub replacement: String,
}

/// Raw form of [`ChangelogConfig`].
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RawChangelogConfig {
    /// Destination path; unset disables changelog building.
    pub path: Option<Utf8PathBuf>,
    /// Project title used in the header.
    pub title: String,
    /// Ordered sections.
    pub sections: Vec<RawSection>,
    /// Ordered rewrite rules.
    pub substitutions: Vec<RawSubstitution>,
    /// Overrides the default header+sections layout when set.
    pub template: Option<String>,
}

/// Raw form of [`ServiceConfig`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RawServiceConfig {
    /// `"github"`, `"gitlab"`, or `"gitea"`.
    pub provider: String,
    /// API base URL.
    pub base_uri: String,
    /// Name of the environment variable holding the bearer token.
    pub authentication_token_environment_variable: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

/// Log level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging and development.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Returns the log level as a lowercase string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            log_dir: None,
            initial_version: "0.1.0".to_string(),
            version: None,
            release_prefix: "v".to_string(),
            scheme: "semver".to_string(),
            bump: None,
            preset: None,
            shared_configuration_file: None,
            dry_run: false,
            resume: false,
            state_file: None,
            changelog: RawChangelogConfig::default(),
            commit_message_conventions: IndexMap::new(),
            release_types: IndexMap::new(),
            services: IndexMap::new(),
        }
    }
}

/// Supported configuration file extensions (in order of preference).
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Application name for XDG directory lookup and config file names.
const APP_NAME: &str = "nyx";

/// Builder for loading configuration from multiple layered sources.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    project_search_root: Option<Utf8PathBuf>,
    include_user_config: bool,
    boundary_marker: Option<String>,
    explicit_files: Vec<Utf8PathBuf>,
    preset_override: Option<String>,
}

impl ConfigLoader {
    /// Create a new config loader with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            project_search_root: None,
            include_user_config: true,
            boundary_marker: Some(".git".to_string()),
            explicit_files: Vec::new(),
            preset_override: None,
        }
    }

    /// Set the starting directory for project config search.
    #[must_use]
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.project_search_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set whether to include user config from `~/.config/nyx/`.
    #[must_use]
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.include_user_config = include;
        self
    }

    /// Set a boundary marker to stop directory traversal.
    #[must_use]
    pub fn with_boundary_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.boundary_marker = Some(marker.into());
        self
    }

    /// Disable boundary marker (search all the way to filesystem root).
    #[must_use]
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary_marker = None;
        self
    }

    /// Add an explicit config file to load, highest precedence, later
    /// calls taking priority over earlier ones.
    #[must_use]
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Force a preset regardless of what any loaded file specifies.
    #[must_use]
    pub fn with_preset<S: Into<String>>(mut self, preset: S) -> Self {
        self.preset_override = Some(preset.into());
        self
    }

    /// Load configuration, merging every layer.
    #[tracing::instrument(skip(self), fields(search_root = ?self.project_search_root))]
    pub fn load(self) -> ConfigResult<RawConfig> {
        tracing::debug!("loading configuration");

        // Layer 5: built-in defaults.
        let mut figment = Figment::new().merge(Serialized::defaults(RawConfig::default()));

        // Layer 4: preset, if requested by an override or by a quick
        // pre-scan of the files we're about to load.
        let preset_name = self
            .preset_override
            .clone()
            .or_else(|| self.prescan_preset())
            .unwrap_or_default();
        if !preset_name.is_empty() {
            let preset = preset(&preset_name)?;
            figment = figment.merge(Serialized::defaults(preset));
        }

        // Layer 3: shared configuration file, discovered via the project
        // file's `sharedConfigurationFile` field if not set directly.
        if let Some(ref root) = self.project_search_root
            && let Some(project_file) = self.find_project_config(root)
        {
            if let Some(shared) = Self::read_shared_path(&project_file) {
                figment = Self::merge_file(figment, &shared);
            }
            // Layer 2: the discovered project file itself.
            figment = Self::merge_file(figment, &project_file);
        }

        if self.include_user_config
            && let Some(user_config) = self.find_user_config()
        {
            figment = Self::merge_file(figment, &user_config);
        }

        // Layer 1 (of this module's scope): explicit files, in order.
        for file in &self.explicit_files {
            figment = Self::merge_file(figment, file);
        }

        let config: RawConfig = figment.extract().map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        tracing::info!(log_level = config.log_level.as_str(), preset = %preset_name, "configuration loaded");
        Ok(config)
    }

    /// Load configuration, returning an error if no config file is found
    /// anywhere (presets/defaults alone do not count).
    pub fn load_or_error(self) -> ConfigResult<RawConfig> {
        let has_user = self.include_user_config && self.find_user_config().is_some();
        let has_project = self.project_search_root.as_ref().and_then(|root| self.find_project_config(root)).is_some();
        let has_explicit = !self.explicit_files.is_empty();

        if !has_user && !has_project && !has_explicit {
            return Err(ConfigError::NotFound);
        }

        self.load()
    }

    fn prescan_preset(&self) -> Option<String> {
        let candidates = self
            .project_search_root
            .as_ref()
            .and_then(|root| self.find_project_config(root))
            .into_iter()
            .chain(self.explicit_files.iter().cloned());

        for path in candidates {
            if let Ok(raw) = std::fs::read_to_string(&path) {
                let figment = Self::merge_file(Figment::new(), &path);
                if let Ok(partial) = figment.extract::<RawConfig>()
                    && let Some(preset) = partial.preset
                {
                    return Some(preset);
                }
                drop(raw);
            }
        }
        None
    }

    fn read_shared_path(project_file: &Utf8Path) -> Option<Utf8PathBuf> {
        let figment = Self::merge_file(Figment::new(), project_file);
        figment.extract::<RawConfig>().ok()?.shared_configuration_file
    }

    fn find_project_config(&self, start: &Utf8Path) -> Option<Utf8PathBuf> {
        let mut current = Some(start.to_path_buf());

        while let Some(dir) = current {
            if let Some(ref marker) = self.boundary_marker {
                let marker_path = dir.join(marker);
                if marker_path.exists() && dir != start {
                    break;
                }
            }

            for ext in CONFIG_EXTENSIONS {
                let dotfile = dir.join(format!(".{APP_NAME}.{ext}"));
                if dotfile.is_file() {
                    return Some(dotfile);
                }
                let regular = dir.join(format!("{APP_NAME}.{ext}"));
                if regular.is_file() {
                    return Some(regular);
                }
            }

            current = dir.parent().map(Utf8Path::to_path_buf);
        }

        None
    }

    fn find_user_config(&self) -> Option<Utf8PathBuf> {
        let proj_dirs = directories::ProjectDirs::from("", "", APP_NAME)?;
        let config_dir = proj_dirs.config_dir();

        for ext in CONFIG_EXTENSIONS {
            let config_path = config_dir.join(format!("config.{ext}"));
            if config_path.is_file() {
                return Utf8PathBuf::from_path_buf(config_path).ok();
            }
        }

        None
    }

    fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
        match path.extension() {
            Some("toml") => figment.merge(Toml::file_exact(path.as_str())),
            Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
            Some("json") => figment.merge(Json::file_exact(path.as_str())),
            _ => figment.merge(Toml::file_exact(path.as_str())),
        }
    }
}

/// Find the project config file path without loading it.
#[must_use]
pub fn find_project_config<P: AsRef<Utf8Path>>(start: P) -> Option<Utf8PathBuf> {
    ConfigLoader::new().with_project_search(start.as_ref()).without_boundary_marker().find_project_config(start.as_ref())
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// `~/.config/nyx/` on Linux, `~/Library/Application Support/nyx/` on
/// macOS, and equivalent elsewhere.
#[must_use]
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(project_dirs()?.config_dir().to_path_buf()).ok()
}

/// `~/.cache/nyx/` on Linux, `~/Library/Caches/nyx/` on macOS, and
/// equivalent elsewhere.
#[must_use]
pub fn user_cache_dir() -> Option<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(project_dirs()?.cache_dir().to_path_buf()).ok()
}

/// `~/.local/share/nyx/` on Linux, `~/Library/Application Support/nyx/`
/// on macOS, and equivalent elsewhere.
#[must_use]
pub fn user_data_dir() -> Option<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(project_dirs()?.data_dir().to_path_buf()).ok()
}

// --- Compilation: Raw* (string patterns/templates) -> runtime types ----

/// Compile every pattern in `raw` into the runtime types the rest of the
/// engine consumes. Called once per run, immediately after loading.
pub fn compile(raw: &RawConfig) -> ConfigResult<Compiled> {
    let conventions = raw
        .commit_message_conventions
        .values()
        .map(compile_convention)
        .collect::<ConfigResult<Vec<_>>>()?;

    let release_types = raw
        .release_types
        .iter()
        .map(|(name, rt)| compile_release_type(name, rt))
        .collect::<ConfigResult<Vec<_>>>()?;

    let changelog = compile_changelog(&raw.changelog)?;

    let services = raw
        .services
        .iter()
        .map(|(name, svc)| compile_service(name, svc))
        .collect::<ConfigResult<Vec<_>>>()?;

    let bump_override = raw.bump.as_deref().map(bump_component);

    Ok(Compiled {
        version: raw.version.clone(),
        initial_version: raw.initial_version.clone(),
        release_prefix: raw.release_prefix.clone(),
        bump_override,
        conventions,
        release_types,
        changelog,
        services,
    })
}

/// The fully-compiled configuration: every regex parsed, every structural
/// field validated.
#[derive(Debug, Clone)]
pub struct Compiled {
    /// Explicit version override, if configured.
    pub version: Option<String>,
    /// Fallback version when no tag matches a type's `filterTags`.
    pub initial_version: String,
    /// Prefix stripped/added when parsing/rendering tags (e.g. `"v"`).
    pub release_prefix: String,
    /// Explicit bump override, bypassing commit classification entirely.
    pub bump_override: Option<BumpComponent>,
    /// Enabled commit conventions, in priority order.
    pub conventions: Vec<Convention>,
    /// Configured release types, in priority order.
    pub release_types: Vec<ReleaseType>,
    /// Changelog builder configuration.
    pub changelog: ChangelogConfig,
    /// Configured hosting services, keyed by name.
    pub services: Vec<(String, ServiceConfig)>,
}

fn regex(pattern: &str) -> ConfigResult<Regex> {
    Regex::new(pattern).map_err(|e| ConfigError::Deserialize(Box::new(figment::Error::from(e.to_string()))))
}

fn compile_convention(raw: &RawConvention) -> ConfigResult<Convention> {
    let expression = regex(&raw.expression)?;
    let mut bump_expressions = IndexMap::new();
    for (name, pattern) in &raw.bump_expressions {
        bump_expressions.insert(bump_component(name), regex(pattern)?);
    }
    Ok(Convention { expression, bump_expressions })
}

fn bump_component(name: &str) -> BumpComponent {
    match name {
        "major" => BumpComponent::Major,
        "minor" => BumpComponent::Minor,
        "patch" => BumpComponent::Patch,
        other => BumpComponent::Named(other.to_string()),
    }
}

fn compile_release_type(name: &str, raw: &RawReleaseType) -> ConfigResult<ReleaseType> {
    let match_branches = raw.match_branches.as_deref().map(regex).transpose()?;

    let mut match_environment_variables = IndexMap::new();
    for (var, pattern) in &raw.match_environment_variables {
        match_environment_variables.insert(var.clone(), regex(pattern)?);
    }

    let match_workspace_status = match raw.match_workspace_status.as_str() {
        "clean" => WorkspaceStatus::Clean,
        "dirty" => WorkspaceStatus::Dirty,
        _ => WorkspaceStatus::Any,
    };

    let identifiers = raw
        .identifiers
        .iter()
        .map(|i| {
            let position = if i.position == "build" { Position::Build } else { Position::PreRelease };
            IdentifierRule { position, qualifier: i.qualifier.clone(), value_template: i.value_template.clone() }
        })
        .collect();

    Ok(ReleaseType {
        name: name.to_string(),
        match_branches,
        match_environment_variables,
        match_workspace_status,
        filter_tags: if raw.filter_tags.is_empty() { "^v".to_string() } else { raw.filter_tags.clone() },
        collapse_versions: raw.collapse_versions,
        collapsed_version_qualifier: raw.collapsed_version_qualifier.clone(),
        version_range: raw.version_range.clone(),
        version_range_from_branch_name: raw.version_range_from_branch_name,
        identifiers,
        git_commit: raw.git_commit,
        git_commit_message: raw.git_commit_message.clone(),
        git_push: raw.git_push,
        git_tag: raw.git_tag,
        git_tag_message: raw.git_tag_message.clone(),
        publish: raw.publish,
        remote_repositories: raw.remote_repositories.clone(),
        publication_services: raw.publication_services.clone(),
        description: raw.description.clone(),
    })
}

fn compile_changelog(raw: &RawChangelogConfig) -> ConfigResult<ChangelogConfig> {
    let sections = raw
        .sections
        .iter()
        .map(|s| Ok(Section { name: s.name.clone(), type_pattern: regex(&s.type_pattern)? }))
        .collect::<ConfigResult<Vec<_>>>()?;

    let substitutions = raw
        .substitutions
        .iter()
        .map(|s| Ok(Substitution { pattern: regex(&s.pattern)?, replacement: s.replacement.clone() }))
        .collect::<ConfigResult<Vec<_>>>()?;

    Ok(ChangelogConfig {
        path: raw.path.clone(),
        title: if raw.title.is_empty() { "Changelog".to_string() } else { raw.title.clone() },
        sections: if sections.is_empty() { crate::changelog::conventional_sections() } else { sections },
        substitutions,
        template: raw.template.clone(),
    })
}

fn compile_service(name: &str, raw: &RawServiceConfig) -> ConfigResult<(String, ServiceConfig)> {
    let token = std::env::var(&raw.authentication_token_environment_variable).unwrap_or_default();
    Ok((
        name.to_string(),
        ServiceConfig {
            provider: raw.provider.clone(),
            base_url: raw.base_uri.clone(),
            token,
            timeout: std::time::Duration::from_secs(if raw.timeout_seconds == 0 { 60 } else { raw.timeout_seconds }),
        },
    ))
}

// --- Presets: compiled-in constant bundles ------------------------------

fn preset(name: &str) -> ConfigResult<RawConfig> {
    match name {
        "simple" => Ok(preset_simple()),
        "extended" => Ok(preset_extended()),
        "extendedGitFlow" => Ok(preset_extended_git_flow()),
        other => Err(ConfigError::UnknownPreset(other.to_string())),
    }
}

fn conventional_commits_convention() -> RawConvention {
    let mut bump_expressions = IndexMap::new();
    bump_expressions.insert("major".to_string(), r"(?s)^.*!:|BREAKING CHANGE".to_string());
    bump_expressions.insert("minor".to_string(), r"^feat(\(|:)".to_string());
    bump_expressions.insert("patch".to_string(), r"^(fix|perf)(\(|:)".to_string());

    RawConvention {
        expression: r"(?xs)^(?P<type>\w+)(?:\((?P<scope>[^)]+)\))?(?P<breaking>!)?:\s*(?P<title>.+)".to_string(),
        bump_expressions,
    }
}

fn base_release_type() -> RawReleaseType {
    RawReleaseType { filter_tags: "^v".to_string(), match_workspace_status: "any".to_string(), ..RawReleaseType::default() }
}

/// A single `mainline` type on `main`/`master`, tagging and publishing
/// every release directly.
fn preset_simple() -> RawConfig {
    let mut conventions = IndexMap::new();
    conventions.insert("conventionalCommits".to_string(), conventional_commits_convention());

    let mainline = RawReleaseType {
        match_branches: Some("^(main|master)$".to_string()),
        git_commit: true,
        git_commit_message: "Release {{version}}".to_string(),
        git_tag: true,
        git_tag_message: "Release {{version}}".to_string(),
        git_push: true,
        publish: true,
        remote_repositories: vec!["origin".to_string()],
        description: "Mainline releases from {{branch}}".to_string(),
        ..base_release_type()
    };

    let mut release_types = IndexMap::new();
    release_types.insert("mainline".to_string(), mainline);

    RawConfig { commit_message_conventions: conventions, release_types, ..RawConfig::default() }
}

/// The full mainline/maturity/integration/hotfix/feature/release/
/// maintenance/internal rule set: maturity branches collapse onto a
/// shared pre-release line, feature/internal branches never publish.
fn preset_extended() -> RawConfig {
    let mut conventions = IndexMap::new();
    conventions.insert("conventionalCommits".to_string(), conventional_commits_convention());

    let mut release_types = IndexMap::new();

    release_types.insert(
        "mainline".to_string(),
        RawReleaseType {
            match_branches: Some("^(main|master)$".to_string()),
            git_commit: true,
            git_commit_message: "Release {{version}}".to_string(),
            git_tag: true,
            git_tag_message: "Release {{version}}".to_string(),
            git_push: true,
            publish: true,
            remote_repositories: vec!["origin".to_string()],
            publication_services: vec!["github".to_string()],
            description: "Mainline releases".to_string(),
            ..base_release_type()
        },
    );

    release_types.insert(
        "maturity".to_string(),
        RawReleaseType {
            match_branches: Some("^(alpha|beta|rc)$".to_string()),
            collapse_versions: true,
            collapsed_version_qualifier: Some("{{branch}}".to_string()),
            git_commit: true,
            git_commit_message: "Release {{version}}".to_string(),
            git_tag: true,
            git_tag_message: "Release {{version}}".to_string(),
            git_push: true,
            publish: true,
            remote_repositories: vec!["origin".to_string()],
            publication_services: vec!["github".to_string()],
            description: "Pre-release maturity line {{branch}}".to_string(),
            ..base_release_type()
        },
    );

    release_types.insert(
        "integration".to_string(),
        RawReleaseType {
            match_branches: Some("^(develop|integration)$".to_string()),
            collapse_versions: true,
            collapsed_version_qualifier: Some("integration".to_string()),
            identifiers: vec![RawIdentifierRule {
                position: "build".to_string(),
                qualifier: "timestamp".to_string(),
                value_template: "{{timestampYYYYMMDDHHMMSS}}".to_string(),
            }],
            description: "Continuous integration builds".to_string(),
            ..base_release_type()
        },
    );

    release_types.insert(
        "hotfix".to_string(),
        RawReleaseType {
            match_branches: Some(r"^hotfix/.+$".to_string()),
            version_range_from_branch_name: true,
            git_commit: true,
            git_commit_message: "Hotfix release {{version}}".to_string(),
            git_tag: true,
            git_tag_message: "Hotfix release {{version}}".to_string(),
            git_push: true,
            publish: true,
            remote_repositories: vec!["origin".to_string()],
            publication_services: vec!["github".to_string()],
            description: "Hotfix releases from a maintenance branch".to_string(),
            ..base_release_type()
        },
    );

    release_types.insert(
        "feature".to_string(),
        RawReleaseType {
            match_branches: Some(r"^feature/.+$".to_string()),
            collapse_versions: true,
            collapsed_version_qualifier: Some("{{sanitize branch}}".to_string()),
            description: "Feature-branch pre-release builds, never published".to_string(),
            ..base_release_type()
        },
    );

    release_types.insert(
        "release".to_string(),
        RawReleaseType {
            match_branches: Some(r"^rel/.+$".to_string()),
            version_range_from_branch_name: true,
            git_commit: true,
            git_commit_message: "Release {{version}}".to_string(),
            git_tag: true,
            git_tag_message: "Release {{version}}".to_string(),
            git_push: true,
            publish: true,
            remote_repositories: vec!["origin".to_string()],
            publication_services: vec!["github".to_string()],
            description: "Release-branch freezes".to_string(),
            ..base_release_type()
        },
    );

    release_types.insert(
        "maintenance".to_string(),
        RawReleaseType {
            match_branches: Some(r"^maint/.+$".to_string()),
            version_range_from_branch_name: true,
            git_commit: true,
            git_commit_message: "Maintenance release {{version}}".to_string(),
            git_tag: true,
            git_tag_message: "Maintenance release {{version}}".to_string(),
            git_push: true,
            publish: true,
            remote_repositories: vec!["origin".to_string()],
            publication_services: vec!["github".to_string()],
            description: "Maintenance-branch releases".to_string(),
            ..base_release_type()
        },
    );

    release_types.insert(
        "internal".to_string(),
        RawReleaseType { description: "Everything else: side effects disabled".to_string(), ..base_release_type() },
    );

    let mut services = IndexMap::new();
    services.insert(
        "github".to_string(),
        RawServiceConfig {
            provider: "github".to_string(),
            base_uri: "https://api.github.com".to_string(),
            authentication_token_environment_variable: "GITHUB_TOKEN".to_string(),
            timeout_seconds: 60,
        },
    );
    services.insert(
        "gitlab".to_string(),
        RawServiceConfig {
            provider: "gitlab".to_string(),
            base_uri: "https://gitlab.com/api/v4".to_string(),
            authentication_token_environment_variable: "GITLAB_TOKEN".to_string(),
            timeout_seconds: 60,
        },
    );

    RawConfig { commit_message_conventions: conventions, release_types, services, ..RawConfig::default() }
}

/// `extended` with `develop`/`feature/*`/`release/*`/`hotfix/*` naming
/// instead of trunk-based branch names, matching a GitFlow layout.
fn preset_extended_git_flow() -> RawConfig {
    let mut config = preset_extended();
    config.release_types.shift_remove("integration");
    config.release_types.insert(
        "develop".to_string(),
        RawReleaseType {
            match_branches: Some("^develop$".to_string()),
            collapse_versions: true,
            collapsed_version_qualifier: Some("develop".to_string()),
            description: "GitFlow develop branch builds".to_string(),
            ..base_release_type()
        },
    );
    config
}

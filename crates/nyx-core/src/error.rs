//! Error types for nyx-core.
//!
//! Each module defines its own narrow error enum; [`Error`] is the
//! top-level union the orchestrator propagates, with an exit code
//! attached for the CLI to return.

use thiserror::Error;

/// Errors that can occur when working with configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),

    /// Configuration file not found after searching all locations.
    #[error("no configuration file found")]
    NotFound,

    /// A named preset was requested but does not exist.
    #[error("unknown preset: {0}")]
    UnknownPreset(String),
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level error type covering every phase of a run.
///
/// Carries enough information for the CLI to map a failure to the exit
/// codes 0/1/2/3/4/5 the engine's external interface specifies.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing required configuration option.
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// Repository open, resolve, walk, commit, tag, or push failure.
    #[error(transparent)]
    Git(#[from] crate::git::GitError),

    /// Inferred version violates the active release type's version range.
    #[error(transparent)]
    VersionRange(#[from] crate::infer::VersionRangeError),

    /// Malformed template.
    #[error(transparent)]
    Template(#[from] crate::template::TemplateError),

    /// Hosting-provider HTTP or protocol failure.
    #[error(transparent)]
    Service(#[from] crate::hosting::ServiceError),

    /// Missing or rejected credentials.
    #[error("security error: {0}")]
    Security(String),

    /// State persistence failure.
    #[error(transparent)]
    Io(#[from] crate::state::StateError),

    /// Changelog rendering or write failure.
    #[error(transparent)]
    Changelog(#[from] crate::changelog::ChangelogError),

    /// Scope resolution failure (detached HEAD, no commits, ...).
    #[error(transparent)]
    Scope(#[from] crate::scope::ScopeError),

    /// Version string failed to parse under the active scheme.
    #[error(transparent)]
    Version(#[from] crate::version::VersionError),
}

impl Error {
    /// Process exit code per the engine's external-interface contract.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 2,
            Self::Git(_) => 3,
            Self::VersionRange(_) => 4,
            Self::Service(_) => 5,
            Self::Template(_) | Self::Security(_) | Self::Io(_) | Self::Scope(_) | Self::Version(_) | Self::Changelog(_) => 1,
        }
    }
}

//! Core library for the nyx release-automation engine.
//!
//! This crate provides the foundational types and functionality used by
//! the `nyx` CLI and any downstream consumers: configuration, the
//! template engine, version algebra, the git facade, convention
//! matching, release-type selection, scope resolution, version
//! inference, changelog building, hosting-service publication, state
//! persistence, and the pipeline orchestrator tying them together.
//!
//! # Quick Start
//!
//! ```no_run
//! use nyx_core::config::ConfigLoader;
//!
//! let raw = ConfigLoader::new()
//!     .with_user_config(true)
//!     .load()
//!     .expect("failed to load configuration");
//! let compiled = nyx_core::config::compile(&raw).expect("invalid configuration");
//! println!("release types: {}", compiled.release_types.len());
//! ```
#![deny(unsafe_code)]

pub mod changelog;

pub mod config;

pub mod convention;

pub mod error;

pub mod git;

pub mod hosting;

pub mod infer;

pub mod orchestrator;

pub mod preflight;

pub mod release_type;

pub mod scope;

pub mod state;

pub mod template;

pub mod version;

pub use config::{Compiled, ConfigLoader, LogLevel, RawConfig};

pub use error::{ConfigError, ConfigResult, Error};

pub use state::State;

/// Result type alias using the top-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

// Re-export semver so downstream crates don't need a direct dependency.
pub use semver;

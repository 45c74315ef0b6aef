//! Infer command — run the Infer phase only, never touching git or a
//! hosting provider, and print what the next release would look like.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use nyx_core::config::{Compiled, RawConfig};
use nyx_core::git::GitRepository;
use nyx_core::orchestrator::{self, Mode, RunOptions};

/// Arguments for the `infer` subcommand.
#[derive(Args, Debug, Default)]
pub struct InferArgs {
    /// Resume from a previously persisted state file if it is still fresh
    #[arg(long)]
    pub resume: bool,

    /// Override the configured state-file path
    #[arg(long, value_name = "FILE")]
    pub state_file: Option<PathBuf>,
}

#[derive(Serialize)]
struct Inference {
    branch: String,
    release_type: Option<String>,
    version: Option<String>,
    bump: Option<String>,
    version_range: Option<String>,
}

/// Infer the next version and print it.
#[instrument(name = "cmd_infer", skip_all, fields(json_output))]
pub fn cmd_infer(args: InferArgs, global_json: bool, raw: &RawConfig, compiled: &Compiled, cwd: &camino::Utf8Path) -> anyhow::Result<()> {
    debug!(json_output = global_json, resume = args.resume, "executing infer command");

    let repo = GitRepository::open(cwd);
    let state_path = state_path(raw, args.state_file.as_deref(), cwd);
    let env: HashMap<String, String> = std::env::vars().collect();

    let opts = RunOptions {
        repo: &repo,
        compiled,
        cwd,
        mode: Mode::InferOnly,
        dry_run: true,
        resume: args.resume || raw.resume,
        state_path: state_path.as_deref(),
        env,
    };

    let outcome = orchestrator::run(&opts)?;
    let inference = Inference {
        branch: outcome.state.branch.clone(),
        release_type: outcome.state.release_type.clone(),
        version: outcome.state.version.as_ref().map(ToString::to_string),
        bump: outcome.state.bump.clone(),
        version_range: outcome.state.version_range.clone(),
    };

    if global_json {
        println!("{}", serde_json::to_string_pretty(&inference)?);
    } else {
        println!("{}", "Inference".bold().underline());
        println!("  {}: {}", "Branch".dimmed(), inference.branch.cyan());
        if let Some(ref release_type) = inference.release_type {
            println!("  {}: {}", "Release type".dimmed(), release_type.cyan());
        }
        match &inference.version {
            Some(version) => println!("  {}: {}", "Next version".dimmed(), version.green().bold()),
            None => println!("  {}: {}", "Next version".dimmed(), "(no significant change)".yellow()),
        }
        if let Some(ref bump) = inference.bump {
            println!("  {}: {}", "Bump".dimmed(), bump);
        }
        if let Some(ref range) = inference.version_range {
            println!("  {}: {}", "Version range".dimmed(), range);
        }
    }

    Ok(())
}

/// Resolve the effective state-file path: CLI override, then configuration,
/// else `None` (no persistence).
fn state_path(raw: &RawConfig, override_path: Option<&std::path::Path>, cwd: &camino::Utf8Path) -> Option<camino::Utf8PathBuf> {
    if let Some(path) = override_path {
        return camino::Utf8PathBuf::try_from(path.to_path_buf()).ok();
    }
    raw.state_file.clone().map(|p| if p.is_absolute() { p } else { cwd.join(p) })
}

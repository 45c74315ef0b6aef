//! Release command — run the full pipeline: Infer, Mark, Make, Publish.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use nyx_core::config::{Compiled, RawConfig};
use nyx_core::git::GitRepository;
use nyx_core::orchestrator::{self, Mode, RunOptions};

/// Arguments for the `release` subcommand.
#[derive(Args, Debug, Default)]
pub struct ReleaseArgs {
    /// Log every side effect without committing, tagging, pushing, writing
    /// the changelog, or publishing a release
    #[arg(long)]
    pub dry_run: bool,

    /// Resume from a previously persisted state file if it is still fresh
    #[arg(long)]
    pub resume: bool,

    /// Override the configured state-file path
    #[arg(long, value_name = "FILE")]
    pub state_file: Option<PathBuf>,
}

#[derive(Serialize)]
struct ReleaseReport {
    branch: String,
    release_type: Option<String>,
    version: Option<String>,
    mark_succeeded: bool,
    make_succeeded: bool,
    publish_succeeded: Vec<String>,
    publish_failures: Vec<PublishFailureReport>,
    changelog: Option<String>,
}

#[derive(Serialize)]
struct PublishFailureReport {
    service: String,
    message: String,
}

/// Run the full pipeline and print the outcome.
///
/// Exits non-zero (via the returned `Err`) if any hosting service failed
/// to publish, even though earlier phases succeeded.
#[instrument(name = "cmd_release", skip_all, fields(json_output))]
pub fn cmd_release(args: ReleaseArgs, global_json: bool, raw: &RawConfig, compiled: &Compiled, cwd: &camino::Utf8Path) -> anyhow::Result<()> {
    debug!(json_output = global_json, dry_run = args.dry_run, resume = args.resume, "executing release command");

    let repo = GitRepository::open(cwd);
    let state_path = state_path(raw, args.state_file.as_deref(), cwd);
    let env: HashMap<String, String> = std::env::vars().collect();

    let opts = RunOptions {
        repo: &repo,
        compiled,
        cwd,
        mode: Mode::Release,
        dry_run: args.dry_run || raw.dry_run,
        resume: args.resume || raw.resume,
        state_path: state_path.as_deref(),
        env,
    };

    let outcome = orchestrator::run(&opts)?;
    let report = ReleaseReport {
        branch: outcome.state.branch.clone(),
        release_type: outcome.state.release_type.clone(),
        version: outcome.state.version.as_ref().map(ToString::to_string),
        mark_succeeded: outcome.state.mark_succeeded,
        make_succeeded: outcome.state.make_succeeded,
        publish_succeeded: outcome.state.publish_succeeded.clone(),
        publish_failures: outcome.publish_failures.iter().map(|f| PublishFailureReport { service: f.service.clone(), message: f.message.clone() }).collect(),
        changelog: outcome.state.changelog.as_ref().map(ToString::to_string),
    };
    let fully_succeeded = outcome.fully_succeeded();

    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", "Release".bold().underline());
        println!("  {}: {}", "Branch".dimmed(), report.branch.cyan());
        if let Some(ref release_type) = report.release_type {
            println!("  {}: {}", "Release type".dimmed(), release_type.cyan());
        }
        match &report.version {
            Some(version) => println!("  {}: {}", "Version".dimmed(), version.green().bold()),
            None => println!("  {}: {}", "Version".dimmed(), "(no significant change)".yellow()),
        }
        println!("  {}: {}", "Marked".dimmed(), check_icon(report.mark_succeeded));
        println!("  {}: {}", "Changelog".dimmed(), check_icon(report.make_succeeded));
        if let Some(ref path) = report.changelog {
            println!("    {}", path.cyan());
        }
        if report.publish_succeeded.is_empty() && report.publish_failures.is_empty() {
            println!("  {}: {}", "Published".dimmed(), "(no services configured)".yellow());
        } else {
            for service in &report.publish_succeeded {
                println!("  {} Published to {}", "✓".green(), service.cyan());
            }
            for failure in &report.publish_failures {
                println!("  {} {}: {}", "✗".red(), failure.service.bold(), failure.message);
            }
        }
    }

    if fully_succeeded {
        Ok(())
    } else {
        Err(crate::exit::PublicationFailed("one or more hosting services failed to publish".to_string()).into())
    }
}

fn check_icon(passed: bool) -> String {
    if passed { "✓".green().to_string() } else { "–".dimmed().to_string() }
}

/// Resolve the effective state-file path: CLI override, then configuration,
/// else `None` (no persistence).
fn state_path(raw: &RawConfig, override_path: Option<&std::path::Path>, cwd: &camino::Utf8Path) -> Option<camino::Utf8PathBuf> {
    if let Some(path) = override_path {
        return camino::Utf8PathBuf::try_from(path.to_path_buf()).ok();
    }
    raw.state_file.clone().map(|p| if p.is_absolute() { p } else { cwd.join(p) })
}

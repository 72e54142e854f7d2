//! Update command implementation
//!
//! Re-resolves the recorded ref of one script (or all of them) and
//! re-materializes anything that drifted. Batch updates keep going past
//! individual failures and report each script's outcome on its own line.

use std::path::Path;

use anyhow::Result;
use clap::Args;

use uv_helper::config;
use uv_helper::git;
use uv_helper::output::OutputConfig;
use uv_helper::reconcile::Reconciler;

/// Arguments for the update command
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Name of the script to update
    #[arg(value_name = "NAME", required_unless_present = "all")]
    pub name: Option<String>,

    /// Update every installed script
    #[arg(long, conflicts_with = "name")]
    pub all: bool,

    /// Re-materialize even when the resolved commit is unchanged
    #[arg(short, long)]
    pub force: bool,
}

/// Execute the update command
pub fn execute(args: UpdateArgs, config_path: Option<&Path>, output: &OutputConfig) -> Result<()> {
    git::verify_git_available()?;

    let settings = config::load(config_path)?;
    let reconciler = Reconciler::new(settings);

    let spinner = output.spinner("checking for updates");
    let results = match args.name {
        Some(name) => vec![(name.clone(), reconciler.update(&name, args.force))],
        None => reconciler.update_all(args.force)?,
    };
    spinner.finish_and_clear();

    if results.is_empty() {
        println!("no scripts installed");
        return Ok(());
    }

    let mut failures = 0usize;
    let mut conflicts = 0usize;
    for (name, outcome) in &results {
        match outcome {
            Ok(action) => {
                println!("{} {}", output.action_label(*action), name);
                if action.is_conflict() {
                    conflicts += 1;
                }
            }
            Err(e) => {
                println!("{} {}: {}", output.error_label(), name, e);
                failures += 1;
            }
        }
    }

    if failures > 0 || conflicts > 0 {
        anyhow::bail!(
            "{} of {} script(s) not updated ({} failed, {} conflicted)",
            failures + conflicts,
            results.len(),
            failures,
            conflicts
        );
    }
    Ok(())
}

//! Remove command implementation
//!
//! Deletes a script's entry point and record together. The shared
//! repository clone is kept for other scripts and only pruned when
//! `--clean-repo` is given and no other script references it.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use dialoguer::Confirm;

use uv_helper::config;
use uv_helper::output::OutputConfig;
use uv_helper::reconcile::Reconciler;

/// Arguments for the remove command
#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Name of the script to remove
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Also delete the repository clone when nothing else references it
    #[arg(long)]
    pub clean_repo: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Execute the remove command
pub fn execute(args: RemoveArgs, config_path: Option<&Path>, output: &OutputConfig) -> Result<()> {
    let settings = config::load(config_path)?;
    let reconciler = Reconciler::new(settings);

    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove '{}'?", args.name))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("aborted");
            return Ok(());
        }
    }

    let action = reconciler.remove(&args.name, args.clean_repo)?;
    println!("{} {}", output.action_label(action), args.name);

    if action.is_conflict() {
        anyhow::bail!(
            "'{}' was not removed: its entry point is not managed by uv-helper",
            args.name
        );
    }
    Ok(())
}

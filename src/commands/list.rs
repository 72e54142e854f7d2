//! List command implementation
//!
//! Prints the installed scripts from the state document, either as a
//! human-readable table or as JSON for scripting.

use std::path::Path;

use anyhow::Result;
use clap::{Args, ValueEnum};

use uv_helper::config;
use uv_helper::reconcile::Reconciler;
use uv_helper::state::ScriptRecord;

/// Output format for the list command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    /// Aligned human-readable table
    Table,
    /// Full records as a JSON array
    Json,
}

/// Arguments for the list command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = ListFormat::Table)]
    pub format: ListFormat,
}

/// Execute the list command
pub fn execute(args: ListArgs, config_path: Option<&Path>) -> Result<()> {
    let settings = config::load(config_path)?;
    let reconciler = Reconciler::new(settings);
    let records = reconciler.records()?;

    match args.format {
        ListFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        ListFormat::Table => {
            if records.is_empty() {
                println!("no scripts installed");
                return Ok(());
            }
            print_table(&records);
        }
    }
    Ok(())
}

fn print_table(records: &[ScriptRecord]) {
    let name_width = records
        .iter()
        .map(|r| r.name.len())
        .chain(std::iter::once("NAME".len()))
        .max()
        .unwrap_or(4);
    let ref_width = records
        .iter()
        .map(|r| display_ref(r).len())
        .chain(std::iter::once("REF".len()))
        .max()
        .unwrap_or(3);

    println!(
        "{:name_width$}  {:ref_width$}  {:10}  {}",
        "NAME", "REF", "COMMIT", "REPOSITORY"
    );
    for record in records {
        println!(
            "{:name_width$}  {:ref_width$}  {:10}  {}",
            record.name,
            display_ref(record),
            short_commit(&record.resolved_commit),
            record.repository_url
        );
    }
}

fn display_ref(record: &ScriptRecord) -> &str {
    record.requested_ref.as_deref().unwrap_or("(default)")
}

fn short_commit(commit: &str) -> &str {
    if commit.len() >= 10 {
        &commit[..10]
    } else {
        commit
    }
}

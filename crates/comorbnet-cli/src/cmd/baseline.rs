//! `comorbnet baseline`: zero-overlap table from cohort totals.
//!
//! The baseline is the starting point for follow-up merges: every pair
//! starts with no co-occurrence, and later deltas move persons into the
//! outcome cells.

use std::path::PathBuf;

use clap::Args;
use tracing::warn;

use comorbnet_core::config::ProjectConfig;
use comorbnet_core::provider::CsvDirProvider;
use comorbnet_core::runner::{RunOptions, build_baseline_table};

use crate::cmd::build::{RunSummary, render_summary};
use crate::cmd::{create_output, resolve_codes};
use crate::output::{OutputMode, fail};

/// Arguments for `comorbnet baseline`.
#[derive(Args, Debug)]
pub struct BaselineArgs {
    /// Directory of `matched_<code>.csv` cohort files.
    #[arg(long)]
    pub cohorts: PathBuf,

    /// Comma-separated cause codes. Default: every cohort in the directory.
    #[arg(long)]
    pub causes: Option<String>,

    /// Comma-separated outcome codes. Default: every cohort in the directory.
    #[arg(long)]
    pub outcomes: Option<String>,

    /// Where to write the baseline table (CSV).
    #[arg(long)]
    pub out: PathBuf,

    /// Worker threads (0 = one per core).
    #[arg(long)]
    pub threads: Option<usize>,
}

/// Execute `comorbnet baseline`.
///
/// # Errors
///
/// Fails on unreadable inputs, unwritable output, or when any cause unit
/// failed.
pub fn run_baseline(
    args: &BaselineArgs,
    config: &ProjectConfig,
    output: OutputMode,
) -> anyhow::Result<()> {
    let provider = CsvDirProvider::new(&args.cohorts);
    let causes = resolve_codes(args.causes.as_deref(), &provider, output)?;
    let outcomes = resolve_codes(args.outcomes.as_deref(), &provider, output)?;

    let options = RunOptions {
        threads: args.threads.unwrap_or(config.pipeline.threads),
    };
    let run = build_baseline_table(&provider, &causes, &outcomes, options)
        .map_err(|e| fail(output, &e))?;
    run.table
        .write_csv(create_output(&args.out)?)
        .map_err(|e| fail(output, &e))?;

    let summary = RunSummary::from_output(&run, None);
    render_summary(&summary, output)?;

    if summary.failed_units > 0 {
        warn!(failed = summary.failed_units, "some cause units failed");
        anyhow::bail!("{} cause unit(s) failed", summary.failed_units);
    }
    Ok(())
}

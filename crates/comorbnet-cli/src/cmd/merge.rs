//! `comorbnet merge`: apply a follow-up delta to a previous full table.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use comorbnet_core::merge::merge_follow_up;

use crate::cmd::{create_output, read_full_table};
use crate::output::{OutputMode, fail, pretty_kv, pretty_section, render_mode};

/// Arguments for `comorbnet merge`.
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Full table from the previous follow-up (CSV).
    #[arg(long)]
    pub previous: PathBuf,

    /// Delta table with the same pairs in the same order (CSV).
    #[arg(long)]
    pub delta: PathBuf,

    /// Where to write the merged table (CSV).
    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Debug, Serialize)]
struct MergeSummary {
    rows: usize,
    moved_controls: u64,
    moved_cases: u64,
    out: PathBuf,
}

/// Execute `comorbnet merge`.
///
/// # Errors
///
/// Fails on unreadable tables, misaligned tables, or counts that would go
/// negative.
pub fn run_merge(args: &MergeArgs, output: OutputMode) -> anyhow::Result<()> {
    let previous = read_full_table(&args.previous, output)?;
    let delta = read_full_table(&args.delta, output)?;

    let merged = merge_follow_up(&previous, &delta).map_err(|e| fail(output, &e))?;
    merged
        .write_csv(create_output(&args.out)?)
        .map_err(|e| fail(output, &e))?;

    let summary = MergeSummary {
        rows: merged.len(),
        moved_controls: delta.iter().map(|r| r.ct01).sum(),
        moved_cases: delta.iter().map(|r| r.ct11).sum(),
        out: args.out.clone(),
    };
    render_mode(
        output,
        &summary,
        |s, w| {
            writeln!(
                w,
                "rows={} moved_controls={} moved_cases={}",
                s.rows, s.moved_controls, s.moved_cases
            )
        },
        |s, w| {
            pretty_section(w, "Follow-up merge")?;
            pretty_kv(w, "rows", s.rows.to_string())?;
            pretty_kv(w, "moved controls", s.moved_controls.to_string())?;
            pretty_kv(w, "moved cases", s.moved_cases.to_string())?;
            pretty_kv(w, "written to", s.out.display().to_string())
        },
    )
}

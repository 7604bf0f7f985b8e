//! `comorbnet filter`: minimum-cell suppression of a full table.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use comorbnet_core::config::ProjectConfig;
use comorbnet_core::{SuppressionFilter, WeightField};

use crate::cmd::{create_output, read_full_table};
use crate::output::{OutputMode, fail, pretty_kv, pretty_section, render_mode};

/// Arguments for `comorbnet filter`.
#[derive(Args, Debug)]
pub struct FilterArgs {
    /// Full contingency table (CSV).
    #[arg(long)]
    pub input: PathBuf,

    /// Where to write the suppressed edge table (CSV).
    #[arg(long)]
    pub out: PathBuf,

    /// Minimum count every cell must reach.
    #[arg(long)]
    pub threshold: Option<u64>,

    /// Weight column to write.
    #[arg(long)]
    pub weight: Option<WeightField>,
}

#[derive(Debug, Serialize)]
struct FilterSummary {
    threshold: u64,
    weight: WeightField,
    rows_in: usize,
    edges_out: usize,
    suppressed: usize,
}

/// Execute `comorbnet filter`.
///
/// # Errors
///
/// Fails on an unreadable table, a row whose relative risk is not finite, or
/// an unwritable output.
pub fn run_filter(args: &FilterArgs, config: &ProjectConfig, output: OutputMode) -> anyhow::Result<()> {
    let table = read_full_table(&args.input, output)?;
    let filter = SuppressionFilter::new(args.threshold.unwrap_or(config.suppression.threshold));
    let weight = args.weight.unwrap_or(config.network.weight);

    let edges = filter.apply(&table).map_err(|e| fail(output, &e))?;
    edges
        .write_csv(create_output(&args.out)?, weight)
        .map_err(|e| fail(output, &e))?;

    let summary = FilterSummary {
        threshold: filter.threshold,
        weight,
        rows_in: table.len(),
        edges_out: edges.len(),
        suppressed: table.len() - edges.len(),
    };
    render_mode(
        output,
        &summary,
        |s, w| {
            writeln!(
                w,
                "threshold={} kept={} suppressed={}",
                s.threshold, s.edges_out, s.suppressed
            )
        },
        |s, w| {
            pretty_section(w, "Suppression")?;
            pretty_kv(w, "threshold", s.threshold.to_string())?;
            pretty_kv(w, "weight", s.weight.as_str())?;
            pretty_kv(w, "kept", format!("{} of {}", s.edges_out, s.rows_in))?;
            pretty_kv(w, "suppressed", s.suppressed.to_string())
        },
    )
}

//! `comorbnet build`: full contingency table from a cohort directory.
//!
//! Every cause is one unit of work. Failed units are reported and leave their
//! rows out of the table; the command then exits non-zero so an orchestrator
//! can retry exactly those causes.

use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use tracing::{info, warn};

use comorbnet_core::config::ProjectConfig;
use comorbnet_core::provider::{CsvDirProvider, load_outcome_index};
use comorbnet_core::runner::{BuildOutput, RunOptions, UnitReport, UnitStatus, build_full_table};
use comorbnet_core::table::write_edge_persons_json;
use comorbnet_core::{SuppressionFilter, WeightField};

use crate::cmd::{create_output, resolve_codes};
use crate::output::{OutputMode, fail, pretty_kv, pretty_section, render_mode};

/// Arguments for `comorbnet build`.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Directory of `matched_<code>.csv` cohort files.
    #[arg(long)]
    pub cohorts: PathBuf,

    /// Comma-separated cause codes. Default: every cohort in the directory.
    #[arg(long)]
    pub causes: Option<String>,

    /// Comma-separated outcome codes. Default: every cohort in the directory.
    #[arg(long)]
    pub outcomes: Option<String>,

    /// Where to write the full contingency table (CSV).
    #[arg(long)]
    pub out: PathBuf,

    /// Also write the suppressed edge table (CSV).
    #[arg(long = "final")]
    pub final_out: Option<PathBuf>,

    /// Also write edge person sets (JSON keyed by `CAUSE->OUTCOME`).
    #[arg(long)]
    pub edge_persons: Option<PathBuf>,

    /// Minimum cell count for the suppressed table.
    #[arg(long)]
    pub threshold: Option<u64>,

    /// Weight column of the suppressed table.
    #[arg(long)]
    pub weight: Option<WeightField>,

    /// Worker threads (0 = one per core).
    #[arg(long)]
    pub threads: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RunSummary {
    pub rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_edges: Option<usize>,
    pub edge_person_sets: usize,
    pub completed_units: usize,
    pub failed_units: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub units: Vec<UnitReport>,
}

impl RunSummary {
    pub(crate) fn from_output(run: &BuildOutput, final_edges: Option<usize>) -> Self {
        let failed = run.failed_units().count();
        Self {
            rows: run.table.len(),
            final_edges,
            edge_person_sets: run.edge_persons.len(),
            completed_units: run.reports.len() - failed,
            failed_units: failed,
            started_at: run.started_at,
            finished_at: run.finished_at,
            units: run.reports.clone(),
        }
    }
}

pub(crate) fn render_summary(summary: &RunSummary, output: OutputMode) -> anyhow::Result<()> {
    render_mode(
        output,
        summary,
        |s, w| {
            writeln!(w, "rows={}", s.rows)?;
            if let Some(n) = s.final_edges {
                writeln!(w, "final_edges={n}")?;
            }
            writeln!(w, "completed={} failed={}", s.completed_units, s.failed_units)?;
            for unit in &s.units {
                if let UnitStatus::Failed { code, message, .. } = &unit.status {
                    writeln!(w, "failed cause={} code={code} {message}", unit.cause)?;
                }
            }
            Ok(())
        },
        |s, w| {
            pretty_section(w, "Contingency run")?;
            pretty_kv(w, "rows", s.rows.to_string())?;
            if let Some(n) = s.final_edges {
                pretty_kv(w, "final edges", n.to_string())?;
            }
            pretty_kv(w, "edge person sets", s.edge_person_sets.to_string())?;
            pretty_kv(
                w,
                "units",
                format!("{} completed, {} failed", s.completed_units, s.failed_units),
            )?;
            pretty_kv(
                w,
                "elapsed",
                format!("{} ms", (s.finished_at - s.started_at).num_milliseconds()),
            )?;
            for unit in &s.units {
                if let UnitStatus::Failed { kind, code, message } = &unit.status {
                    writeln!(w, "  ✗ {} [{code}] {kind:?}: {message}", unit.cause)?;
                }
            }
            Ok(())
        },
    )
}

/// Execute `comorbnet build`.
///
/// # Errors
///
/// Fails on unreadable inputs, a missing outcome cohort, unwritable outputs,
/// or when any cause unit failed.
pub fn run_build(args: &BuildArgs, config: &ProjectConfig, output: OutputMode) -> anyhow::Result<()> {
    let provider = CsvDirProvider::new(&args.cohorts);
    let causes = resolve_codes(args.causes.as_deref(), &provider, output)?;
    let outcomes = resolve_codes(args.outcomes.as_deref(), &provider, output)?;
    info!(causes = causes.len(), outcomes = outcomes.len(), "building contingency table");

    let index = load_outcome_index(&provider, &outcomes).map_err(|e| fail(output, &e))?;
    let options = RunOptions {
        threads: args.threads.unwrap_or(config.pipeline.threads),
    };
    let run = build_full_table(&provider, &causes, &outcomes, &index, options)
        .map_err(|e| fail(output, &e))?;

    run.table
        .write_csv(create_output(&args.out)?)
        .map_err(|e| fail(output, &e))?;

    let final_edges = match &args.final_out {
        Some(path) => {
            let filter =
                SuppressionFilter::new(args.threshold.unwrap_or(config.suppression.threshold));
            let table = filter.apply(&run.table).map_err(|e| fail(output, &e))?;
            table
                .write_csv(create_output(path)?, args.weight.unwrap_or(config.network.weight))
                .map_err(|e| fail(output, &e))?;
            Some(table.len())
        }
        None => None,
    };

    if let Some(path) = &args.edge_persons {
        let mut writer = create_output(path)?;
        write_edge_persons_json(&mut writer, &run.edge_persons).map_err(|e| fail(output, &e))?;
        writer.flush()?;
    }

    let summary = RunSummary::from_output(&run, final_edges);
    render_summary(&summary, output)?;

    if summary.failed_units > 0 {
        warn!(failed = summary.failed_units, "some cause units failed");
        anyhow::bail!("{} cause unit(s) failed", summary.failed_units);
    }
    Ok(())
}

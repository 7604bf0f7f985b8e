//! Parallel per-cause table construction.
//!
//! Each cause disease is an independent unit of work: it reads its own cohort
//! through the [`CohortProvider`] and consults the shared, read-only
//! [`OutcomeIndex`]. Units run on a rayon pool and never share mutable state.
//! Results are reduced by a single writer in cause order, so the table does not
//! depend on which unit finishes first.
//!
//! A failing unit does not abort the others. Its failure is categorized in a
//! [`UnitReport`] for the external orchestrator, and its rows are absent from
//! the table.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::code::DiseaseCode;
use crate::cohort::OutcomeIndex;
use crate::contingency::{CauseContingency, EdgePersonSet, baseline_rows, build_contingency};
use crate::error::{ComorbError, ErrorCode, FailureKind};
use crate::provider::CohortProvider;
use crate::table::FullContingencyTable;

/// Worker pool sizing. `threads == 0` uses rayon's global pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub threads: usize,
}

/// Outcome of one cause unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitStatus {
    Completed {
        rows: usize,
        edge_person_sets: usize,
    },
    Failed {
        kind: FailureKind,
        code: ErrorCode,
        message: String,
    },
}

/// Per-cause report for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitReport {
    pub cause: DiseaseCode,
    #[serde(flatten)]
    pub status: UnitStatus,
}

impl UnitReport {
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self.status, UnitStatus::Completed { .. })
    }
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub table: FullContingencyTable,
    pub edge_persons: Vec<EdgePersonSet>,
    pub reports: Vec<UnitReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BuildOutput {
    pub fn failed_units(&self) -> impl Iterator<Item = &UnitReport> {
        self.reports.iter().filter(|r| !r.is_completed())
    }

    /// Whether every cause unit completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.reports.iter().all(UnitReport::is_completed)
    }
}

/// Count every `(cause, outcome)` pair for each cause.
///
/// # Errors
///
/// Only run-level failures are returned: a worker pool that cannot be built,
/// or a reduced table that violates key uniqueness. Per-cause failures are
/// reported in [`BuildOutput::reports`].
#[instrument(skip_all, fields(causes = causes.len(), outcomes = outcomes.len()))]
pub fn build_full_table<P: CohortProvider + ?Sized>(
    provider: &P,
    causes: &[DiseaseCode],
    outcomes: &[DiseaseCode],
    index: &OutcomeIndex,
    options: RunOptions,
) -> Result<BuildOutput, ComorbError> {
    run_units(causes, options, |cause| {
        let cohort = provider.cohort(cause)?;
        build_contingency(&cohort, outcomes, index)
    })
}

/// Zero-overlap rows for each cause, from cohort totals only.
///
/// # Errors
///
/// Same as [`build_full_table`].
#[instrument(skip_all, fields(causes = causes.len(), outcomes = outcomes.len()))]
pub fn build_baseline_table<P: CohortProvider + ?Sized>(
    provider: &P,
    causes: &[DiseaseCode],
    outcomes: &[DiseaseCode],
    options: RunOptions,
) -> Result<BuildOutput, ComorbError> {
    run_units(causes, options, |cause| {
        let cohort = provider.cohort(cause)?;
        Ok(baseline_rows(&cohort, outcomes))
    })
}

fn run_units<F>(
    causes: &[DiseaseCode],
    options: RunOptions,
    unit: F,
) -> Result<BuildOutput, ComorbError>
where
    F: Fn(DiseaseCode) -> Result<CauseContingency, ComorbError> + Sync,
{
    let started_at = Utc::now();
    let causes = dedup_in_order(causes);

    let run = || -> Vec<(DiseaseCode, Result<CauseContingency, ComorbError>)> {
        causes
            .par_iter()
            .map(|&cause| (cause, unit(cause)))
            .collect()
    };
    let results = if options.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(options.threads)
            .build()?
            .install(run)
    } else {
        run()
    };

    // Single writer; `collect` above preserved cause order.
    let mut rows = Vec::new();
    let mut edge_persons = Vec::new();
    let mut reports = Vec::with_capacity(results.len());
    for (cause, result) in results {
        let status = match result {
            Ok(contingency) => {
                let status = UnitStatus::Completed {
                    rows: contingency.rows.len(),
                    edge_person_sets: contingency.edge_persons.len(),
                };
                rows.extend(contingency.rows);
                edge_persons.extend(contingency.edge_persons);
                status
            }
            Err(err) => {
                warn!(%cause, code = %err.code(), error = %err, "cause unit failed");
                UnitStatus::Failed {
                    kind: err.failure_kind(),
                    code: err.code(),
                    message: err.to_string(),
                }
            }
        };
        reports.push(UnitReport { cause, status });
    }

    let table = FullContingencyTable::from_rows(rows)?;
    let finished_at = Utc::now();
    let failed = reports.iter().filter(|r| !r.is_completed()).count();
    info!(
        rows = table.len(),
        units = reports.len(),
        failed,
        elapsed_ms = (finished_at - started_at).num_milliseconds(),
        "table build finished"
    );

    Ok(BuildOutput {
        table,
        edge_persons,
        reports,
        started_at,
        finished_at,
    })
}

fn dedup_in_order(codes: &[DiseaseCode]) -> Vec<DiseaseCode> {
    let mut seen = std::collections::HashSet::new();
    codes.iter().copied().filter(|c| seen.insert(*c)).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

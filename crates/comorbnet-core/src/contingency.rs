//! Per-cause 2×2 contingency counts.
//!
//! For a cause disease `C` and an outcome disease `O`, every member of `C`'s
//! matched cohort lands in exactly one cell:
//!
//! | cell   | cause-cohort status | in `O`'s outcome set |
//! |--------|---------------------|----------------------|
//! | `ct00` | control             | no                   |
//! | `ct01` | control             | yes                  |
//! | `ct10` | case                | no                   |
//! | `ct11` | case                | yes                  |
//!
//! The case ∧ outcome persons of each pair are kept as an [`EdgePersonSet`]
//! when non-empty, so later follow-up runs can tell who already contributed.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::code::{DiseaseCode, PairKey};
use crate::cohort::{Cohort, OutcomeSource};
use crate::error::{Cell, ComorbError};

// ---------------------------------------------------------------------------
// ContingencyRow
// ---------------------------------------------------------------------------

/// Counts for one directed `(cause, outcome)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingencyRow {
    pub cause: DiseaseCode,
    pub outcome: DiseaseCode,
    pub ct00: u64,
    pub ct01: u64,
    pub ct10: u64,
    pub ct11: u64,
}

impl ContingencyRow {
    #[must_use]
    pub const fn new(key: PairKey, ct00: u64, ct01: u64, ct10: u64, ct11: u64) -> Self {
        Self {
            cause: key.cause,
            outcome: key.outcome,
            ct00,
            ct01,
            ct10,
            ct11,
        }
    }

    /// Row for a pair with no cohort member in the outcome set: every control
    /// lands in `ct00`, every case in `ct10`.
    #[must_use]
    pub const fn zero_overlap(key: PairKey, cases: u64, controls: u64) -> Self {
        Self::new(key, controls, 0, cases, 0)
    }

    #[must_use]
    pub const fn key(&self) -> PairKey {
        PairKey::new(self.cause, self.outcome)
    }

    #[must_use]
    pub const fn cell(&self, cell: Cell) -> u64 {
        match cell {
            Cell::Ct00 => self.ct00,
            Cell::Ct01 => self.ct01,
            Cell::Ct10 => self.ct10,
            Cell::Ct11 => self.ct11,
        }
    }

    /// Size of the cause cohort.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.ct00 + self.ct01 + self.ct10 + self.ct11
    }

    #[must_use]
    pub const fn cases(&self) -> u64 {
        self.ct10 + self.ct11
    }

    #[must_use]
    pub const fn controls(&self) -> u64 {
        self.ct00 + self.ct01
    }

    /// Smallest of the four cells.
    #[must_use]
    pub fn min_cell(&self) -> u64 {
        self.ct00.min(self.ct01).min(self.ct10).min(self.ct11)
    }

    /// `(ct11 / cases) / (ct01 / controls)`.
    ///
    /// Not necessarily finite: a zero `ct01` or an empty case group yields
    /// infinity or NaN, which callers must reject before using it as a weight.
    #[must_use]
    pub fn relative_risk(&self) -> f64 {
        let case_rate = self.ct11 as f64 / self.cases() as f64;
        let control_rate = self.ct01 as f64 / self.controls() as f64;
        case_rate / control_rate
    }
}

/// Case ∧ outcome persons of a pair, sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgePersonSet {
    pub key: PairKey,
    pub persons: Vec<i64>,
}

/// Everything produced for one cause disease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CauseContingency {
    pub cause: DiseaseCode,
    pub rows: Vec<ContingencyRow>,
    pub edge_persons: Vec<EdgePersonSet>,
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Count every `(cause, outcome)` pair for one cause cohort.
///
/// Outcomes equal to the cause are skipped. Rows follow the order of
/// `outcomes`.
///
/// # Errors
///
/// Returns [`ComorbError::MissingCohort`] naming the outcome if `source` has
/// no person set for one of the outcomes.
#[instrument(skip(cohort, outcomes, source), fields(cause = %cohort.code(), outcomes = outcomes.len()))]
pub fn build_contingency<S: OutcomeSource + ?Sized>(
    cohort: &Cohort,
    outcomes: &[DiseaseCode],
    source: &S,
) -> Result<CauseContingency, ComorbError> {
    let cause = cohort.code();
    let cases = cohort.case_count();
    let controls = cohort.control_count();

    let mut rows = Vec::with_capacity(outcomes.len());
    let mut edge_persons = Vec::new();

    for &outcome in outcomes {
        if outcome == cause {
            continue;
        }
        let key = PairKey::new(cause, outcome);
        let set = source
            .outcome_persons(outcome)
            .ok_or(ComorbError::MissingCohort { code: outcome })?;

        if set.is_empty() {
            rows.push(ContingencyRow::zero_overlap(key, cases, controls));
            continue;
        }

        let mut row = ContingencyRow::new(key, 0, 0, 0, 0);
        let mut joint = Vec::new();
        for record in cohort.records() {
            match (record.is_case, set.contains(record.person_id)) {
                (false, false) => row.ct00 += 1,
                (false, true) => row.ct01 += 1,
                (true, false) => row.ct10 += 1,
                (true, true) => {
                    row.ct11 += 1;
                    joint.push(record.person_id);
                }
            }
        }

        if !joint.is_empty() {
            joint.sort_unstable();
            edge_persons.push(EdgePersonSet {
                key,
                persons: joint,
            });
        }
        rows.push(row);
    }

    debug!(
        rows = rows.len(),
        edge_person_sets = edge_persons.len(),
        "cause counted"
    );

    Ok(CauseContingency {
        cause,
        rows,
        edge_persons,
    })
}

/// Zero-overlap rows for a cause, from its case and control totals alone.
///
/// Seeds a follow-up delta for causes whose new outcome events have not been
/// observed yet.
#[must_use]
pub fn baseline_rows(cohort: &Cohort, outcomes: &[DiseaseCode]) -> CauseContingency {
    let cause = cohort.code();
    let rows = outcomes
        .iter()
        .filter(|&&outcome| outcome != cause)
        .map(|&outcome| {
            ContingencyRow::zero_overlap(
                PairKey::new(cause, outcome),
                cohort.case_count(),
                cohort.control_count(),
            )
        })
        .collect();

    CauseContingency {
        cause,
        rows,
        edge_persons: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Minimum-cell-count suppression.
//!
//! A pair is published only if all four of its cells reach the threshold.
//! There is no partial release: a row with one small cell is dropped whole.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::contingency::ContingencyRow;
use crate::error::ComorbError;
use crate::table::{FinalEdge, FinalEdgeTable, FullContingencyTable};

/// Default minimum count for every published cell.
pub const DEFAULT_THRESHOLD: u64 = 5;

/// Hard gate on small cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionFilter {
    pub threshold: u64,
}

impl Default for SuppressionFilter {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl SuppressionFilter {
    #[must_use]
    pub const fn new(threshold: u64) -> Self {
        Self { threshold }
    }

    #[must_use]
    pub fn passes(&self, row: &ContingencyRow) -> bool {
        row.min_cell() >= self.threshold
    }

    /// Rows that pass, in their original order.
    ///
    /// # Errors
    ///
    /// Never fails for a valid input table; the result is re-validated like
    /// any other table.
    pub fn filter_rows(
        &self,
        table: &FullContingencyTable,
    ) -> Result<FullContingencyTable, ComorbError> {
        FullContingencyTable::from_rows(table.iter().filter(|r| self.passes(r)).copied().collect())
    }

    /// Suppress and attach relative risks.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::IntegrityViolation::NonFiniteWeight`] if a
    /// surviving row has no finite relative risk (possible only with a
    /// threshold of zero).
    #[instrument(skip(self, table), fields(threshold = self.threshold, rows = table.len()))]
    pub fn apply(&self, table: &FullContingencyTable) -> Result<FinalEdgeTable, ComorbError> {
        let edges = table
            .iter()
            .filter(|r| self.passes(r))
            .map(|r| FinalEdge::from_row(*r))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            kept = edges.len(),
            suppressed = table.len() - edges.len(),
            "suppression applied"
        );
        FinalEdgeTable::from_edges(edges)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::PairKey;
    use crate::error::IntegrityViolation;

    fn row(cause: &str, outcome: &str, cells: [u64; 4]) -> ContingencyRow {
        let key = PairKey::from_parts(cause, outcome).expect("pair");
        ContingencyRow::new(key, cells[0], cells[1], cells[2], cells[3])
    }

    fn sample() -> FullContingencyTable {
        FullContingencyTable::from_rows(vec![
            row("A00", "B01", [90, 10, 60, 40]),
            row("A00", "C02", [95, 4, 60, 40]),
            row("B01", "A00", [5, 5, 5, 5]),
        ])
        .expect("table")
    }

    #[test]
    fn drops_rows_with_any_small_cell() {
        let kept = SuppressionFilter::default().filter_rows(&sample()).expect("filter");
        let keys: Vec<_> = kept.iter().map(|r| r.key().to_string()).collect();
        assert_eq!(keys, ["A00->B01", "B01->A00"]);
    }

    #[test]
    fn filtering_twice_changes_nothing() {
        let filter = SuppressionFilter::new(6);
        let once = filter.filter_rows(&sample()).expect("once");
        let twice = filter.filter_rows(&once).expect("twice");
        assert_eq!(once, twice);
    }

    #[test]
    fn apply_attaches_relative_risk() {
        let edges = SuppressionFilter::default().apply(&sample()).expect("apply");
        assert_eq!(edges.len(), 2);
        assert!((edges.edges()[0].rr - 4.0).abs() < 1e-12);
        assert!((edges.edges()[1].rr - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_threshold_surfaces_non_finite_weight() {
        let table = FullContingencyTable::from_rows(vec![row("A00", "B01", [5, 0, 3, 0])])
            .expect("table");
        let err = SuppressionFilter::new(0).apply(&table).expect_err("nan rr");
        assert!(matches!(
            err,
            ComorbError::DataIntegrity(IntegrityViolation::NonFiniteWeight { .. })
        ));
    }
}

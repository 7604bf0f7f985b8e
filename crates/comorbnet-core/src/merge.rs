//! Follow-up extension of an unsuppressed contingency table.
//!
//! A delta table counts only the outcome events observed in the added
//! follow-up window. Each newly observed control moves from `ct00` to `ct01`
//! and each newly observed case from `ct10` to `ct11`:
//!
//! ```text
//! ct00' = ct00 - Δct01    ct01' = ct01 + Δct01
//! ct10' = ct10 - Δct11    ct11' = ct11 + Δct11
//! ```
//!
//! Control and case totals are therefore unchanged. The delta's `ct00` and
//! `ct10` are not read.

use tracing::{info, instrument};

use crate::contingency::ContingencyRow;
use crate::error::{Cell, ComorbError, IntegrityViolation};
use crate::table::FullContingencyTable;

/// Apply one delta row to its previous row.
///
/// # Errors
///
/// Returns [`IntegrityViolation::NegativeCount`] if the delta moves more
/// persons than a source cell holds, or [`IntegrityViolation::CountOverflow`].
pub fn apply_delta(
    previous: &ContingencyRow,
    delta: &ContingencyRow,
) -> Result<ContingencyRow, IntegrityViolation> {
    let key = previous.key();
    let take = |cell: Cell, moved: u64| {
        let available = previous.cell(cell);
        available
            .checked_sub(moved)
            .ok_or(IntegrityViolation::NegativeCount {
                key,
                cell,
                available,
                moved,
            })
    };
    let give = |cell: Cell, moved: u64| {
        previous
            .cell(cell)
            .checked_add(moved)
            .ok_or(IntegrityViolation::CountOverflow { key, cell, moved })
    };

    Ok(ContingencyRow::new(
        key,
        take(Cell::Ct00, delta.ct01)?,
        give(Cell::Ct01, delta.ct01)?,
        take(Cell::Ct10, delta.ct11)?,
        give(Cell::Ct11, delta.ct11)?,
    ))
}

/// Merge a delta table into the previous table.
///
/// Rows are paired by position and must carry the same `(cause, outcome)`
/// key at every position.
///
/// # Errors
///
/// [`ComorbError::TableMismatch`] if the tables differ in length or in the key
/// at some position; [`ComorbError::DataIntegrity`] if a cell would go
/// negative or overflow. Nothing is clamped.
#[instrument(skip(previous, delta), fields(rows = previous.len()))]
pub fn merge_follow_up(
    previous: &FullContingencyTable,
    delta: &FullContingencyTable,
) -> Result<FullContingencyTable, ComorbError> {
    if previous.len() != delta.len() {
        return Err(ComorbError::TableMismatch {
            row: previous.len().min(delta.len()),
            expected: format!("{} rows", previous.len()),
            found: format!("{} rows", delta.len()),
        });
    }

    let mut merged = Vec::with_capacity(previous.len());
    let mut moved_controls = 0_u64;
    let mut moved_cases = 0_u64;
    for (row, (old, change)) in previous.iter().zip(delta.iter()).enumerate() {
        if old.key() != change.key() {
            return Err(ComorbError::TableMismatch {
                row,
                expected: old.key().to_string(),
                found: change.key().to_string(),
            });
        }
        merged.push(apply_delta(old, change)?);
        moved_controls = moved_controls.saturating_add(change.ct01);
        moved_cases = moved_cases.saturating_add(change.ct11);
    }

    info!(moved_controls, moved_cases, "follow-up merged");
    FullContingencyTable::from_rows(merged)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::PairKey;

    fn row(cause: &str, outcome: &str, cells: [u64; 4]) -> ContingencyRow {
        let key = PairKey::from_parts(cause, outcome).expect("pair");
        ContingencyRow::new(key, cells[0], cells[1], cells[2], cells[3])
    }

    fn table(rows: Vec<ContingencyRow>) -> FullContingencyTable {
        FullContingencyTable::from_rows(rows).expect("table")
    }

    #[test]
    fn moves_newly_observed_persons() {
        let previous = table(vec![row("A00", "B01", [5, 0, 3, 0])]);
        let delta = table(vec![row("A00", "B01", [0, 2, 0, 1])]);

        let merged = merge_follow_up(&previous, &delta).expect("merge");
        assert_eq!(merged.rows()[0], row("A00", "B01", [3, 2, 2, 1]));
    }

    #[test]
    fn delta_larger_than_cell_is_an_integrity_violation() {
        let previous = table(vec![row("A00", "B01", [5, 0, 3, 0])]);
        let delta = table(vec![row("A00", "B01", [0, 6, 0, 0])]);

        let err = merge_follow_up(&previous, &delta).expect_err("negative ct00");
        assert!(matches!(
            err,
            ComorbError::DataIntegrity(IntegrityViolation::NegativeCount {
                cell: Cell::Ct00,
                available: 5,
                moved: 6,
                ..
            })
        ));
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let previous = table(vec![row("A00", "B01", [5, 0, 3, 0])]);
        let delta = table(Vec::new());
        let err = merge_follow_up(&previous, &delta).expect_err("length");
        assert!(matches!(err, ComorbError::TableMismatch { row: 0, .. }));
    }

    #[test]
    fn key_mismatch_names_the_position() {
        let previous = table(vec![
            row("A00", "B01", [5, 0, 3, 0]),
            row("A00", "C02", [5, 0, 3, 0]),
        ]);
        let delta = table(vec![
            row("A00", "B01", [0, 0, 0, 0]),
            row("B01", "C02", [0, 0, 0, 0]),
        ]);
        let err = merge_follow_up(&previous, &delta).expect_err("key");
        match err {
            ComorbError::TableMismatch {
                row,
                expected,
                found,
            } => {
                assert_eq!(row, 1);
                assert_eq!(expected, "A00->C02");
                assert_eq!(found, "B01->C02");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn overflow_is_not_wrapped() {
        let old = row("A00", "B01", [1, u64::MAX, 0, 0]);
        let delta = row("A00", "B01", [0, 1, 0, 0]);
        assert!(matches!(
            apply_delta(&old, &delta),
            Err(IntegrityViolation::CountOverflow { cell: Cell::Ct01, .. })
        ));
    }
}

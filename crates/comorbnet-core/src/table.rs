//! Contingency tables and their on-disk forms.
//!
//! # Overview
//!
//! - [`FullContingencyTable`]: every counted pair, before suppression.
//! - [`FinalEdgeTable`]: pairs that passed suppression, each with a relative
//!   risk from which the network weight is taken.
//!
//! Both are immutable once constructed; construction validates that keys are
//! unique and that no row links a disease to itself.
//!
//! # CSV layout
//!
//! ```text
//! cause_code,outcome_code,ct00,ct01,ct10,ct11
//! A00,B01,90,10,60,40
//! ```
//!
//! `cause_abb` / `outcome_abb` are accepted as header aliases. Final edge
//! tables are written with an extra `weight` column; on read, an `rr` column
//! (if present) overrides the relative risk derived from the counts.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::code::{DiseaseCode, PairKey};
use crate::contingency::{ContingencyRow, EdgePersonSet};
use crate::error::{ComorbError, IntegrityViolation};

// ---------------------------------------------------------------------------
// FullContingencyTable
// ---------------------------------------------------------------------------

/// Ordered, unsuppressed contingency rows with unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FullContingencyTable {
    rows: Vec<ContingencyRow>,
    index: HashMap<PairKey, usize>,
}

impl FullContingencyTable {
    /// Build a table, preserving row order.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrityViolation::DuplicatePair`] or
    /// [`IntegrityViolation::SelfPair`].
    pub fn from_rows(rows: Vec<ContingencyRow>) -> Result<Self, ComorbError> {
        let index = index_keys(rows.iter().map(ContingencyRow::key))?;
        Ok(Self { rows, index })
    }

    #[must_use]
    pub fn rows(&self) -> &[ContingencyRow] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContingencyRow> {
        self.rows.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: PairKey) -> Option<&ContingencyRow> {
        self.index.get(&key).map(|&i| &self.rows[i])
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<ContingencyRow> {
        self.rows
    }

    /// Read a table from CSV.
    ///
    /// # Errors
    ///
    /// Returns [`ComorbError::Malformed`] for missing columns or bad codes,
    /// and the validation errors of [`FullContingencyTable::from_rows`].
    pub fn read_csv<R: Read>(reader: R, source_name: &str) -> Result<Self, ComorbError> {
        let rows = read_table_rows(reader, source_name)?
            .into_iter()
            .map(|(row, _)| row)
            .collect();
        Self::from_rows(rows)
    }

    /// Write the table as CSV.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ComorbError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        if self.rows.is_empty() {
            csv_writer.write_record(FULL_HEADER)?;
        }
        for row in &self.rows {
            csv_writer.serialize(CsvRow::from(row))?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

fn index_keys(keys: impl Iterator<Item = PairKey>) -> Result<HashMap<PairKey, usize>, ComorbError> {
    let mut index = HashMap::new();
    for (i, key) in keys.enumerate() {
        if key.is_self_pair() {
            return Err(IntegrityViolation::SelfPair(key).into());
        }
        if index.insert(key, i).is_some() {
            return Err(IntegrityViolation::DuplicatePair(key).into());
        }
    }
    Ok(index)
}

// ---------------------------------------------------------------------------
// WeightField
// ---------------------------------------------------------------------------

/// Which derived quantity becomes the network edge weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightField {
    /// Relative risk.
    Rr,
    /// Natural log of the relative risk.
    #[default]
    LogRr,
}

impl WeightField {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rr => "rr",
            Self::LogRr => "log_rr",
        }
    }
}

impl fmt::Display for WeightField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeightField {
    type Err = ComorbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rr" | "rr_values" => Ok(Self::Rr),
            "log_rr" | "log_rr_values" => Ok(Self::LogRr),
            other => Err(ComorbError::malformed(
                "weight field",
                format!("expected rr or log_rr, got {other:?}"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// FinalEdgeTable
// ---------------------------------------------------------------------------

/// A pair that passed suppression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinalEdge {
    pub row: ContingencyRow,
    pub rr: f64,
}

impl FinalEdge {
    /// Edge from a row, deriving the relative risk from its counts.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrityViolation::NonFiniteWeight`] if the relative risk is
    /// infinite or NaN.
    pub fn from_row(row: ContingencyRow) -> Result<Self, ComorbError> {
        Self::with_rr(row, row.relative_risk())
    }

    /// Edge with an externally supplied relative risk.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrityViolation::NonFiniteWeight`] if `rr` is infinite or
    /// NaN.
    pub fn with_rr(row: ContingencyRow, rr: f64) -> Result<Self, ComorbError> {
        if !rr.is_finite() {
            return Err(IntegrityViolation::NonFiniteWeight { key: row.key() }.into());
        }
        Ok(Self { row, rr })
    }

    #[must_use]
    pub const fn key(&self) -> PairKey {
        self.row.key()
    }

    /// The selected weight. `log_rr` of a non-positive relative risk is not
    /// finite; graph construction rejects it.
    #[must_use]
    pub fn weight(&self, field: WeightField) -> f64 {
        match field {
            WeightField::Rr => self.rr,
            WeightField::LogRr => self.rr.ln(),
        }
    }
}

/// Ordered suppressed edge rows with unique keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinalEdgeTable {
    edges: Vec<FinalEdge>,
}

impl FinalEdgeTable {
    /// Build a table, preserving order.
    ///
    /// # Errors
    ///
    /// Same validation as [`FullContingencyTable::from_rows`].
    pub fn from_edges(edges: Vec<FinalEdge>) -> Result<Self, ComorbError> {
        index_keys(edges.iter().map(FinalEdge::key))?;
        Ok(Self { edges })
    }

    #[must_use]
    pub fn edges(&self) -> &[FinalEdge] {
        &self.edges
    }

    pub fn iter(&self) -> impl Iterator<Item = &FinalEdge> {
        self.edges.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Distinct codes in first-appearance order (cause before outcome).
    #[must_use]
    pub fn codes(&self) -> Vec<DiseaseCode> {
        let mut seen = std::collections::HashSet::new();
        self.edges
            .iter()
            .flat_map(|e| [e.row.cause, e.row.outcome])
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// Read a final table from CSV.
    ///
    /// # Errors
    ///
    /// Malformed input, duplicate or self pairs, or a non-finite relative
    /// risk.
    pub fn read_csv<R: Read>(reader: R, source_name: &str) -> Result<Self, ComorbError> {
        let edges = read_table_rows(reader, source_name)?
            .into_iter()
            .map(|(row, rr)| match rr {
                Some(rr) => FinalEdge::with_rr(row, rr),
                None => FinalEdge::from_row(row),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_edges(edges)
    }

    /// Write the table as CSV with the selected weight in a `weight` column.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    pub fn write_csv<W: Write>(&self, writer: W, field: WeightField) -> Result<(), ComorbError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        if self.edges.is_empty() {
            csv_writer.write_record(FULL_HEADER.iter().chain(&["weight"]))?;
        }
        for edge in &self.edges {
            csv_writer.serialize(FinalCsvRow::new(edge, field))?;
        }
        csv_writer.flush()?;
        debug!(edges = self.edges.len(), %field, "final edge table written");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CSV records
// ---------------------------------------------------------------------------

// Serialized rows carry their own header; empty tables write this one.
const FULL_HEADER: [&str; 6] = ["cause_code", "outcome_code", "ct00", "ct01", "ct10", "ct11"];

#[derive(Debug, Serialize)]
struct CsvRow {
    cause_code: String,
    outcome_code: String,
    ct00: u64,
    ct01: u64,
    ct10: u64,
    ct11: u64,
}

impl From<&ContingencyRow> for CsvRow {
    fn from(row: &ContingencyRow) -> Self {
        Self {
            cause_code: row.cause.to_string(),
            outcome_code: row.outcome.to_string(),
            ct00: row.ct00,
            ct01: row.ct01,
            ct10: row.ct10,
            ct11: row.ct11,
        }
    }
}

#[derive(Debug, Serialize)]
struct FinalCsvRow {
    cause_code: String,
    outcome_code: String,
    ct00: u64,
    ct01: u64,
    ct10: u64,
    ct11: u64,
    weight: f64,
}

impl FinalCsvRow {
    fn new(edge: &FinalEdge, field: WeightField) -> Self {
        let counts = CsvRow::from(&edge.row);
        Self {
            cause_code: counts.cause_code,
            outcome_code: counts.outcome_code,
            ct00: counts.ct00,
            ct01: counts.ct01,
            ct10: counts.ct10,
            ct11: counts.ct11,
            weight: edge.weight(field),
        }
    }
}

#[derive(Debug, Deserialize)]
struct InputRow {
    #[serde(alias = "cause_abb")]
    cause_code: String,
    #[serde(alias = "outcome_abb")]
    outcome_code: String,
    ct00: u64,
    ct01: u64,
    ct10: u64,
    ct11: u64,
    #[serde(default)]
    rr: Option<f64>,
}

const REQUIRED_COLUMNS: [(&str, Option<&str>); 6] = [
    ("cause_code", Some("cause_abb")),
    ("outcome_code", Some("outcome_abb")),
    ("ct00", None),
    ("ct01", None),
    ("ct10", None),
    ("ct11", None),
];

fn read_table_rows<R: Read>(
    reader: R,
    source_name: &str,
) -> Result<Vec<(ContingencyRow, Option<f64>)>, ComorbError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    for (name, alias) in REQUIRED_COLUMNS {
        let present = headers
            .iter()
            .any(|h| h == name || alias.is_some_and(|a| h == a));
        if !present {
            return Err(ComorbError::malformed(
                source_name,
                format!("missing column {name}"),
            ));
        }
    }

    let mut rows = Vec::new();
    for (line, record) in csv_reader.deserialize::<InputRow>().enumerate() {
        let record = record?;
        let key = PairKey::from_parts(&record.cause_code, &record.outcome_code).map_err(|_| {
            ComorbError::malformed(
                source_name,
                format!(
                    "record {}: invalid pair {:?} -> {:?}",
                    line + 1,
                    record.cause_code,
                    record.outcome_code
                ),
            )
        })?;
        rows.push((
            ContingencyRow::new(key, record.ct00, record.ct01, record.ct10, record.ct11),
            record.rr,
        ));
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Edge person sets
// ---------------------------------------------------------------------------

/// Write edge person sets as a JSON object keyed by `"CAUSE->OUTCOME"`.
///
/// # Errors
///
/// Returns an error if serialization or the writer fails.
pub fn write_edge_persons_json<W: Write>(
    writer: W,
    sets: &[EdgePersonSet],
) -> Result<(), ComorbError> {
    let map: BTreeMap<PairKey, &[i64]> = sets
        .iter()
        .map(|set| (set.key, set.persons.as_slice()))
        .collect();
    serde_json::to_writer_pretty(writer, &map)?;
    Ok(())
}

/// Read edge person sets written by [`write_edge_persons_json`]. Keys are
/// validated as pair keys.
///
/// # Errors
///
/// Returns [`ComorbError::Json`] for malformed JSON or invalid keys.
pub fn read_edge_persons_json<R: Read>(reader: R) -> Result<Vec<EdgePersonSet>, ComorbError> {
    let map: BTreeMap<PairKey, Vec<i64>> = serde_json::from_reader(reader)?;
    Ok(map
        .into_iter()
        .map(|(key, persons)| EdgePersonSet { key, persons })
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cause: &str, outcome: &str, cells: [u64; 4]) -> ContingencyRow {
        let key = PairKey::from_parts(cause, outcome).expect("pair");
        ContingencyRow::new(key, cells[0], cells[1], cells[2], cells[3])
    }

    #[test]
    fn rejects_duplicate_and_self_pairs() {
        let dup = FullContingencyTable::from_rows(vec![
            row("A00", "B01", [1, 1, 1, 1]),
            row("A00", "B01", [2, 2, 2, 2]),
        ])
        .expect_err("duplicate");
        assert!(matches!(
            dup,
            ComorbError::DataIntegrity(IntegrityViolation::DuplicatePair(_))
        ));

        let selfish = FullContingencyTable::from_rows(vec![row("A00", "A00", [1, 1, 1, 1])])
            .expect_err("self pair");
        assert!(matches!(
            selfish,
            ComorbError::DataIntegrity(IntegrityViolation::SelfPair(_))
        ));
    }

    #[test]
    fn reads_aliased_headers_and_ignores_extra_columns() {
        let data = "cause_abb,outcome_abb,ct00,ct01,ct10,ct11,note\nA00,B01,5,6,7,8,x\n";
        let table = FullContingencyTable::read_csv(data.as_bytes(), "inline").expect("table");
        let key = PairKey::from_parts("A00", "B01").expect("pair");
        assert_eq!(table.get(key), Some(&row("A00", "B01", [5, 6, 7, 8])));
    }

    #[test]
    fn missing_count_column_is_reported() {
        let data = "cause_code,outcome_code,ct00,ct01,ct10\nA00,B01,5,6,7\n";
        let err = FullContingencyTable::read_csv(data.as_bytes(), "inline").expect_err("missing");
        assert!(err.to_string().contains("ct11"));
    }

    #[test]
    fn invalid_code_in_csv_is_malformed() {
        let data = "cause_code,outcome_code,ct00,ct01,ct10,ct11\na00,B01,5,6,7,8\n";
        let err = FullContingencyTable::read_csv(data.as_bytes(), "inline").expect_err("bad code");
        assert!(matches!(err, ComorbError::Malformed { .. }));
    }

    #[test]
    fn full_table_csv_preserves_order() {
        let table = FullContingencyTable::from_rows(vec![
            row("C02", "A00", [9, 8, 7, 6]),
            row("A00", "C02", [5, 6, 7, 8]),
        ])
        .expect("table");
        let mut buf = Vec::new();
        table.write_csv(&mut buf).expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.starts_with("cause_code,outcome_code,ct00,ct01,ct10,ct11\nC02,A00,9,8,7,6\n"));

        let back = FullContingencyTable::read_csv(text.as_bytes(), "buf").expect("read");
        assert_eq!(back, table);
    }

    #[test]
    fn final_table_writes_selected_weight() {
        let edge = FinalEdge::from_row(row("A00", "B01", [90, 10, 60, 40])).expect("edge");
        let table = FinalEdgeTable::from_edges(vec![edge]).expect("table");

        let mut buf = Vec::new();
        table.write_csv(&mut buf, WeightField::Rr).expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        assert_eq!(
            text,
            "cause_code,outcome_code,ct00,ct01,ct10,ct11,weight\nA00,B01,90,10,60,40,4.0\n"
        );
    }

    #[test]
    fn rr_column_overrides_derived_value() {
        let data = "cause_code,outcome_code,ct00,ct01,ct10,ct11,rr\nA00,B01,90,10,60,40,2.5\n";
        let table = FinalEdgeTable::read_csv(data.as_bytes(), "inline").expect("table");
        assert!((table.edges()[0].rr - 2.5).abs() < f64::EPSILON);
        assert!((table.edges()[0].weight(WeightField::LogRr) - 2.5_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn non_finite_rr_is_rejected() {
        let err = FinalEdge::from_row(row("A00", "B01", [5, 0, 3, 0])).expect_err("inf");
        assert!(matches!(
            err,
            ComorbError::DataIntegrity(IntegrityViolation::NonFiniteWeight { .. })
        ));
    }

    #[test]
    fn codes_follow_first_appearance() {
        let edges = vec![
            FinalEdge::from_row(row("B01", "A00", [5, 5, 5, 5])).expect("edge"),
            FinalEdge::from_row(row("A00", "C02", [5, 5, 5, 5])).expect("edge"),
        ];
        let table = FinalEdgeTable::from_edges(edges).expect("table");
        let codes: Vec<_> = table.codes().iter().map(ToString::to_string).collect();
        assert_eq!(codes, ["B01", "A00", "C02"]);
    }

    #[test]
    fn edge_person_json_is_keyed_by_pair() {
        let key = PairKey::from_parts("A00", "B01").expect("pair");
        let sets = vec![EdgePersonSet {
            key,
            persons: vec![3, 9],
        }];
        let mut buf = Vec::new();
        write_edge_persons_json(&mut buf, &sets).expect("write");
        let value: serde_json::Value = serde_json::from_slice(&buf).expect("json");
        assert_eq!(value["A00->B01"], serde_json::json!([3, 9]));

        assert_eq!(read_edge_persons_json(buf.as_slice()).expect("read"), sets);
        assert!(read_edge_persons_json(r#"{"a00->B01":[1]}"#.as_bytes()).is_err());
    }

    #[test]
    fn empty_tables_still_carry_a_header() {
        let mut buf = Vec::new();
        FinalEdgeTable::default()
            .write_csv(&mut buf, WeightField::LogRr)
            .expect("write");
        let back = FinalEdgeTable::read_csv(buf.as_slice(), "buf").expect("read back");
        assert!(back.is_empty());

        let mut buf = Vec::new();
        FullContingencyTable::default().write_csv(&mut buf).expect("write");
        assert_eq!(buf, b"cause_code,outcome_code,ct00,ct01,ct10,ct11\n");
    }

    #[test]
    fn weight_field_parses_column_names() {
        assert_eq!("log_rr_values".parse::<WeightField>().expect("parse"), WeightField::LogRr);
        assert_eq!("RR".parse::<WeightField>().expect("parse"), WeightField::Rr);
        assert!("hr".parse::<WeightField>().is_err());
    }
}

//! Cohort providers.
//!
//! # Overview
//!
//! A [`CohortProvider`] hands out the matched cohort of a disease on demand.
//! Two implementations ship with the crate:
//!
//! - [`InMemoryProvider`]: cohorts assembled by the caller, used by tests and
//!   by embedding applications that already hold the data.
//! - [`CsvDirProvider`]: one `matched_<code>.csv` file per disease in a
//!   directory, lower-case code in the file name.
//!
//! ## Cohort file format
//!
//! ```text
//! person_id,case
//! 1001,1
//! 1002,0
//! ```
//!
//! Header matching is case-insensitive, `PERSON_ID` is accepted, and a `cause`
//! column is accepted in place of `case`. Extra columns are ignored.
//!
//! ## Missing vs unreadable
//!
//! A disease without a cohort file yields [`ComorbError::MissingCohort`]. Any
//! other failure to open or decode the file is an I/O or CSV error.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::code::DiseaseCode;
use crate::cohort::{Cohort, OutcomeIndex, OutcomePersonSet, PersonCohortRecord};
use crate::error::ComorbError;

/// Supplies cohorts and outcome person sets per disease.
///
/// Implementations must be shareable across worker threads; each cause unit
/// calls [`CohortProvider::cohort`] for its own disease only.
pub trait CohortProvider: Sync {
    /// The matched cohort for `code`.
    ///
    /// # Errors
    ///
    /// [`ComorbError::MissingCohort`] when no cohort exists for the disease;
    /// any other variant for read or decode failures.
    fn cohort(&self, code: DiseaseCode) -> Result<Cohort, ComorbError>;

    /// Persons known to have experienced `code` as an outcome.
    ///
    /// # Errors
    ///
    /// Same conditions as [`CohortProvider::cohort`].
    fn outcome_persons(&self, code: DiseaseCode) -> Result<OutcomePersonSet, ComorbError> {
        self.cohort(code).map(|cohort| cohort.outcome_persons())
    }
}

/// Load the outcome set of every disease in `codes` into one index.
///
/// A missing outcome cohort is fatal for the whole run.
///
/// # Errors
///
/// Propagates the first provider error.
#[instrument(skip(provider, codes), fields(diseases = codes.len()))]
pub fn load_outcome_index<P: CohortProvider + ?Sized>(
    provider: &P,
    codes: &[DiseaseCode],
) -> Result<OutcomeIndex, ComorbError> {
    codes
        .iter()
        .map(|&code| provider.outcome_persons(code))
        .collect()
}

// ---------------------------------------------------------------------------
// InMemoryProvider
// ---------------------------------------------------------------------------

/// Cohorts held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    cohorts: HashMap<DiseaseCode, Cohort>,
}

impl InMemoryProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cohort, replacing any previous one for the same disease.
    #[must_use]
    pub fn with_cohort(mut self, cohort: Cohort) -> Self {
        self.cohorts.insert(cohort.code(), cohort);
        self
    }

    /// Disease codes with a registered cohort, sorted.
    #[must_use]
    pub fn codes(&self) -> Vec<DiseaseCode> {
        let mut codes: Vec<_> = self.cohorts.keys().copied().collect();
        codes.sort_unstable();
        codes
    }
}

impl CohortProvider for InMemoryProvider {
    fn cohort(&self, code: DiseaseCode) -> Result<Cohort, ComorbError> {
        self.cohorts
            .get(&code)
            .cloned()
            .ok_or(ComorbError::MissingCohort { code })
    }
}

// ---------------------------------------------------------------------------
// CsvDirProvider
// ---------------------------------------------------------------------------

const FILE_PREFIX: &str = "matched_";
const FILE_SUFFIX: &str = ".csv";

/// Cohorts stored as `matched_<code>.csv` files in one directory.
#[derive(Debug, Clone)]
pub struct CsvDirProvider {
    dir: PathBuf,
}

impl CsvDirProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the cohort file for `code`.
    #[must_use]
    pub fn cohort_path(&self, code: DiseaseCode) -> PathBuf {
        self.dir
            .join(format!("{FILE_PREFIX}{}{FILE_SUFFIX}", code.to_lowercase()))
    }

    /// Disease codes that have a cohort file, sorted.
    ///
    /// File names that do not carry a valid code are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn discover_codes(&self) -> Result<Vec<DiseaseCode>, ComorbError> {
        let mut codes = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(stem) = name
                .strip_prefix(FILE_PREFIX)
                .and_then(|rest| rest.strip_suffix(FILE_SUFFIX))
            else {
                continue;
            };
            if let Ok(code) = DiseaseCode::parse(&stem.to_ascii_uppercase()) {
                codes.push(code);
            }
        }
        codes.sort_unstable();
        codes.dedup();
        debug!(dir = %self.dir.display(), found = codes.len(), "discovered cohort files");
        Ok(codes)
    }
}

impl CohortProvider for CsvDirProvider {
    fn cohort(&self, code: DiseaseCode) -> Result<Cohort, ComorbError> {
        let path = self.cohort_path(code);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ComorbError::MissingCohort { code });
            }
            Err(err) => return Err(err.into()),
        };
        read_cohort_csv(code, BufReader::new(file), &path.display().to_string())
    }
}

/// Decode a cohort from CSV.
///
/// # Errors
///
/// Returns [`ComorbError::Malformed`] if the required columns are missing or
/// a value cannot be parsed, and the cohort assembly errors of
/// [`Cohort::new`].
pub fn read_cohort_csv<R: Read>(
    code: DiseaseCode,
    reader: R,
    source_name: &str,
) -> Result<Cohort, ComorbError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let column = |names: &[&str]| {
        headers.iter().position(|h| {
            let h = h.trim_start_matches('\u{feff}');
            names.iter().any(|n| h.eq_ignore_ascii_case(n))
        })
    };
    let person_col = column(&["person_id"])
        .ok_or_else(|| ComorbError::malformed(source_name, "missing person_id column"))?;
    let case_col = column(&["case", "cause"])
        .ok_or_else(|| ComorbError::malformed(source_name, "missing case column"))?;

    let mut records = Vec::new();
    for (line, row) in csv_reader.records().enumerate() {
        let row = row?;
        let person_id = parse_int(row.get(person_col), source_name, line, "person_id")?;
        let flag = parse_int(row.get(case_col), source_name, line, "case")?;
        records.push(PersonCohortRecord::from_flag(person_id, flag, source_name)?);
    }

    Cohort::new(code, records)
}

/// Parse an integer cell; SAS exports write integral values as `1.0`.
fn parse_int(
    raw: Option<&str>,
    source_name: &str,
    line: usize,
    column: &str,
) -> Result<i64, ComorbError> {
    let raw = raw.unwrap_or_default();
    if let Ok(value) = raw.parse::<i64>() {
        return Ok(value);
    }
    raw.strip_suffix(".0")
        .and_then(|whole| whole.parse::<i64>().ok())
        .ok_or_else(|| {
            ComorbError::malformed(
                source_name,
                format!("record {}: {column} is not an integer: {raw:?}", line + 1),
            )
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

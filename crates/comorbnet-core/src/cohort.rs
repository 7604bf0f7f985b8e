//! Matched case-control cohorts and outcome person sets.
//!
//! A [`Cohort`] is the matched population for one disease: every member is
//! either a case (`case_flag = 1`) or a matched control (`case_flag = 0`).
//! The cases of a disease's own cohort double as that disease's
//! [`OutcomePersonSet`] when it is tested as an outcome of another disease.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::code::DiseaseCode;
use crate::error::{ComorbError, IntegrityViolation};

/// One member of a disease-specific matched cohort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PersonCohortRecord {
    pub person_id: i64,
    pub is_case: bool,
}

impl PersonCohortRecord {
    #[must_use]
    pub const fn case(person_id: i64) -> Self {
        Self {
            person_id,
            is_case: true,
        }
    }

    #[must_use]
    pub const fn control(person_id: i64) -> Self {
        Self {
            person_id,
            is_case: false,
        }
    }

    /// Interpret a raw `0|1` case flag.
    ///
    /// # Errors
    ///
    /// Returns [`ComorbError::Malformed`] for any other value.
    pub fn from_flag(person_id: i64, flag: i64, source_name: &str) -> Result<Self, ComorbError> {
        match flag {
            0 => Ok(Self::control(person_id)),
            1 => Ok(Self::case(person_id)),
            other => Err(ComorbError::malformed(
                source_name,
                format!("case flag for person {person_id} must be 0 or 1, got {other}"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Cohort
// ---------------------------------------------------------------------------

/// The matched cohort of a single disease.
#[derive(Debug, Clone)]
pub struct Cohort {
    code: DiseaseCode,
    records: Vec<PersonCohortRecord>,
    case_count: u64,
}

impl Cohort {
    /// Assemble a cohort, rejecting repeated person IDs.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrityViolation::DuplicatePerson`] if a person ID occurs
    /// twice.
    pub fn new(code: DiseaseCode, records: Vec<PersonCohortRecord>) -> Result<Self, ComorbError> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(record.person_id) {
                return Err(IntegrityViolation::DuplicatePerson {
                    code,
                    person_id: record.person_id,
                }
                .into());
            }
        }

        let case_count = records.iter().filter(|r| r.is_case).count() as u64;
        debug!(%code, members = records.len(), cases = case_count, "cohort assembled");

        Ok(Self {
            code,
            records,
            case_count,
        })
    }

    #[must_use]
    pub const fn code(&self) -> DiseaseCode {
        self.code
    }

    #[must_use]
    pub fn records(&self) -> &[PersonCohortRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.records.len() as u64
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub const fn case_count(&self) -> u64 {
        self.case_count
    }

    #[must_use]
    pub fn control_count(&self) -> u64 {
        self.len() - self.case_count
    }

    /// The cases of this cohort, viewed as an outcome person set.
    #[must_use]
    pub fn outcome_persons(&self) -> OutcomePersonSet {
        OutcomePersonSet::new(
            self.code,
            self.records
                .iter()
                .filter(|r| r.is_case)
                .map(|r| r.person_id),
        )
    }
}

// ---------------------------------------------------------------------------
// OutcomePersonSet
// ---------------------------------------------------------------------------

/// Person IDs known to have experienced an outcome disease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomePersonSet {
    code: DiseaseCode,
    persons: HashSet<i64>,
}

impl OutcomePersonSet {
    pub fn new(code: DiseaseCode, persons: impl IntoIterator<Item = i64>) -> Self {
        Self {
            code,
            persons: persons.into_iter().collect(),
        }
    }

    #[must_use]
    pub const fn code(&self) -> DiseaseCode {
        self.code
    }

    #[must_use]
    pub fn contains(&self, person_id: i64) -> bool {
        self.persons.contains(&person_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.persons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.persons.iter().copied()
    }
}

/// Read access to outcome person sets, keyed by disease.
pub trait OutcomeSource: Sync {
    /// The outcome set for `code`, or `None` if the source has never heard
    /// of the disease.
    fn outcome_persons(&self, code: DiseaseCode) -> Option<&OutcomePersonSet>;
}

/// Every outcome person set needed by a run, loaded once and shared
/// read-only across all cause units.
#[derive(Debug, Clone, Default)]
pub struct OutcomeIndex {
    sets: HashMap<DiseaseCode, OutcomePersonSet>,
}

impl OutcomeIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the set for its disease.
    pub fn insert(&mut self, set: OutcomePersonSet) {
        self.sets.insert(set.code(), set);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

impl FromIterator<OutcomePersonSet> for OutcomeIndex {
    fn from_iter<T: IntoIterator<Item = OutcomePersonSet>>(iter: T) -> Self {
        let mut index = Self::new();
        for set in iter {
            index.insert(set);
        }
        index
    }
}

impl OutcomeSource for OutcomeIndex {
    fn outcome_persons(&self, code: DiseaseCode) -> Option<&OutcomePersonSet> {
        self.sets.get(&code)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use std::fmt;
use std::io;

use serde::Serialize;

use crate::code::{DiseaseCode, PairKey};

/// Machine-readable error codes for orchestration and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    InvalidDiseaseCode,
    MalformedRecord,
    ConfigParseError,
    MissingCohort,
    CohortReadFailed,
    DataIntegrityViolation,
    TableMismatch,
    DegenerateGraph,
    ClusterBackendFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidDiseaseCode => "E1001",
            Self::MalformedRecord => "E1002",
            Self::ConfigParseError => "E1003",
            Self::MissingCohort => "E2001",
            Self::CohortReadFailed => "E2002",
            Self::DataIntegrityViolation => "E3001",
            Self::TableMismatch => "E3002",
            Self::DegenerateGraph => "E4001",
            Self::ClusterBackendFailed => "E4002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidDiseaseCode => "Invalid disease code",
            Self::MalformedRecord => "Malformed input record",
            Self::ConfigParseError => "Config file parse error",
            Self::MissingCohort => "Cohort data not found",
            Self::CohortReadFailed => "Cohort data could not be read",
            Self::DataIntegrityViolation => "Data integrity violation",
            Self::TableMismatch => "Contingency tables do not line up",
            Self::DegenerateGraph => "Graph too small or disconnected for metric",
            Self::ClusterBackendFailed => "Clustering backend failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint for operators and orchestrators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::InvalidDiseaseCode => Some("Codes are one uppercase letter and two digits, e.g. A00."),
            Self::MalformedRecord => Some("Check column headers and that case flags are 0 or 1."),
            Self::ConfigParseError => Some("Fix syntax in comorbnet.toml and retry."),
            Self::MissingCohort => Some("Export the matched cohort for this disease, then retry the unit."),
            Self::CohortReadFailed => Some("Check file permissions and storage health, then retry."),
            Self::DataIntegrityViolation => {
                Some("Rebuild the affected tables from source cohorts; do not publish these counts.")
            }
            Self::TableMismatch => {
                Some("Regenerate the delta table with the same cause/outcome ordering as the previous table.")
            }
            Self::DegenerateGraph => None,
            Self::ClusterBackendFailed => Some("Retry with a different seed or clustering backend."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Coarse failure category reported per unit of work to an external
/// orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    DataMissing,
    Io,
    IntegrityViolation,
    Configuration,
}

/// Which cell of a contingency row an integrity violation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cell {
    Ct00,
    Ct01,
    Ct10,
    Ct11,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ct00 => "ct00",
            Self::Ct01 => "ct01",
            Self::Ct10 => "ct10",
            Self::Ct11 => "ct11",
        })
    }
}

/// Counts or keys that break a required invariant.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntegrityViolation {
    #[error("{key}: {cell} would become negative ({available} available, delta claims {moved})")]
    NegativeCount {
        key: PairKey,
        cell: Cell,
        available: u64,
        moved: u64,
    },

    #[error("{key}: {cell} overflows when adding {moved}")]
    CountOverflow { key: PairKey, cell: Cell, moved: u64 },

    #[error("duplicate row for pair {0}")]
    DuplicatePair(PairKey),

    #[error("pair {0} links a disease to itself")]
    SelfPair(PairKey),

    #[error("person {person_id} appears more than once in the {code} cohort")]
    DuplicatePerson { code: DiseaseCode, person_id: i64 },

    #[error("{key}: relative risk is not finite")]
    NonFiniteWeight { key: PairKey },
}

// ---------------------------------------------------------------------------
// ComorbError
// ---------------------------------------------------------------------------

/// Errors raised by contingency building, merging and suppression.
#[derive(Debug, thiserror::Error)]
pub enum ComorbError {
    /// No cohort data exists for the disease.
    #[error("no cohort data for disease {code}")]
    MissingCohort { code: DiseaseCode },

    /// Generic I/O failure while reading or writing data.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// CSV decoding or encoding failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A disease code or pair key failed validation.
    #[error("invalid disease code: {0:?}")]
    InvalidCode(String),

    /// An input record could not be interpreted.
    #[error("malformed record in {source_name}: {detail}")]
    Malformed { source_name: String, detail: String },

    /// Counts violate a required invariant.
    #[error("data integrity violation: {0}")]
    DataIntegrity(#[from] IntegrityViolation),

    /// Previous and delta tables do not align row by row.
    #[error("table mismatch at row {row}: expected {expected}, found {found}")]
    TableMismatch {
        row: usize,
        expected: String,
        found: String,
    },

    /// The worker pool could not be created.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl ComorbError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MissingCohort { .. } => ErrorCode::MissingCohort,
            Self::Io(_) => ErrorCode::CohortReadFailed,
            Self::Csv(_) | Self::Json(_) | Self::Malformed { .. } => ErrorCode::MalformedRecord,
            Self::InvalidCode(_) => ErrorCode::InvalidDiseaseCode,
            Self::DataIntegrity(_) => ErrorCode::DataIntegrityViolation,
            Self::TableMismatch { .. } => ErrorCode::TableMismatch,
            Self::ThreadPool(_) => ErrorCode::InternalUnexpected,
        }
    }

    /// Category reported to the orchestrator for a failed unit of work.
    #[must_use]
    pub const fn failure_kind(&self) -> FailureKind {
        match self {
            Self::MissingCohort { .. } => FailureKind::DataMissing,
            Self::Io(_) | Self::Csv(_) | Self::Json(_) => FailureKind::Io,
            Self::InvalidCode(_) | Self::Malformed { .. } | Self::DataIntegrity(_) => {
                FailureKind::IntegrityViolation
            }
            Self::TableMismatch { .. } | Self::ThreadPool(_) => FailureKind::Configuration,
        }
    }

    pub(crate) fn malformed(source_name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Malformed {
            source_name: source_name.into(),
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::InvalidDiseaseCode,
            ErrorCode::MalformedRecord,
            ErrorCode::ConfigParseError,
            ErrorCode::MissingCohort,
            ErrorCode::CohortReadFailed,
            ErrorCode::DataIntegrityViolation,
            ErrorCode::TableMismatch,
            ErrorCode::DegenerateGraph,
            ErrorCode::ClusterBackendFailed,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn missing_cohort_is_distinguishable_from_io() {
        let code = DiseaseCode::parse("A00").expect("code");
        let missing = ComorbError::MissingCohort { code };
        let io = ComorbError::Io(io::Error::other("disk gone"));

        assert_eq!(missing.failure_kind(), FailureKind::DataMissing);
        assert_eq!(io.failure_kind(), FailureKind::Io);
        assert_ne!(missing.code(), io.code());
    }

    #[test]
    fn integrity_violation_message_names_the_cell() {
        let key = PairKey::from_parts("A00", "B01").expect("pair");
        let err = ComorbError::from(IntegrityViolation::NegativeCount {
            key,
            cell: Cell::Ct00,
            available: 5,
            moved: 6,
        });
        assert_eq!(err.code(), ErrorCode::DataIntegrityViolation);
        assert!(err.to_string().contains("A00->B01: ct00"));
    }
}

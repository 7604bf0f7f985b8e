use std::io;

use comorbnet_core::{ComorbError, ErrorCode, IntegrityViolation};

/// Errors raised while building or analyzing a comorbidity network.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Edge input breaks a graph invariant (duplicate pair, self loop,
    /// non-finite weight).
    #[error("data integrity violation: {0}")]
    Integrity(#[from] IntegrityViolation),

    /// The graph is too small or disconnected for a metric.
    #[error("degenerate graph: {reason}")]
    DegenerateGraph { reason: String },

    /// The community detection backend could not produce a partition.
    #[error("clustering backend failed: {0}")]
    Backend(String),

    /// Invalid attribute input, such as a malformed node shape file.
    #[error("malformed {source_name}: {detail}")]
    Malformed { source_name: String, detail: String },

    #[error(transparent)]
    Core(#[from] ComorbError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl NetworkError {
    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateGraph {
            reason: reason.into(),
        }
    }

    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Integrity(_) => ErrorCode::DataIntegrityViolation,
            Self::DegenerateGraph { .. } => ErrorCode::DegenerateGraph,
            Self::Backend(_) => ErrorCode::ClusterBackendFailed,
            Self::Malformed { .. } | Self::Csv(_) => ErrorCode::MalformedRecord,
            Self::Core(inner) => inner.code(),
            Self::Io(_) => ErrorCode::CohortReadFailed,
        }
    }
}

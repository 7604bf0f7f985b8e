#![forbid(unsafe_code)]
//! comorbnet-core library.
//!
//! Pairwise contingency counts from matched case-control cohorts, follow-up
//! merging and minimum-cell suppression.
//!
//! # Conventions
//!
//! - **Errors**: Library functions return [`error::ComorbError`]; configuration
//!   loading returns `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod code;
pub mod cohort;
pub mod config;
pub mod contingency;
pub mod error;
pub mod merge;
pub mod provider;
pub mod runner;
pub mod suppress;
pub mod table;

pub use code::{DiseaseCode, PairKey};
pub use cohort::{Cohort, OutcomeIndex, OutcomePersonSet, OutcomeSource, PersonCohortRecord};
pub use contingency::{CauseContingency, ContingencyRow, EdgePersonSet};
pub use error::{ComorbError, ErrorCode, FailureKind, IntegrityViolation};
pub use suppress::SuppressionFilter;
pub use table::{FinalEdge, FinalEdgeTable, FullContingencyTable, WeightField};

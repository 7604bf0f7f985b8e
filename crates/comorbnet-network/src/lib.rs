#![forbid(unsafe_code)]
//! comorbnet-network library.
//!
//! Directed comorbidity graphs built from suppressed edge tables, with
//! structural statistics, centralities and flow-based community detection.
//!
//! # Conventions
//!
//! - **Errors**: Library functions return [`error::NetworkError`].
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod analysis;
pub mod community;
pub mod error;
pub mod graph;
pub mod metrics;

pub use analysis::{AnalysisConfig, NetworkAnalysis, analyze};
pub use community::{ClusterAssignment, ClusterBackend, MapEquation, detect_communities};
pub use error::NetworkError;
pub use graph::DiseaseGraph;

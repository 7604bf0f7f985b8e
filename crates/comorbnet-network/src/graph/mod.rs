//! Comorbidity graph module.
//!
//! # Overview
//!
//! This module turns a suppressed [`comorbnet_core::FinalEdgeTable`] into a
//! petgraph-based directed, weighted graph and computes structural statistics
//! on it.
//!
//! ## Pipeline
//!
//! ```text
//! FinalEdgeTable
//!        ↓  build::DiseaseGraph::from_final_edges()
//! DiseaseGraph (DiGraph<DiseaseCode, f64>, possibly cyclic)
//!        ├─ stats::GraphStats::compute()        density, SCCs, largest SCC
//!        └─ distance::DistanceMetrics::compute() on the largest SCC
//! ```
//!
//! ## Typical Usage
//!
//! ```rust,ignore
//! use comorbnet_network::graph::{DiseaseGraph, GraphStats, largest_scc, DistanceMetrics};
//!
//! let g = DiseaseGraph::from_final_edges(&table, WeightField::LogRr)?;
//! let stats = GraphStats::compute(&g);
//! let distances = DistanceMetrics::compute(&g, &largest_scc(&g));
//! ```

pub mod build;
pub mod distance;
pub mod shape;
pub mod stats;

pub use build::DiseaseGraph;
pub use distance::DistanceMetrics;
pub use shape::NodeShape;
pub use stats::{GraphStats, largest_scc, strongly_connected_components};

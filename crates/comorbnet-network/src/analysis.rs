//! Full network analysis in one serializable bundle.
//!
//! ```text
//! DiseaseGraph
//!     ├─ GraphStats                 full graph
//!     ├─ DistanceMetrics            largest SCC only
//!     ├─ DegreeMetrics              full graph
//!     ├─ PageRank ┐ rayon::join     full graph
//!     ├─ Betweenness ┘              full graph
//!     └─ ClusterAssignment          configured scope
//! ```

use comorbnet_core::DiseaseCode;
use comorbnet_core::config::{ClusterScope, ProjectConfig};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use tracing::{info, instrument};

use crate::community::{ClusterAssignment, ClusterBackend, MapEquation, detect_communities};
use crate::error::NetworkError;
use crate::graph::build::DiseaseGraph;
use crate::graph::distance::DistanceMetrics;
use crate::graph::shape::NodeShape;
use crate::graph::stats::{GraphStats, largest_scc};
use crate::metrics::basic::{DegreeMetrics, degree_metrics};
use crate::metrics::betweenness::betweenness_centrality;
use crate::metrics::pagerank::{PageRankConfig, PageRankResult, pagerank};
use crate::metrics::ranking::Ranking;

/// Settings for [`analyze`].
#[derive(Debug, Clone, Default)]
pub struct AnalysisConfig {
    pub pagerank: PageRankConfig,
    pub cluster_scope: ClusterScope,
    pub community: MapEquation,
}

impl From<&ProjectConfig> for AnalysisConfig {
    fn from(config: &ProjectConfig) -> Self {
        let pagerank = PageRankConfig::from(&config.pagerank);
        Self {
            community: MapEquation::from(&config.community).with_damping(pagerank.damping),
            pagerank,
            cluster_scope: config.network.cluster_scope,
        }
    }
}

/// A node of the exported graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GraphNode {
    pub code: DiseaseCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<NodeShape>,
}

/// An edge of the exported graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GraphEdge {
    pub cause: DiseaseCode,
    pub outcome: DiseaseCode,
    pub weight: f64,
}

/// Every metric of a network plus its node and edge lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkAnalysis {
    pub content_hash: String,
    pub stats: GraphStats,
    pub distances: DistanceMetrics,
    pub degree: DegreeMetrics,
    pub pagerank: PageRankResult,
    pub betweenness: Ranking,
    pub clusters: ClusterAssignment,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Analyze `g` with the map-equation backend from `config`.
///
/// # Errors
///
/// Fails only when community detection fails. Degenerate distance metrics
/// are reported as unavailable inside the bundle.
pub fn analyze(g: &DiseaseGraph, config: &AnalysisConfig) -> Result<NetworkAnalysis, NetworkError> {
    analyze_with(g, config, &config.community)
}

/// Analyze `g` with an explicit clustering backend.
///
/// # Errors
///
/// Same as [`analyze`].
#[instrument(skip_all, fields(nodes = g.node_count(), edges = g.edge_count()))]
pub fn analyze_with(
    g: &DiseaseGraph,
    config: &AnalysisConfig,
    backend: &dyn ClusterBackend,
) -> Result<NetworkAnalysis, NetworkError> {
    let stats = GraphStats::compute(g);
    let distances = DistanceMetrics::compute(g, &largest_scc(g));
    let degree = degree_metrics(g);
    let (pagerank, betweenness) = rayon::join(
        || pagerank(g, &config.pagerank),
        || betweenness_centrality(g),
    );
    let clusters = detect_communities(g, config.cluster_scope, backend)?;

    let nodes = g
        .codes()
        .into_iter()
        .map(|code| GraphNode {
            code,
            shape: g.shapes.get(&code).copied(),
        })
        .collect();
    let edges = g
        .graph
        .edge_references()
        .filter_map(|e| {
            Some(GraphEdge {
                cause: g.code(e.source())?,
                outcome: g.code(e.target())?,
                weight: *e.weight(),
            })
        })
        .collect();

    info!(
        density = stats.density,
        sccs = stats.scc_count,
        clusters = clusters.cluster_count,
        "network analyzed"
    );

    Ok(NetworkAnalysis {
        content_hash: g.content_hash.clone(),
        stats,
        distances,
        degree,
        pagerank,
        betweenness,
        clusters,
        nodes,
        edges,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

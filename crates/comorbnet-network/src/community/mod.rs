//! Community detection for comorbidity networks.
//!
//! # Overview
//!
//! Diseases that patients pick up together form flow communities: a random
//! walker following relative-risk weighted edges tends to stay inside them
//! for a long time before moving on. This module partitions the graph into
//! such communities with the map equation and then ranks the clusters by
//! size.
//!
//! # Objective
//!
//! The map equation (Rosvall & Bergstrom 2008) measures the average per-step
//! description length of a random walk under a two-level code:
//!
//! ```text
//! L(M) = q·H(Q) + Σ_m p_m·H(P_m)
//! ```
//!
//! where `q` is the rate at which the walker exits any module, `H(Q)` the
//! entropy of module entries, and `p_m·H(P_m)` the cost of describing moves
//! inside module `m`. A good partition compresses the walk.
//!
//! # Pipeline
//!
//! ```text
//! DiseaseGraph
//!     ↓  scope: largest SCC or whole graph
//! WeightedLink list over local indices
//!     ↓  ClusterBackend::detect()      raw module ids
//!     ↓  renumber_by_size()            0 = largest cluster
//! ClusterAssignment                    outside nodes unassigned
//! ```
//!
//! The backend only has to be deterministic; the numbering and the
//! unassigned policy are fixed here.
//!
//! # Usage
//!
//! ```rust,ignore
//! use comorbnet_network::community::{MapEquation, detect_communities};
//!
//! let backend = MapEquation::from(&config.community);
//! let clusters = detect_communities(&g, ClusterScope::LargestScc, &backend)?;
//! for code in &clusters.unassigned {
//!     println!("{code} outside the largest SCC");
//! }
//! ```
//!
//! # References
//!
//! - Rosvall & Bergstrom (2008). "Maps of random walks on complex networks
//!   reveal community structure". PNAS 105(4).
//! - Rosvall, Axelsson & Bergstrom (2009). "The map equation". Eur. Phys. J.
//!   Special Topics 178.

mod map_equation;

pub use map_equation::MapEquation;

use std::collections::HashMap;

use comorbnet_core::DiseaseCode;
use comorbnet_core::config::ClusterScope;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use serde::Serialize;
use tracing::{info, instrument};

use crate::error::NetworkError;
use crate::graph::build::DiseaseGraph;
use crate::graph::stats::largest_scc;

// ---------------------------------------------------------------------------
// Backend seam
// ---------------------------------------------------------------------------

/// Directed weighted link between local node indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedLink {
    pub from: usize,
    pub to: usize,
    pub weight: f64,
}

/// A partitioning algorithm over a directed weighted edge list.
pub trait ClusterBackend {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Raw module id for each node `0..nodes`. Ids need not be dense or
    /// ordered.
    ///
    /// # Errors
    ///
    /// [`NetworkError::Backend`] when no partition can be produced.
    fn detect(&self, nodes: usize, links: &[WeightedLink]) -> Result<Vec<usize>, NetworkError>;
}

// ---------------------------------------------------------------------------
// Renumbering
// ---------------------------------------------------------------------------

/// Renumber raw module ids so that 0 is the largest cluster.
///
/// Clusters of equal size keep the order in which their raw id first
/// appears. The result is a gap-free `0..k` labelling.
#[must_use]
pub fn renumber_by_size(raw: &[usize]) -> Vec<usize> {
    // (raw id, size) in first-encounter order
    let mut groups: Vec<(usize, usize)> = Vec::new();
    let mut slot: HashMap<usize, usize> = HashMap::new();
    for &id in raw {
        let pos = *slot.entry(id).or_insert_with(|| {
            groups.push((id, 0));
            groups.len() - 1
        });
        groups[pos].1 += 1;
    }

    groups.sort_by(|a, b| b.1.cmp(&a.1));
    let rank: HashMap<usize, usize> = groups
        .iter()
        .enumerate()
        .map(|(new_id, &(raw_id, _))| (raw_id, new_id))
        .collect();

    raw.iter().map(|id| rank[id]).collect()
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

/// Cluster of one node; `None` when the node is outside the clustering scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodeCluster {
    pub code: DiseaseCode,
    pub cluster: Option<usize>,
}

/// Cluster ids for every node of a graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterAssignment {
    pub scope: ClusterScope,
    /// One entry per node, in node insertion order.
    pub nodes: Vec<NodeCluster>,
    pub cluster_count: usize,
    /// Member count per cluster id; non-increasing.
    pub cluster_sizes: Vec<usize>,
    pub assigned_count: usize,
    pub unassigned_count: usize,
    pub unassigned: Vec<DiseaseCode>,
    /// Nodes the backend partitioned.
    pub scope_nodes: Vec<DiseaseCode>,
}

impl ClusterAssignment {
    /// Cluster of `code`, if the node exists and was assigned.
    #[must_use]
    pub fn cluster_of(&self, code: DiseaseCode) -> Option<usize> {
        self.nodes
            .iter()
            .find(|n| n.code == code)
            .and_then(|n| n.cluster)
    }

    /// Codes in cluster `id`, in node order.
    #[must_use]
    pub fn members(&self, id: usize) -> Vec<DiseaseCode> {
        self.nodes
            .iter()
            .filter(|n| n.cluster == Some(id))
            .map(|n| n.code)
            .collect()
    }
}

/// Partition `g` within `scope` and rank the clusters by size.
///
/// With [`ClusterScope::LargestScc`] only the largest strongly connected
/// component is clustered and every other node is unassigned. With
/// [`ClusterScope::WholeGraph`] every node gets a cluster.
///
/// # Errors
///
/// Propagates backend failures, and returns [`NetworkError::Backend`] when the
/// backend answers with the wrong number of ids.
#[instrument(skip(g, backend), fields(nodes = g.node_count(), backend = backend.name()))]
pub fn detect_communities(
    g: &DiseaseGraph,
    scope: ClusterScope,
    backend: &dyn ClusterBackend,
) -> Result<ClusterAssignment, NetworkError> {
    let members: Vec<NodeIndex> = match scope {
        ClusterScope::LargestScc => largest_scc(g),
        ClusterScope::WholeGraph => g.graph.node_indices().collect(),
    };

    let local: HashMap<NodeIndex, usize> = members
        .iter()
        .enumerate()
        .map(|(i, &idx)| (idx, i))
        .collect();
    let links: Vec<WeightedLink> = g
        .graph
        .edge_references()
        .filter_map(|e| {
            Some(WeightedLink {
                from: *local.get(&e.source())?,
                to: *local.get(&e.target())?,
                weight: *e.weight(),
            })
        })
        .collect();

    let raw = match members.len() {
        0 => Vec::new(),
        1 => vec![0],
        n => backend.detect(n, &links)?,
    };
    if raw.len() != members.len() {
        return Err(NetworkError::Backend(format!(
            "{} returned {} module ids for {} nodes",
            backend.name(),
            raw.len(),
            members.len()
        )));
    }
    let ids = renumber_by_size(&raw);

    let mut by_node: Vec<Option<usize>> = vec![None; g.node_count()];
    for (&idx, &id) in members.iter().zip(&ids) {
        by_node[idx.index()] = Some(id);
    }

    let nodes: Vec<NodeCluster> = g
        .graph
        .node_indices()
        .filter_map(|idx| {
            g.code(idx).map(|code| NodeCluster {
                code,
                cluster: by_node[idx.index()],
            })
        })
        .collect();

    let cluster_count = ids.iter().max().map_or(0, |m| m + 1);
    let mut cluster_sizes = vec![0_usize; cluster_count];
    for &id in &ids {
        cluster_sizes[id] += 1;
    }
    let unassigned: Vec<DiseaseCode> = nodes
        .iter()
        .filter(|n| n.cluster.is_none())
        .map(|n| n.code)
        .collect();
    let scope_nodes: Vec<DiseaseCode> = members.iter().filter_map(|&idx| g.code(idx)).collect();

    info!(
        clusters = cluster_count,
        assigned = scope_nodes.len(),
        unassigned = unassigned.len(),
        "communities detected"
    );

    Ok(ClusterAssignment {
        scope,
        cluster_count,
        cluster_sizes,
        assigned_count: scope_nodes.len(),
        unassigned_count: unassigned.len(),
        nodes,
        unassigned,
        scope_nodes,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

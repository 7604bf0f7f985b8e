//! Basic structural statistics for the comorbidity network.
//!
//! # Statistics Provided
//!
//! - **node_count** / **edge_count**.
//! - **density**: `edge_count / (node_count * (node_count - 1))`; zero for
//!   graphs with fewer than two nodes.
//! - **is_strongly_connected**: every node reaches every other node. An empty
//!   graph is not strongly connected.
//! - **sccs**: strongly connected components. Members are listed in node
//!   insertion order and components are ordered by their earliest member.
//! - **largest_scc**: the component with the most members; among equally
//!   large components, the one holding the earliest-inserted node.

use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;
use serde::Serialize;

use comorbnet_core::DiseaseCode;

use crate::graph::build::DiseaseGraph;

// ---------------------------------------------------------------------------
// Strongly connected components
// ---------------------------------------------------------------------------

/// Strongly connected components in deterministic order.
#[must_use]
pub fn strongly_connected_components(g: &DiseaseGraph) -> Vec<Vec<NodeIndex>> {
    let mut sccs = tarjan_scc(&g.graph);
    for scc in &mut sccs {
        scc.sort_unstable();
    }
    sccs.sort_unstable_by_key(|scc| scc.first().copied());
    sccs
}

/// Members of the largest strongly connected component. Empty for an empty
/// graph.
#[must_use]
pub fn largest_scc(g: &DiseaseGraph) -> Vec<NodeIndex> {
    pick_largest(strongly_connected_components(g))
}

fn pick_largest(sccs: Vec<Vec<NodeIndex>>) -> Vec<NodeIndex> {
    let mut best: Option<Vec<NodeIndex>> = None;
    for scc in sccs {
        if best.as_ref().is_none_or(|b| scc.len() > b.len()) {
            best = Some(scc);
        }
    }
    best.unwrap_or_default()
}

// ---------------------------------------------------------------------------
// GraphStats
// ---------------------------------------------------------------------------

/// Summary statistics over the full graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
    pub is_strongly_connected: bool,
    pub scc_count: usize,
    pub largest_scc_size: usize,
    /// Components as code lists, ordered as described in the module docs.
    pub sccs: Vec<Vec<DiseaseCode>>,
    /// Codes of the largest component.
    pub largest_scc: Vec<DiseaseCode>,
}

impl GraphStats {
    #[must_use]
    pub fn compute(g: &DiseaseGraph) -> Self {
        let node_count = g.node_count();
        let edge_count = g.edge_count();
        let components = strongly_connected_components(g);
        let to_codes = |members: &[NodeIndex]| -> Vec<DiseaseCode> {
            members.iter().filter_map(|&idx| g.code(idx)).collect()
        };

        let sccs: Vec<_> = components.iter().map(|c| to_codes(c)).collect();
        let largest = pick_largest(components);

        Self {
            node_count,
            edge_count,
            density: compute_density(node_count, edge_count),
            is_strongly_connected: node_count > 0 && sccs.len() == 1,
            scc_count: sccs.len(),
            largest_scc_size: largest.len(),
            largest_scc: to_codes(&largest),
            sccs,
        }
    }
}

pub(crate) fn compute_density(node_count: usize, edge_count: usize) -> f64 {
    if node_count < 2 {
        return 0.0_f64;
    }
    let max_edges = (node_count * (node_count - 1)) as f64;
    edge_count as f64 / max_edges
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &str)]) -> DiseaseGraph {
        let edges: Vec<_> = edges
            .iter()
            .map(|(a, b)| {
                (
                    DiseaseCode::parse(a).expect("code"),
                    DiseaseCode::parse(b).expect("code"),
                    1.0,
                )
            })
            .collect();
        DiseaseGraph::from_weighted_edges(&edges).expect("graph")
    }

    fn names(codes: &[DiseaseCode]) -> Vec<String> {
        codes.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn density_counts_ordered_pairs() {
        let g = graph(&[("A00", "B01"), ("B01", "C02")]);
        let stats = GraphStats::compute(&g);
        assert!((stats.density - 2.0 / 6.0).abs() < 1e-12);
        assert!(!stats.is_strongly_connected);
        assert_eq!(stats.scc_count, 3);
        assert_eq!(stats.largest_scc_size, 1);
    }

    #[test]
    fn two_disjoint_cycles() {
        let g = graph(&[
            ("A00", "B01"),
            ("B01", "C02"),
            ("C02", "A00"),
            ("D03", "E04"),
            ("E04", "F05"),
            ("F05", "D03"),
        ]);
        let stats = GraphStats::compute(&g);
        assert_eq!(stats.scc_count, 2);
        assert_eq!(stats.largest_scc_size, 3);
        assert_eq!(names(&stats.sccs[0]), ["A00", "B01", "C02"]);
        assert_eq!(names(&stats.largest_scc), ["A00", "B01", "C02"]);
        assert!(!stats.is_strongly_connected);
    }

    #[test]
    fn larger_component_wins_over_earlier_one() {
        let g = graph(&[
            ("A00", "B01"),
            ("B01", "A00"),
            ("C02", "D03"),
            ("D03", "E04"),
            ("E04", "C02"),
        ]);
        assert_eq!(names(&GraphStats::compute(&g).largest_scc), ["C02", "D03", "E04"]);
    }

    #[test]
    fn single_cycle_is_strongly_connected() {
        let g = graph(&[("A00", "B01"), ("B01", "A00")]);
        let stats = GraphStats::compute(&g);
        assert!(stats.is_strongly_connected);
        assert!((stats.density - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_graph() {
        let g = DiseaseGraph::from_weighted_edges(&[]).expect("graph");
        let stats = GraphStats::compute(&g);
        assert_eq!(stats.node_count, 0);
        assert!(stats.density.abs() < f64::EPSILON);
        assert!(!stats.is_strongly_connected);
        assert!(largest_scc(&g).is_empty());
    }
}

//! Degree, strength and degree-centrality metrics.
//!
//! # Overview
//!
//! All values are computed on the full graph:
//!
//! - **degree centrality**: `(in + out) / (n - 1)`
//! - **in/out degree**: raw neighbor counts
//! - **in/out degree centrality**: `in / (n - 1)`, `out / (n - 1)`
//! - **in/out strength**: sum of incoming/outgoing edge weights, signs kept
//!
//! For a single-node graph every centrality is `1.0`.

use petgraph::Direction;
use petgraph::visit::EdgeRef;
use serde::Serialize;

use crate::graph::build::DiseaseGraph;
use crate::metrics::ranking::Ranking;

// ---------------------------------------------------------------------------
// Degree Centrality
// ---------------------------------------------------------------------------

/// Degree-based rankings for every node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegreeMetrics {
    pub degree_centrality: Ranking,
    pub in_degree: Ranking,
    pub in_degree_centrality: Ranking,
    pub out_degree: Ranking,
    pub out_degree_centrality: Ranking,
    pub in_strength: Ranking,
    pub out_strength: Ranking,
}

/// Compute all degree-based metrics.
#[must_use]
pub fn degree_metrics(g: &DiseaseGraph) -> DegreeMetrics {
    let n = g.node_count();
    let scale = if n > 1 { 1.0 / (n - 1) as f64 } else { 1.0 };
    // Single-node convention: every centrality is 1.0.
    let centrality = |d: usize| if n == 1 { 1.0 } else { d as f64 * scale };

    let mut in_deg = Vec::with_capacity(n);
    let mut out_deg = Vec::with_capacity(n);
    let mut in_str = Vec::with_capacity(n);
    let mut out_str = Vec::with_capacity(n);

    for idx in g.graph.node_indices() {
        let Some(code) = g.code(idx) else { continue };
        let incoming: Vec<f64> = g
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| *e.weight())
            .collect();
        let outgoing: Vec<f64> = g
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| *e.weight())
            .collect();
        in_deg.push((code, incoming.len()));
        out_deg.push((code, outgoing.len()));
        in_str.push((code, incoming.iter().sum::<f64>()));
        out_str.push((code, outgoing.iter().sum::<f64>()));
    }

    let counts = |v: &[(comorbnet_core::DiseaseCode, usize)]| {
        Ranking::from_values(v.iter().map(|&(c, d)| (c, d as f64)))
    };
    let scaled = |v: &[(comorbnet_core::DiseaseCode, usize)]| {
        Ranking::from_values(v.iter().map(|&(c, d)| (c, centrality(d))))
    };

    DegreeMetrics {
        degree_centrality: Ranking::from_values(
            in_deg
                .iter()
                .zip(&out_deg)
                .map(|(&(c, i), &(_, o))| (c, centrality(i + o))),
        ),
        in_degree: counts(&in_deg),
        in_degree_centrality: scaled(&in_deg),
        out_degree: counts(&out_deg),
        out_degree_centrality: scaled(&out_deg),
        in_strength: Ranking::from_values(in_str),
        out_strength: Ranking::from_values(out_str),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use comorbnet_core::DiseaseCode;

    fn code(raw: &str) -> DiseaseCode {
        DiseaseCode::parse(raw).expect("valid code")
    }

    fn graph(edges: &[(&str, &str, f64)]) -> DiseaseGraph {
        let edges: Vec<_> = edges.iter().map(|&(a, b, w)| (code(a), code(b), w)).collect();
        DiseaseGraph::from_weighted_edges(&edges).expect("graph")
    }

    #[test]
    fn star_centralities() {
        let g = graph(&[("A00", "B01", 1.0), ("A00", "C02", 1.0), ("D03", "A00", 1.0)]);
        let m = degree_metrics(&g);
        assert_eq!(m.degree_centrality.get(code("A00")), Some(1.0));
        assert_eq!(m.out_degree.get(code("A00")), Some(2.0));
        assert_eq!(m.in_degree.get(code("A00")), Some(1.0));
        assert!((m.out_degree_centrality.get(code("A00")).expect("A00") - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(m.degree_centrality.codes()[0], code("A00"));
    }

    #[test]
    fn strength_keeps_sign() {
        let g = graph(&[("A00", "B01", 0.5), ("C02", "B01", -0.2), ("B01", "A00", 1.0)]);
        let m = degree_metrics(&g);
        assert!((m.in_strength.get(code("B01")).expect("B01") - 0.3).abs() < 1e-12);
        assert!((m.out_strength.get(code("C02")).expect("C02") + 0.2).abs() < 1e-12);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let g = graph(&[("C02", "A00", 1.0), ("B01", "D03", 1.0)]);
        let order: Vec<_> = degree_metrics(&g)
            .degree_centrality
            .codes()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(order, ["C02", "A00", "B01", "D03"]);
    }
}

//! Graph construction from the final edge table.
//!
//! # Overview
//!
//! Every row of a [`FinalEdgeTable`] becomes one directed edge
//! `cause → outcome` whose weight is the selected [`WeightField`]. Nodes are
//! disease codes, inserted in first-appearance order (a row's cause before its
//! outcome), so node indices are stable for a given table.
//!
//! ## Rejected input
//!
//! - the same `(cause, outcome)` pair twice,
//! - an edge from a disease to itself,
//! - a weight that is not finite.
//!
//! All three are [`IntegrityViolation`]s; nothing is silently merged.
//!
//! ## Cache Invalidation
//!
//! [`DiseaseGraph::content_hash`] is a BLAKE3 hash of the ordered edge list
//! including weights.

use std::collections::HashMap;

use comorbnet_core::{DiseaseCode, FinalEdgeTable, IntegrityViolation, PairKey, WeightField};
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, instrument};

use crate::error::NetworkError;
use crate::graph::shape::NodeShape;

// ---------------------------------------------------------------------------
// DiseaseGraph
// ---------------------------------------------------------------------------

/// A directed, weighted comorbidity network.
///
/// An edge `A → B` carries the weight of pair `A->B`.
#[derive(Debug, Clone)]
pub struct DiseaseGraph {
    /// Directed graph: nodes = disease codes, edges = weighted pairs.
    pub graph: DiGraph<DiseaseCode, f64>,
    /// Mapping from disease code to petgraph `NodeIndex`.
    pub node_map: HashMap<DiseaseCode, NodeIndex>,
    /// Optional decorative width/height per node.
    pub shapes: HashMap<DiseaseCode, NodeShape>,
    /// BLAKE3 content hash of the edge list.
    pub content_hash: String,
}

impl DiseaseGraph {
    /// Build the graph from a final edge table.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Integrity`] for duplicate pairs, self loops or a
    /// non-finite selected weight (for example `log_rr` of a zero relative
    /// risk).
    #[instrument(skip(table), fields(rows = table.len()))]
    pub fn from_final_edges(table: &FinalEdgeTable, field: WeightField) -> Result<Self, NetworkError> {
        let edges: Vec<_> = table
            .iter()
            .map(|edge| (edge.row.cause, edge.row.outcome, edge.weight(field)))
            .collect();
        Self::from_weighted_edges(&edges)
    }

    /// Build the graph from `(cause, outcome, weight)` triples.
    ///
    /// # Errors
    ///
    /// Same as [`DiseaseGraph::from_final_edges`].
    pub fn from_weighted_edges(
        edges: &[(DiseaseCode, DiseaseCode, f64)],
    ) -> Result<Self, NetworkError> {
        let mut graph = DiGraph::<DiseaseCode, f64>::with_capacity(0, edges.len());
        let mut node_map: HashMap<DiseaseCode, NodeIndex> = HashMap::new();

        for &(cause, outcome, weight) in edges {
            let key = PairKey::new(cause, outcome);
            if key.is_self_pair() {
                return Err(IntegrityViolation::SelfPair(key).into());
            }
            if !weight.is_finite() {
                return Err(IntegrityViolation::NonFiniteWeight { key }.into());
            }

            let from = *node_map
                .entry(cause)
                .or_insert_with(|| graph.add_node(cause));
            let to = *node_map
                .entry(outcome)
                .or_insert_with(|| graph.add_node(outcome));

            if graph.contains_edge(from, to) {
                return Err(IntegrityViolation::DuplicatePair(key).into());
            }
            graph.add_edge(from, to, weight);
        }

        let content_hash = compute_edge_hash(edges);
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            %content_hash,
            "disease graph built"
        );

        Ok(Self {
            graph,
            node_map,
            shapes: HashMap::new(),
            content_hash,
        })
    }

    /// Attach node shapes. Shapes naming codes not in the graph are ignored.
    #[must_use]
    pub fn with_shapes(mut self, shapes: impl IntoIterator<Item = (DiseaseCode, NodeShape)>) -> Self {
        for (code, shape) in shapes {
            if self.node_map.contains_key(&code) {
                self.shapes.insert(code, shape);
            }
        }
        self
    }

    /// Return the number of nodes (diseases) in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Return the number of edges (pairs) in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Look up the `NodeIndex` for a disease code.
    #[must_use]
    pub fn node_index(&self, code: DiseaseCode) -> Option<NodeIndex> {
        self.node_map.get(&code).copied()
    }

    /// Return the code label for a node.
    #[must_use]
    pub fn code(&self, idx: NodeIndex) -> Option<DiseaseCode> {
        self.graph.node_weight(idx).copied()
    }

    /// All codes in insertion order.
    #[must_use]
    pub fn codes(&self) -> Vec<DiseaseCode> {
        self.graph.node_weights().copied().collect()
    }

    /// Weight of the edge `from → to`, if present.
    #[must_use]
    pub fn weight(&self, from: DiseaseCode, to: DiseaseCode) -> Option<f64> {
        let a = self.node_index(from)?;
        let b = self.node_index(to)?;
        self.graph
            .find_edge(a, b)
            .and_then(|e| self.graph.edge_weight(e))
            .copied()
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Compute a BLAKE3 hash of the ordered, weighted edge list.
fn compute_edge_hash(edges: &[(DiseaseCode, DiseaseCode, f64)]) -> String {
    let mut hasher = blake3::Hasher::new();
    for (cause, outcome, weight) in edges {
        hasher.update(cause.as_str().as_bytes());
        hasher.update(b"\x00");
        hasher.update(outcome.as_str().as_bytes());
        hasher.update(b"\x00");
        hasher.update(&weight.to_bits().to_le_bytes());
    }
    format!("blake3:{}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use comorbnet_core::{ContingencyRow, FinalEdge};

    fn code(raw: &str) -> DiseaseCode {
        DiseaseCode::parse(raw).expect("valid code")
    }

    fn edge(cause: &str, outcome: &str, cells: [u64; 4]) -> FinalEdge {
        let key = PairKey::from_parts(cause, outcome).expect("pair");
        FinalEdge::from_row(ContingencyRow::new(key, cells[0], cells[1], cells[2], cells[3]))
            .expect("edge")
    }

    #[test]
    fn nodes_follow_first_appearance() {
        let table = FinalEdgeTable::from_edges(vec![
            edge("C02", "A00", [90, 10, 60, 40]),
            edge("A00", "B01", [90, 10, 60, 40]),
        ])
        .expect("table");
        let g = DiseaseGraph::from_final_edges(&table, WeightField::Rr).expect("graph");

        let codes: Vec<_> = g.codes().iter().map(ToString::to_string).collect();
        assert_eq!(codes, ["C02", "A00", "B01"]);
        assert_eq!(g.edge_count(), 2);
        assert!((g.weight(code("C02"), code("A00")).expect("edge") - 4.0).abs() < 1e-12);
    }

    #[test]
    fn log_weight_is_natural_log() {
        let table = FinalEdgeTable::from_edges(vec![edge("A00", "B01", [90, 10, 60, 40])])
            .expect("table");
        let g = DiseaseGraph::from_final_edges(&table, WeightField::LogRr).expect("graph");
        let w = g.weight(code("A00"), code("B01")).expect("edge");
        assert!((w - 4.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn duplicate_pair_is_rejected() {
        let err = DiseaseGraph::from_weighted_edges(&[
            (code("A00"), code("B01"), 1.0),
            (code("A00"), code("B01"), 2.0),
        ])
        .expect_err("duplicate");
        assert!(matches!(
            err,
            NetworkError::Integrity(IntegrityViolation::DuplicatePair(_))
        ));
    }

    #[test]
    fn self_loop_and_nan_are_rejected() {
        assert!(DiseaseGraph::from_weighted_edges(&[(code("A00"), code("A00"), 1.0)]).is_err());
        let err = DiseaseGraph::from_weighted_edges(&[(code("A00"), code("B01"), f64::NAN)])
            .expect_err("nan");
        assert_eq!(err.code(), comorbnet_core::ErrorCode::DataIntegrityViolation);
    }

    #[test]
    fn opposite_directions_are_distinct_edges() {
        let g = DiseaseGraph::from_weighted_edges(&[
            (code("A00"), code("B01"), 1.0),
            (code("B01"), code("A00"), 2.0),
        ])
        .expect("graph");
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn shapes_for_unknown_nodes_are_ignored() {
        let g = DiseaseGraph::from_weighted_edges(&[(code("A00"), code("B01"), 1.0)])
            .expect("graph")
            .with_shapes([
                (code("A00"), NodeShape { width: 0.5, height: 1.0 }),
                (code("Z99"), NodeShape { width: 1.0, height: 1.0 }),
            ]);
        assert_eq!(g.shapes.len(), 1);
        assert!(g.shapes.contains_key(&code("A00")));
    }

    #[test]
    fn hash_changes_with_weight() {
        let a = DiseaseGraph::from_weighted_edges(&[(code("A00"), code("B01"), 1.0)]).expect("a");
        let b = DiseaseGraph::from_weighted_edges(&[(code("A00"), code("B01"), 1.5)]).expect("b");
        assert_ne!(a.content_hash, b.content_hash);
        assert!(a.content_hash.starts_with("blake3:"));
    }
}

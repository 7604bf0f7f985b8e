//! Weighted betweenness centrality via Brandes' algorithm.
//!
//! # Algorithm
//!
//! Brandes (2001) with Dijkstra in place of BFS:
//!
//! 1. For each source `s`, run Dijkstra to get shortest-path counts and
//!    predecessor lists, recording nodes in order of settlement.
//! 2. Accumulate dependencies in reverse settlement order.
//! 3. Sum the dependencies over all sources.
//!
//! Edge weights are path lengths. Negative weights are floored at zero since
//! Dijkstra cannot take them. Scores are normalized by `1 / ((n-1)(n-2))`
//! when `n > 2`.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use tracing::instrument;

use crate::graph::build::DiseaseGraph;
use crate::metrics::ranking::Ranking;

/// Compute normalized weighted betweenness for every node.
#[must_use]
#[instrument(skip(g), fields(nodes = g.node_count()))]
pub fn betweenness_centrality(g: &DiseaseGraph) -> Ranking {
    let n = g.node_count();
    if n == 1 {
        return Ranking::from_values(g.codes().into_iter().map(|c| (c, 1.0)));
    }

    let mut cb = vec![0.0_f64; n];
    for s in g.graph.node_indices() {
        accumulate_from(g, s, &mut cb);
    }

    if n > 2 {
        let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
        for value in &mut cb {
            *value *= scale;
        }
    }

    Ranking::from_values(
        g.graph
            .node_indices()
            .filter_map(|idx| g.code(idx).map(|c| (c, cb[idx.index()]))),
    )
}

fn accumulate_from(g: &DiseaseGraph, s: NodeIndex, cb: &mut [f64]) {
    let n = cb.len();
    let si = s.index();

    // Nodes in order of settlement (farthest popped first).
    let mut stack: Vec<usize> = Vec::with_capacity(n);
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    // sigma[t]: number of shortest paths from s to t.
    let mut sigma = vec![0.0_f64; n];
    sigma[si] = 1.0;
    // seen[t]: best tentative distance; settled[t]: distance is final.
    let mut seen: Vec<Option<f64>> = vec![None; n];
    seen[si] = Some(0.0);
    let mut settled = vec![false; n];

    let mut heap = BinaryHeap::new();
    heap.push(Candidate { dist: 0.0, node: si });

    while let Some(Candidate { dist, node: v }) = heap.pop() {
        if settled[v] {
            continue;
        }
        settled[v] = true;
        stack.push(v);

        for edge in g.graph.edges_directed(NodeIndex::new(v), Direction::Outgoing) {
            let w = edge.target().index();
            let alt = dist + edge.weight().max(0.0);
            match seen[w] {
                Some(best) if !settled[w] && alt < best => {
                    seen[w] = Some(alt);
                    sigma[w] = sigma[v];
                    predecessors[w] = vec![v];
                    heap.push(Candidate { dist: alt, node: w });
                }
                None => {
                    seen[w] = Some(alt);
                    sigma[w] = sigma[v];
                    predecessors[w] = vec![v];
                    heap.push(Candidate { dist: alt, node: w });
                }
                #[allow(clippy::float_cmp)]
                Some(best) if alt == best => {
                    sigma[w] += sigma[v];
                    predecessors[w].push(v);
                }
                Some(_) => {}
            }
        }
    }

    let mut delta = vec![0.0_f64; n];
    while let Some(w) = stack.pop() {
        let coeff = (1.0 + delta[w]) / sigma[w];
        for &v in &predecessors[w] {
            delta[v] += sigma[v] * coeff;
        }
        if w != si {
            cb[w] += delta[w];
        }
    }
}

/// Min-heap entry keyed on distance.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    dist: f64,
    node: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap pops the smallest distance; lower node index
        // first among equal distances.
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.node.cmp(&self.node))
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
    fn chain_middle_node() {
        // A00 -> B01 -> C02: B01 lies on the single A00..C02 path.
        let g = graph(&[("A00", "B01", 1.0), ("B01", "C02", 1.0)]);
        let bc = betweenness_centrality(&g);
        assert!((bc.get(code("B01")).expect("B01") - 0.5).abs() < 1e-12);
        assert_eq!(bc.get(code("A00")), Some(0.0));
        assert_eq!(bc.codes()[0], code("B01"));
    }

    #[test]
    fn weights_choose_the_path() {
        // Direct A00 -> C02 is longer than the detour through B01.
        let g = graph(&[("A00", "C02", 5.0), ("A00", "B01", 1.0), ("B01", "C02", 1.0)]);
        let bc = betweenness_centrality(&g);
        assert!((bc.get(code("B01")).expect("B01") - 0.5).abs() < 1e-12);

        // With a short direct edge the detour carries nothing.
        let g = graph(&[("A00", "C02", 1.0), ("A00", "B01", 1.0), ("B01", "C02", 1.0)]);
        assert_eq!(betweenness_centrality(&g).get(code("B01")), Some(0.0));
    }

    #[test]
    fn equal_paths_split_credit() {
        // Two equal routes A00 -> {B01, C02} -> D03.
        let g = graph(&[
            ("A00", "B01", 1.0),
            ("A00", "C02", 1.0),
            ("B01", "D03", 1.0),
            ("C02", "D03", 1.0),
        ]);
        let bc = betweenness_centrality(&g);
        let expected = 0.5 / 6.0;
        assert!((bc.get(code("B01")).expect("B01") - expected).abs() < 1e-12);
        assert!((bc.get(code("C02")).expect("C02") - expected).abs() < 1e-12);
    }

    #[test]
    fn directed_cycle_is_symmetric() {
        let g = graph(&[("A00", "B01", 1.0), ("B01", "C02", 1.0), ("C02", "A00", 1.0)]);
        for entry in betweenness_centrality(&g).entries() {
            assert!((entry.value - 0.5).abs() < 1e-12);
        }
    }
}

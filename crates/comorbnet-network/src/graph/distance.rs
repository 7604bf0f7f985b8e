//! Unweighted distance metrics on an induced subgraph.
//!
//! Both metrics are hop counts; edge weights are ignored.
//!
//! - **average shortest path length**: mean directed distance over all ordered
//!   pairs of distinct members.
//! - **diameter**: longest shortest path once edge direction is dropped.
//!
//! Either metric is unavailable for fewer than two members or when some pair
//! cannot reach the other inside the subgraph.

use std::collections::{HashMap, VecDeque};

use petgraph::Direction;
use petgraph::graph::NodeIndex;
use serde::Serialize;
use tracing::debug;

use crate::error::NetworkError;
use crate::graph::build::DiseaseGraph;

/// Distance metrics for the largest strongly connected component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceMetrics {
    pub average_shortest_path_length: Option<f64>,
    pub diameter: Option<usize>,
    /// Why the metrics are unavailable, when they are.
    pub unavailable_reason: Option<String>,
}

impl DistanceMetrics {
    /// Compute both metrics on `members`; a degenerate subgraph makes both
    /// unavailable without failing the caller.
    #[must_use]
    pub fn compute(g: &DiseaseGraph, members: &[NodeIndex]) -> Self {
        let result = average_shortest_path_length(g, members)
            .and_then(|avg| diameter(g, members).map(|d| (avg, d)));
        match result {
            Ok((avg, d)) => Self {
                average_shortest_path_length: Some(avg),
                diameter: Some(d),
                unavailable_reason: None,
            },
            Err(err) => {
                debug!(error = %err, "distance metrics unavailable");
                Self {
                    average_shortest_path_length: None,
                    diameter: None,
                    unavailable_reason: Some(err.to_string()),
                }
            }
        }
    }
}

/// Mean directed hop distance over ordered member pairs.
///
/// # Errors
///
/// [`NetworkError::DegenerateGraph`] for fewer than two members or an
/// unreachable pair.
pub fn average_shortest_path_length(
    g: &DiseaseGraph,
    members: &[NodeIndex],
) -> Result<f64, NetworkError> {
    let n = check_size(members)?;
    let mut total = 0_usize;
    for &source in members {
        let dist = bfs(g, members, source, &[Direction::Outgoing]);
        if dist.len() < n {
            return Err(unreachable(g, source));
        }
        total += dist.values().sum::<usize>();
    }
    Ok(total as f64 / (n * (n - 1)) as f64)
}

/// Longest shortest path ignoring edge direction.
///
/// # Errors
///
/// Same as [`average_shortest_path_length`].
pub fn diameter(g: &DiseaseGraph, members: &[NodeIndex]) -> Result<usize, NetworkError> {
    let n = check_size(members)?;
    let mut longest = 0;
    for &source in members {
        let dist = bfs(g, members, source, &[Direction::Outgoing, Direction::Incoming]);
        if dist.len() < n {
            return Err(unreachable(g, source));
        }
        longest = longest.max(dist.values().copied().max().unwrap_or(0));
    }
    Ok(longest)
}

fn check_size(members: &[NodeIndex]) -> Result<usize, NetworkError> {
    if members.len() < 2 {
        return Err(NetworkError::degenerate(format!(
            "distance metrics need at least 2 nodes, got {}",
            members.len()
        )));
    }
    Ok(members.len())
}

fn unreachable(g: &DiseaseGraph, source: NodeIndex) -> NetworkError {
    let label = g.code(source).map(|c| c.to_string()).unwrap_or_default();
    NetworkError::degenerate(format!("some nodes are unreachable from {label}"))
}

/// Hop distances from `source` within `members`, following `directions`.
fn bfs(
    g: &DiseaseGraph,
    members: &[NodeIndex],
    source: NodeIndex,
    directions: &[Direction],
) -> HashMap<NodeIndex, usize> {
    let inside: std::collections::HashSet<NodeIndex> = members.iter().copied().collect();
    let mut dist = HashMap::with_capacity(members.len());
    dist.insert(source, 0);
    let mut queue = VecDeque::from([source]);

    while let Some(v) = queue.pop_front() {
        let dv = dist[&v];
        for &direction in directions {
            for w in g.graph.neighbors_directed(v, direction) {
                if inside.contains(&w) && !dist.contains_key(&w) {
                    dist.insert(w, dv + 1);
                    queue.push_back(w);
                }
            }
        }
    }
    dist
}

#[cfg(test)]
mod tests {
    use super::*;
    use comorbnet_core::DiseaseCode;

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

    fn all(g: &DiseaseGraph) -> Vec<NodeIndex> {
        g.graph.node_indices().collect()
    }

    #[test]
    fn directed_triangle() {
        let g = graph(&[("A00", "B01"), ("B01", "C02"), ("C02", "A00")]);
        let metrics = DistanceMetrics::compute(&g, &all(&g));
        assert_eq!(metrics.average_shortest_path_length, Some(1.5));
        assert_eq!(metrics.diameter, Some(1));
    }

    #[test]
    fn diameter_ignores_direction() {
        // A00 <-> B01 <-> C02 <-> D03 as a strongly connected path.
        let g = graph(&[
            ("A00", "B01"),
            ("B01", "A00"),
            ("B01", "C02"),
            ("C02", "B01"),
            ("C02", "D03"),
            ("D03", "C02"),
        ]);
        assert_eq!(diameter(&g, &all(&g)).expect("diameter"), 3);
        let avg = average_shortest_path_length(&g, &all(&g)).expect("avg");
        assert!((avg - 20.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn single_node_is_degenerate() {
        let g = graph(&[("A00", "B01")]);
        let one = vec![g.node_index(DiseaseCode::parse("A00").expect("code")).expect("node")];
        let metrics = DistanceMetrics::compute(&g, &one);
        assert_eq!(metrics.average_shortest_path_length, None);
        assert_eq!(metrics.diameter, None);
        assert!(metrics.unavailable_reason.is_some());
    }

    #[test]
    fn unreachable_pair_is_degenerate() {
        let g = graph(&[("A00", "B01")]);
        let err = average_shortest_path_length(&g, &all(&g)).expect_err("unreachable");
        assert!(matches!(err, NetworkError::DegenerateGraph { .. }));
    }
}

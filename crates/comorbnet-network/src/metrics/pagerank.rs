//! Weighted PageRank.
//!
//! # Algorithm
//!
//! Power iteration on the weight-normalized transition matrix:
//!
//! ```text
//! PR(v) = (1 - d) / N + d * Σ PR(u) * w(u, v) / W(u) + d * D / N
//! ```
//!
//! where `d` is the damping factor, `W(u)` the out-strength of `u` and `D` the
//! total rank of dangling nodes (out-strength zero), which is redistributed
//! uniformly. Iteration stops once the L1 change drops below
//! `N * tolerance`.
//!
//! Weights below zero (negative log relative risks) carry no flow and are
//! treated as zero.

use petgraph::visit::EdgeRef;
use serde::Serialize;
use tracing::{instrument, warn};

use comorbnet_core::config::PageRankSettings;

use crate::graph::build::DiseaseGraph;
use crate::metrics::ranking::Ranking;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for PageRank computation.
#[derive(Debug, Clone)]
pub struct PageRankConfig {
    /// Damping factor (probability of following a link vs teleporting).
    /// Default: 0.85.
    pub damping: f64,
    /// Per-node convergence tolerance. Default: 1e-6.
    pub tolerance: f64,
    /// Maximum number of iterations. Default: 100.
    pub max_iter: usize,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            tolerance: 1e-6,
            max_iter: 100,
        }
    }
}

impl From<&PageRankSettings> for PageRankConfig {
    fn from(settings: &PageRankSettings) -> Self {
        Self {
            damping: settings.damping,
            tolerance: settings.tolerance,
            max_iter: settings.max_iter,
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Result of a PageRank computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageRankResult {
    pub scores: Ranking,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Whether the algorithm converged within `max_iter`.
    pub converged: bool,
}

// ---------------------------------------------------------------------------
// PageRank
// ---------------------------------------------------------------------------

/// Node-indexed PageRank vector; the building block shared with the
/// map-equation flow model.
///
/// `edges` are `(from, to, weight)` over node indices `0..n`.
pub(crate) fn pagerank_vector(
    n: usize,
    edges: &[(usize, usize, f64)],
    config: &PageRankConfig,
) -> (Vec<f64>, usize, bool) {
    if n == 0 {
        return (Vec::new(), 0, true);
    }

    let n_f64 = n as f64;
    let mut out_strength = vec![0.0_f64; n];
    for &(from, _, w) in edges {
        out_strength[from] += w.max(0.0);
    }

    let mut ranks = vec![1.0 / n_f64; n];
    let mut new_ranks = vec![0.0_f64; n];
    let mut iterations = 0;
    let mut converged = false;

    for _ in 0..config.max_iter {
        iterations += 1;

        let dangling: f64 = (0..n)
            .filter(|&i| out_strength[i] <= 0.0)
            .map(|i| ranks[i])
            .sum();
        let base = (1.0 - config.damping) / n_f64 + config.damping * dangling / n_f64;
        new_ranks.fill(base);

        for &(from, to, w) in edges {
            if out_strength[from] > 0.0 {
                new_ranks[to] += config.damping * ranks[from] * w.max(0.0) / out_strength[from];
            }
        }

        let delta: f64 = ranks
            .iter()
            .zip(new_ranks.iter())
            .map(|(old, new)| (old - new).abs())
            .sum();

        std::mem::swap(&mut ranks, &mut new_ranks);

        if delta < n_f64 * config.tolerance {
            converged = true;
            break;
        }
    }

    (ranks, iterations, converged)
}

/// Compute weighted PageRank over the full graph.
#[must_use]
#[instrument(skip(g, config), fields(nodes = g.node_count()))]
pub fn pagerank(g: &DiseaseGraph, config: &PageRankConfig) -> PageRankResult {
    let n = g.node_count();
    let edges: Vec<_> = g
        .graph
        .edge_references()
        .map(|e| (e.source().index(), e.target().index(), *e.weight()))
        .collect();

    let (ranks, iterations, converged) = if n == 1 {
        (vec![1.0], 0, true)
    } else {
        pagerank_vector(n, &edges, config)
    };
    if !converged {
        warn!(iterations, "pagerank did not converge");
    }

    let scores = Ranking::from_values(
        g.graph
            .node_indices()
            .filter_map(|idx| g.code(idx).map(|c| (c, ranks[idx.index()]))),
    );

    PageRankResult {
        scores,
        iterations,
        converged,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

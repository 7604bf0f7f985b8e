//! Two-level map-equation optimizer.
//!
//! # Flow model
//!
//! Node visit rates `p` are the PageRank of the weighted graph (uniform
//! teleportation, dangling rank spread uniformly). Link flow is the rate at
//! which the walker follows an edge without teleporting:
//!
//! ```text
//! f(a, b) = d * p(a) * w(a, b) / W(a)
//! ```
//!
//! Teleportation is not recorded as module exit flow. Negative weights carry
//! no flow.
//!
//! # Codelength
//!
//! With `q_m` the exit flow of module `m`, `p_m` its total visit rate and
//! `q = Σ q_m`:
//!
//! ```text
//! L = plogp(q) - 2 Σ plogp(q_m) - Σ plogp(p_a) + Σ plogp(q_m + p_m)
//! ```
//!
//! # Search
//!
//! Each trial starts from singletons and repeats:
//!
//! 1. Visit nodes in a seeded random order and move each into the neighboring
//!    module with the largest codelength decrease, until a sweep moves
//!    nothing.
//! 2. Collapse modules into super-nodes, dropping flow internal to a module.
//!
//! Exit flows are updated incrementally, so a move costs time proportional to
//! the node's degree. The best of all trials is kept unless a single module
//! is at least as short.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use comorbnet_core::config::CommunitySettings;

use crate::community::{ClusterBackend, WeightedLink};
use crate::error::NetworkError;
use crate::metrics::pagerank::{PageRankConfig, pagerank_vector};

/// Local-moving sweeps per level before giving up on convergence.
const MAX_SWEEPS: usize = 100;

/// Codelength changes smaller than this are treated as no improvement.
const MIN_IMPROVEMENT: f64 = 1e-10;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Seeded map-equation backend.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEquation {
    /// Independent optimization runs; the shortest codelength wins.
    pub trials: usize,
    /// Seed of the first trial; trial `t` uses `seed + t`.
    pub seed: u64,
    /// Maximum number of aggregation levels per trial.
    pub max_passes: usize,
    /// Damping factor of the flow model.
    pub damping: f64,
}

impl Default for MapEquation {
    fn default() -> Self {
        Self::from(&CommunitySettings::default())
    }
}

impl From<&CommunitySettings> for MapEquation {
    fn from(settings: &CommunitySettings) -> Self {
        Self {
            trials: settings.trials.max(1),
            seed: settings.seed,
            max_passes: settings.max_passes.max(1),
            damping: 0.85,
        }
    }
}

impl MapEquation {
    #[must_use]
    pub const fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }
}

impl ClusterBackend for MapEquation {
    fn name(&self) -> &'static str {
        "map_equation"
    }

    fn detect(&self, nodes: usize, links: &[WeightedLink]) -> Result<Vec<usize>, NetworkError> {
        if let Some(bad) = links
            .iter()
            .find(|l| l.from >= nodes || l.to >= nodes || !l.weight.is_finite())
        {
            return Err(NetworkError::Backend(format!(
                "invalid link {} -> {} ({}) for {nodes} nodes",
                bad.from, bad.to, bad.weight
            )));
        }
        if nodes == 0 {
            return Ok(Vec::new());
        }

        let flow = Flow::compute(nodes, links, self.damping);
        let one_module = flow.codelength(&vec![0; nodes]);

        let mut best: Option<(f64, Vec<usize>)> = None;
        for trial in 0..self.trials {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(trial as u64));
            let assignment = self.run_trial(&flow, &mut rng);
            let length = flow.codelength(&assignment);
            debug!(trial, codelength = length, "map equation trial");
            if best
                .as_ref()
                .is_none_or(|(shortest, _)| length < shortest - MIN_IMPROVEMENT)
            {
                best = Some((length, assignment));
            }
        }

        Ok(match best {
            Some((length, assignment)) if length < one_module - MIN_IMPROVEMENT => assignment,
            _ => vec![0; nodes],
        })
    }
}

impl MapEquation {
    fn run_trial(&self, flow: &Flow, rng: &mut StdRng) -> Vec<usize> {
        let mut assignment: Vec<usize> = (0..flow.nodes.len()).collect();
        let mut level = Level::from_flow(flow);

        for _ in 0..self.max_passes {
            let (modules, moved) = level.local_moving(rng);
            if !moved {
                break;
            }
            let (labels, count) = dense_labels(&modules);
            assignment = assignment.iter().map(|&s| labels[s]).collect();
            level = level.aggregate(&labels, count);
            if count == 1 {
                break;
            }
        }

        dense_labels(&assignment).0
    }
}

// ---------------------------------------------------------------------------
// Flow
// ---------------------------------------------------------------------------

fn plogp(x: f64) -> f64 {
    if x > 0.0 { x * x.log2() } else { 0.0 }
}

/// Stationary node and link flow of the leaf network.
#[derive(Debug)]
struct Flow {
    nodes: Vec<f64>,
    /// `(from, to, flow)` for every link with positive flow.
    links: Vec<(usize, usize, f64)>,
}

impl Flow {
    fn compute(n: usize, links: &[WeightedLink], damping: f64) -> Self {
        let edges: Vec<(usize, usize, f64)> = links
            .iter()
            .filter(|l| l.from != l.to)
            .map(|l| (l.from, l.to, l.weight.max(0.0)))
            .collect();
        let config = PageRankConfig {
            damping,
            tolerance: 1e-15,
            max_iter: 200,
        };
        let (nodes, _, _) = pagerank_vector(n, &edges, &config);

        let mut out_strength = vec![0.0_f64; n];
        for &(from, _, w) in &edges {
            out_strength[from] += w;
        }
        let links = edges
            .iter()
            .filter(|&&(from, _, w)| w > 0.0 && out_strength[from] > 0.0)
            .map(|&(from, to, w)| (from, to, damping * nodes[from] * w / out_strength[from]))
            .collect();

        Self { nodes, links }
    }

    /// Codelength of a dense module assignment.
    fn codelength(&self, assignment: &[usize]) -> f64 {
        let k = assignment.iter().max().map_or(0, |m| m + 1);
        let mut exit = vec![0.0_f64; k];
        let mut module_flow = vec![0.0_f64; k];
        for (node, &m) in assignment.iter().enumerate() {
            module_flow[m] += self.nodes[node];
        }
        for &(from, to, f) in &self.links {
            if assignment[from] != assignment[to] {
                exit[assignment[from]] += f;
            }
        }
        let total_exit: f64 = exit.iter().sum();

        plogp(total_exit) - 2.0 * exit.iter().copied().map(plogp).sum::<f64>()
            - self.nodes.iter().copied().map(plogp).sum::<f64>()
            + exit
                .iter()
                .zip(&module_flow)
                .map(|(&q, &p)| plogp(q + p))
                .sum::<f64>()
    }
}

// ---------------------------------------------------------------------------
// Level
// ---------------------------------------------------------------------------

/// One aggregation level: nodes are leaves or collapsed modules.
#[derive(Debug, Clone)]
struct Level {
    flow: Vec<f64>,
    out: Vec<Vec<(usize, f64)>>,
    inc: Vec<Vec<(usize, f64)>>,
}

impl Level {
    fn from_flow(flow: &Flow) -> Self {
        Self::build(flow.nodes.clone(), flow.links.iter().copied())
    }

    /// Merge parallel links and drop self links.
    fn build(flow: Vec<f64>, links: impl Iterator<Item = (usize, usize, f64)>) -> Self {
        let n = flow.len();
        let mut merged: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        for (from, to, f) in links {
            if from != to && f > 0.0 {
                *merged.entry((from, to)).or_insert(0.0) += f;
            }
        }
        let mut out = vec![Vec::new(); n];
        let mut inc = vec![Vec::new(); n];
        for ((from, to), f) in merged {
            out[from].push((to, f));
            inc[to].push((from, f));
        }
        Self { flow, out, inc }
    }

    fn aggregate(&self, labels: &[usize], count: usize) -> Self {
        let mut flow = vec![0.0_f64; count];
        for (node, &m) in labels.iter().enumerate() {
            flow[m] += self.flow[node];
        }
        let links = self
            .out
            .iter()
            .enumerate()
            .flat_map(|(from, targets)| targets.iter().map(move |&(to, f)| (from, to, f)))
            .map(|(from, to, f)| (labels[from], labels[to], f));
        Self::build(flow, links)
    }

    /// Greedy node moves until a sweep changes nothing. Returns the module of
    /// every node (not dense) and whether anything moved.
    fn local_moving(&self, rng: &mut StdRng) -> (Vec<usize>, bool) {
        let n = self.flow.len();
        let node_out: Vec<f64> = self.out.iter().map(|t| t.iter().map(|&(_, f)| f).sum()).collect();

        let mut modules: Vec<usize> = (0..n).collect();
        let mut state = ModuleState {
            exit: node_out.clone(),
            flow: self.flow.clone(),
            total_exit: node_out.iter().sum(),
        };
        let mut order: Vec<usize> = (0..n).collect();
        let mut moved_any = false;

        for _ in 0..MAX_SWEEPS {
            order.shuffle(rng);
            let mut moved = 0_usize;

            for &a in &order {
                let current = modules[a];
                // module -> (flow from a into it, flow from it into a)
                let mut touching: BTreeMap<usize, (f64, f64)> = BTreeMap::new();
                for &(b, f) in &self.out[a] {
                    touching.entry(modules[b]).or_insert((0.0, 0.0)).0 += f;
                }
                for &(b, f) in &self.inc[a] {
                    touching.entry(modules[b]).or_insert((0.0, 0.0)).1 += f;
                }

                let (to_current, from_current) =
                    touching.get(&current).copied().unwrap_or((0.0, 0.0));
                let leaving = Side {
                    module: current,
                    exit: state.exit[current] - (node_out[a] - to_current) + from_current,
                    flow: state.flow[current] - self.flow[a],
                };

                let mut best: Option<(f64, Side)> = None;
                for (&target, &(to_target, from_target)) in &touching {
                    if target == current {
                        continue;
                    }
                    let joining = Side {
                        module: target,
                        exit: state.exit[target] + (node_out[a] - to_target) - from_target,
                        flow: state.flow[target] + self.flow[a],
                    };
                    let delta = state.delta(&leaving, &joining);
                    if delta < -MIN_IMPROVEMENT && best.as_ref().is_none_or(|(d, _)| delta < *d) {
                        best = Some((delta, joining));
                    }
                }

                if let Some((_, joining)) = best {
                    modules[a] = joining.module;
                    state.apply(&leaving, &joining);
                    moved += 1;
                }
            }

            if moved == 0 {
                break;
            }
            moved_any = true;
        }

        (modules, moved_any)
    }
}

/// Proposed exit and visit flow of one module after a move.
#[derive(Debug, Clone, Copy)]
struct Side {
    module: usize,
    exit: f64,
    flow: f64,
}

#[derive(Debug)]
struct ModuleState {
    exit: Vec<f64>,
    flow: Vec<f64>,
    total_exit: f64,
}

impl ModuleState {
    /// Codelength change if the two modules took the proposed values. The
    /// node-entropy term is constant and omitted.
    fn delta(&self, leaving: &Side, joining: &Side) -> f64 {
        let (i, j) = (leaving.module, joining.module);
        let new_total = self.total_exit - self.exit[i] - self.exit[j] + leaving.exit + joining.exit;

        (plogp(new_total) - plogp(self.total_exit))
            - 2.0
                * (plogp(leaving.exit) + plogp(joining.exit)
                    - plogp(self.exit[i])
                    - plogp(self.exit[j]))
            + (plogp(leaving.exit + leaving.flow) + plogp(joining.exit + joining.flow)
                - plogp(self.exit[i] + self.flow[i])
                - plogp(self.exit[j] + self.flow[j]))
    }

    fn apply(&mut self, leaving: &Side, joining: &Side) {
        let (i, j) = (leaving.module, joining.module);
        self.total_exit += leaving.exit + joining.exit - self.exit[i] - self.exit[j];
        self.exit[i] = leaving.exit;
        self.flow[i] = leaving.flow;
        self.exit[j] = joining.exit;
        self.flow[j] = joining.flow;
    }
}

/// Relabel ids densely in order of first appearance.
fn dense_labels(ids: &[usize]) -> (Vec<usize>, usize) {
    let mut seen: BTreeMap<usize, usize> = BTreeMap::new();
    let labels = ids
        .iter()
        .map(|&id| {
            let next = seen.len();
            *seen.entry(id).or_insert(next)
        })
        .collect();
    (labels, seen.len())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

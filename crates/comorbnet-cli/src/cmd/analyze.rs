//! `comorbnet analyze`: network metrics and clusters for a suppressed edge
//! table.
//!
//! The full [`NetworkAnalysis`] bundle is written as JSON with `--out`, or
//! printed in JSON mode. Pretty and text modes print a summary with the
//! top-ranked diseases.

use std::io::Write;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use serde::Serialize;

use comorbnet_core::config::{ClusterScope, ProjectConfig};
use comorbnet_core::{FinalEdgeTable, WeightField};
use comorbnet_network::analysis::{AnalysisConfig, NetworkAnalysis, analyze};
use comorbnet_network::graph::DiseaseGraph;
use comorbnet_network::graph::shape::read_shapes_csv;
use comorbnet_network::metrics::Ranking;

use crate::cmd::{create_output, open_input};
use crate::output::{OutputMode, fail, pretty_kv, pretty_section, render_mode};

/// Clustering scope on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScopeArg {
    LargestScc,
    WholeGraph,
}

impl From<ScopeArg> for ClusterScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::LargestScc => Self::LargestScc,
            ScopeArg::WholeGraph => Self::WholeGraph,
        }
    }
}

/// Arguments for `comorbnet analyze`.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Suppressed edge table (CSV).
    #[arg(long)]
    pub edges: PathBuf,

    /// Edge weight used for the graph.
    #[arg(long)]
    pub weight: Option<WeightField>,

    /// Node shape attributes (CSV with `node_code, width, height`).
    #[arg(long)]
    pub shapes: Option<PathBuf>,

    /// Subgraph to cluster.
    #[arg(long, value_enum)]
    pub scope: Option<ScopeArg>,

    /// Seed for the clustering trials.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the full analysis bundle (JSON).
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Percentage of top-ranked diseases listed per metric, in (0, 100].
    #[arg(long, default_value_t = 10.0)]
    pub top_percent: f64,
}

#[derive(Debug, Serialize)]
struct AnalyzeSummary {
    nodes: usize,
    edges: usize,
    density: f64,
    scc_count: usize,
    largest_scc_size: usize,
    average_shortest_path_length: Option<f64>,
    diameter: Option<usize>,
    cluster_count: usize,
    cluster_sizes: Vec<usize>,
    unassigned: usize,
    top_pagerank: Ranking,
    top_betweenness: Ranking,
    top_degree: Ranking,
}

impl AnalyzeSummary {
    fn new(analysis: &NetworkAnalysis, top: &Tops) -> Self {
        Self {
            nodes: analysis.stats.node_count,
            edges: analysis.stats.edge_count,
            density: analysis.stats.density,
            scc_count: analysis.stats.scc_count,
            largest_scc_size: analysis.stats.largest_scc_size,
            average_shortest_path_length: analysis.distances.average_shortest_path_length,
            diameter: analysis.distances.diameter,
            cluster_count: analysis.clusters.cluster_count,
            cluster_sizes: analysis.clusters.cluster_sizes.clone(),
            unassigned: analysis.clusters.unassigned_count,
            top_pagerank: top.pagerank.clone(),
            top_betweenness: top.betweenness.clone(),
            top_degree: top.degree.clone(),
        }
    }
}

struct Tops {
    pagerank: Ranking,
    betweenness: Ranking,
    degree: Ranking,
}

fn ranked_line(ranking: &Ranking) -> String {
    ranking
        .entries()
        .iter()
        .map(|e| format!("{} ({:.4})", e.code, e.value))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Execute `comorbnet analyze`.
///
/// # Errors
///
/// Fails on unreadable inputs, an invalid edge table, an out-of-range
/// `--top-percent`, or a clustering failure.
pub fn run_analyze(args: &AnalyzeArgs, config: &ProjectConfig, output: OutputMode) -> anyhow::Result<()> {
    let source = args.edges.display().to_string();
    let table = FinalEdgeTable::read_csv(open_input(&args.edges)?, &source)
        .map_err(|e| fail(output, &e))?;
    let weight = args.weight.unwrap_or(config.network.weight);

    let mut graph = DiseaseGraph::from_final_edges(&table, weight).map_err(|e| fail(output, &e))?;
    if let Some(path) = &args.shapes {
        let shapes = read_shapes_csv(open_input(path)?, &path.display().to_string())
            .map_err(|e| fail(output, &e))?;
        graph = graph.with_shapes(shapes);
    }

    let mut analysis_config = AnalysisConfig::from(config);
    if let Some(scope) = args.scope {
        analysis_config.cluster_scope = scope.into();
    }
    if let Some(seed) = args.seed {
        analysis_config.community.seed = seed;
    }

    let analysis = analyze(&graph, &analysis_config).map_err(|e| fail(output, &e))?;

    if let Some(path) = &args.out {
        let mut writer = create_output(path)?;
        serde_json::to_writer_pretty(&mut writer, &analysis)?;
        writeln!(writer)?;
        writer.flush()?;
    }

    if output.is_json() && args.out.is_none() {
        return render_mode(output, &analysis, |_, _| Ok(()), |_, _| Ok(()));
    }

    let top = Tops {
        pagerank: analysis
            .pagerank
            .scores
            .top_percent(args.top_percent)
            .map_err(|e| fail(output, &e))?,
        betweenness: analysis
            .betweenness
            .top_percent(args.top_percent)
            .map_err(|e| fail(output, &e))?,
        degree: analysis
            .degree
            .degree_centrality
            .top_percent(args.top_percent)
            .map_err(|e| fail(output, &e))?,
    };
    let summary = AnalyzeSummary::new(&analysis, &top);

    render_mode(
        output,
        &summary,
        |s, w| {
            writeln!(
                w,
                "nodes={} edges={} density={:.4} sccs={} largest_scc={} clusters={} unassigned={}",
                s.nodes,
                s.edges,
                s.density,
                s.scc_count,
                s.largest_scc_size,
                s.cluster_count,
                s.unassigned
            )?;
            for entry in &s.top_pagerank {
                writeln!(w, "pagerank {} {:.6}", entry.code, entry.value)?;
            }
            Ok(())
        },
        |s, w| {
            pretty_section(w, "Network")?;
            pretty_kv(w, "nodes", s.nodes.to_string())?;
            pretty_kv(w, "edges", s.edges.to_string())?;
            pretty_kv(w, "density", format!("{:.4}", s.density))?;
            pretty_kv(
                w,
                "SCCs",
                format!("{} (largest {})", s.scc_count, s.largest_scc_size),
            )?;
            pretty_kv(
                w,
                "avg path",
                s.average_shortest_path_length
                    .map_or_else(|| "unavailable".to_string(), |v| format!("{v:.4}")),
            )?;
            pretty_kv(
                w,
                "diameter",
                s.diameter
                    .map_or_else(|| "unavailable".to_string(), |v| v.to_string()),
            )?;
            writeln!(w)?;
            pretty_section(w, "Clusters")?;
            pretty_kv(w, "count", s.cluster_count.to_string())?;
            pretty_kv(w, "sizes", format!("{:?}", s.cluster_sizes))?;
            pretty_kv(w, "unassigned", s.unassigned.to_string())?;
            writeln!(w)?;
            pretty_section(w, "Top diseases")?;
            pretty_kv(w, "pagerank", ranked_line(&s.top_pagerank))?;
            pretty_kv(w, "betweenness", ranked_line(&s.top_betweenness))?;
            pretty_kv(w, "degree", ranked_line(&s.top_degree))
        },
    )
}

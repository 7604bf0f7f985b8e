//! Cluster numbering and scope invariants over random graphs.

use std::collections::BTreeSet;

use comorbnet_core::DiseaseCode;
use comorbnet_core::config::ClusterScope;
use comorbnet_network::community::{
    ClusterAssignment, MapEquation, detect_communities, renumber_by_size,
};
use comorbnet_network::graph::{DiseaseGraph, largest_scc};
use proptest::prelude::*;

fn node_code(i: usize) -> DiseaseCode {
    DiseaseCode::parse(&format!("A{i:02}")).expect("valid code")
}

/// Random simple digraph on up to 12 nodes with positive and negative weights.
fn arb_graph() -> impl Strategy<Value = DiseaseGraph> {
    (2_usize..12)
        .prop_flat_map(|n| {
            proptest::collection::btree_map((0..n, 0..n), -0.5_f64..3.0, 1..(n * n).min(n * 3))
        })
        .prop_filter_map("needs a non-loop edge", |edges| {
            let edges: Vec<_> = edges
                .into_iter()
                .filter(|&((a, b), _)| a != b)
                .map(|((a, b), w)| (node_code(a), node_code(b), w))
                .collect();
            if edges.is_empty() {
                return None;
            }
            DiseaseGraph::from_weighted_edges(&edges).ok()
        })
}

fn assert_ranked(clusters: &ClusterAssignment) -> Result<(), TestCaseError> {
    let ids: BTreeSet<usize> = clusters.nodes.iter().filter_map(|n| n.cluster).collect();
    prop_assert_eq!(ids.len(), clusters.cluster_count);
    prop_assert!(ids.iter().copied().eq(0..clusters.cluster_count));
    prop_assert!(clusters.cluster_sizes.windows(2).all(|w| w[0] >= w[1]));
    prop_assert_eq!(
        clusters.cluster_sizes.iter().sum::<usize>(),
        clusters.assigned_count
    );
    prop_assert_eq!(
        clusters.assigned_count + clusters.unassigned_count,
        clusters.nodes.len()
    );
    Ok(())
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(64))]

    #[test]
    fn renumbered_ids_are_ranked(raw in proptest::collection::vec(0_usize..20, 0..40)) {
        let ids = renumber_by_size(&raw);
        prop_assert_eq!(ids.len(), raw.len());

        let k = ids.iter().max().map_or(0, |m| m + 1);
        let mut sizes = vec![0_usize; k];
        for &id in &ids {
            sizes[id] += 1;
        }
        prop_assert!(sizes.iter().all(|&s| s > 0));
        prop_assert!(sizes.windows(2).all(|w| w[0] >= w[1]));

        // Same raw id <=> same new id.
        for (i, j) in (0..raw.len()).flat_map(|i| (0..raw.len()).map(move |j| (i, j))) {
            prop_assert_eq!(raw[i] == raw[j], ids[i] == ids[j]);
        }
    }

    #[test]
    fn whole_graph_clusters_are_ranked(g in arb_graph()) {
        let clusters = detect_communities(&g, ClusterScope::WholeGraph, &MapEquation::default())
            .expect("clusters");
        assert_ranked(&clusters)?;
        prop_assert_eq!(clusters.unassigned_count, 0);
    }

    #[test]
    fn largest_scc_clusters_cover_exactly_the_scc(g in arb_graph()) {
        let clusters = detect_communities(&g, ClusterScope::LargestScc, &MapEquation::default())
            .expect("clusters");
        assert_ranked(&clusters)?;

        let scc: BTreeSet<DiseaseCode> =
            largest_scc(&g).into_iter().filter_map(|idx| g.code(idx)).collect();
        for node in &clusters.nodes {
            prop_assert_eq!(node.cluster.is_some(), scc.contains(&node.code));
        }
        prop_assert_eq!(clusters.assigned_count, scc.len());
    }

    #[test]
    fn clustering_is_deterministic(g in arb_graph()) {
        let backend = MapEquation::default();
        let first = detect_communities(&g, ClusterScope::WholeGraph, &backend).expect("first");
        let second = detect_communities(&g, ClusterScope::WholeGraph, &backend).expect("second");
        prop_assert_eq!(first, second);
    }
}

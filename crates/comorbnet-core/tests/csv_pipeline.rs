//! End-to-end table pipeline over cohort files on disk.

use std::fs;
use std::path::Path;

use comorbnet_core::merge::merge_follow_up;
use comorbnet_core::provider::{CsvDirProvider, load_outcome_index};
use comorbnet_core::runner::{RunOptions, UnitStatus, build_baseline_table, build_full_table};
use comorbnet_core::table::read_edge_persons_json;
use comorbnet_core::{
    DiseaseCode, FailureKind, FinalEdgeTable, FullContingencyTable, SuppressionFilter, WeightField,
};

fn code(raw: &str) -> DiseaseCode {
    DiseaseCode::parse(raw).expect("valid code")
}

/// Write a cohort file with `cases` case ids starting at `case_start` and
/// `controls` control ids starting at `control_start`.
fn write_cohort(dir: &Path, name: &str, case_start: i64, cases: i64, control_start: i64, controls: i64) {
    let mut body = String::from("person_id,case\n");
    for id in case_start..case_start + cases {
        body.push_str(&format!("{id},1\n"));
    }
    for id in control_start..control_start + controls {
        body.push_str(&format!("{id},0\n"));
    }
    fs::write(dir.join(format!("matched_{name}.csv")), body).expect("write cohort");
}

fn fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    // A00 cases 0..20, controls 100..140.
    write_cohort(dir.path(), "a00", 0, 20, 100, 40);
    // B01 cases overlap A00 cases 10..20 and controls 100..110.
    write_cohort(dir.path(), "b01", 10, 10, 1000, 5);
    let mut b01 = fs::read_to_string(dir.path().join("matched_b01.csv")).expect("read");
    for id in 100..110 {
        b01.push_str(&format!("{id},1\n"));
    }
    fs::write(dir.path().join("matched_b01.csv"), b01).expect("rewrite");
    // C02 shares nobody with A00.
    write_cohort(dir.path(), "c02", 5000, 3, 6000, 3);
    dir
}

#[test]
fn builds_suppresses_and_persists_tables() {
    let dir = fixture();
    let provider = CsvDirProvider::new(dir.path());
    let codes = provider.discover_codes().expect("discover");
    assert_eq!(codes, vec![code("A00"), code("B01"), code("C02")]);

    let index = load_outcome_index(&provider, &codes).expect("index");
    let output = build_full_table(&provider, &codes, &codes, &index, RunOptions { threads: 2 })
        .expect("build");
    assert!(output.is_complete());
    assert_eq!(output.table.len(), 6);

    let a_to_b = output
        .table
        .iter()
        .find(|r| r.key().to_string() == "A00->B01")
        .copied()
        .expect("A00->B01");
    assert_eq!((a_to_b.ct00, a_to_b.ct01, a_to_b.ct10, a_to_b.ct11), (30, 10, 10, 10));

    let a_to_c = output
        .table
        .iter()
        .find(|r| r.key().to_string() == "A00->C02")
        .copied()
        .expect("A00->C02");
    assert_eq!((a_to_c.ct00, a_to_c.ct01, a_to_c.ct10, a_to_c.ct11), (40, 0, 20, 0));

    let final_edges = SuppressionFilter::default().apply(&output.table).expect("suppress");
    assert_eq!(final_edges.len(), 1);
    assert_eq!(final_edges.edges()[0].key().to_string(), "A00->B01");

    let csv_path = dir.path().join("final.csv");
    final_edges
        .write_csv(fs::File::create(&csv_path).expect("create"), WeightField::LogRr)
        .expect("write");
    let back = FinalEdgeTable::read_csv(fs::File::open(&csv_path).expect("open"), "final.csv")
        .expect("read back");
    assert_eq!(back.len(), 1);
    assert!((back.edges()[0].rr - final_edges.edges()[0].rr).abs() < 1e-12);

    let json_path = dir.path().join("edges.json");
    comorbnet_core::table::write_edge_persons_json(
        fs::File::create(&json_path).expect("create"),
        &output.edge_persons,
    )
    .expect("write json");
    let sets = read_edge_persons_json(fs::File::open(&json_path).expect("open")).expect("read");
    let a_b = sets
        .iter()
        .find(|s| s.key.to_string() == "A00->B01")
        .expect("A00->B01 persons");
    assert_eq!(a_b.persons, (10..20).collect::<Vec<i64>>());
}

#[test]
fn missing_cause_file_is_reported_as_data_missing() {
    let dir = fixture();
    let provider = CsvDirProvider::new(dir.path());
    let outcomes = [code("A00"), code("B01")];
    let index = load_outcome_index(&provider, &outcomes).expect("index");

    let output = build_full_table(
        &provider,
        &[code("A00"), code("Z99")],
        &outcomes,
        &index,
        RunOptions::default(),
    )
    .expect("run");

    let failed: Vec<_> = output.failed_units().collect();
    assert_eq!(failed.len(), 1);
    assert!(matches!(
        failed[0].status,
        UnitStatus::Failed {
            kind: FailureKind::DataMissing,
            ..
        }
    ));
}

#[test]
fn baseline_plus_observed_delta_reproduces_full_counts() {
    let dir = fixture();
    let provider = CsvDirProvider::new(dir.path());
    let codes = provider.discover_codes().expect("discover");
    let index = load_outcome_index(&provider, &codes).expect("index");

    let baseline = build_baseline_table(&provider, &codes, &codes, RunOptions::default())
        .expect("baseline")
        .table;
    let full = build_full_table(&provider, &codes, &codes, &index, RunOptions::default())
        .expect("full")
        .table;

    // Every outcome event is "new" relative to the baseline.
    let merged: FullContingencyTable = merge_follow_up(&baseline, &full).expect("merge");
    assert_eq!(merged, full);
}

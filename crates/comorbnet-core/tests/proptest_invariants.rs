use comorbnet_core::contingency::build_contingency;
use comorbnet_core::merge::merge_follow_up;
use comorbnet_core::{DiseaseCode, SuppressionFilter};
use proptest::prelude::*;

use generators::*;

fn outcome_codes() -> Vec<DiseaseCode> {
    ["B01", "C02", "D03", "A00"].into_iter().map(code).collect()
}

fn cohort_and_index() -> impl Strategy<Value = (comorbnet_core::Cohort, comorbnet_core::OutcomeIndex)> {
    (arb_cohort(code("A00")), arb_outcome_index(outcome_codes()))
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(512))]

    #[test]
    fn every_row_accounts_for_the_whole_cohort((cohort, index) in cohort_and_index()) {
        let result = build_contingency(&cohort, &outcome_codes(), &index).expect("build");
        prop_assert_eq!(result.rows.len(), 3);
        for row in &result.rows {
            prop_assert_eq!(row.total(), cohort.len());
            prop_assert_eq!(row.cases(), cohort.case_count());
            prop_assert_eq!(row.controls(), cohort.control_count());
        }
        for set in &result.edge_persons {
            let row = result.rows.iter().find(|r| r.key() == set.key).expect("row for set");
            prop_assert_eq!(set.persons.len() as u64, row.ct11);
            prop_assert!(!set.persons.is_empty());
        }
    }

    #[test]
    fn merge_preserves_case_and_control_totals(
        (previous, delta) in arb_full_table()
            .prop_flat_map(|t| { let d = arb_feasible_delta(&t); (Just(t), d) })
    ) {
        let merged = merge_follow_up(&previous, &delta).expect("feasible delta");
        for (old, new) in previous.iter().zip(merged.iter()) {
            prop_assert_eq!(old.key(), new.key());
            prop_assert_eq!(old.controls(), new.controls());
            prop_assert_eq!(old.cases(), new.cases());
        }
    }

    #[test]
    fn suppression_is_idempotent(table in arb_full_table(), threshold in 0u64..30) {
        let filter = SuppressionFilter::new(threshold);
        let once = filter.filter_rows(&table).expect("once");
        let twice = filter.filter_rows(&once).expect("twice");
        prop_assert_eq!(&once, &twice);
        prop_assert!(once.iter().all(|r| r.min_cell() >= threshold));
    }
}

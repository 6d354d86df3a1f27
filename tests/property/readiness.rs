use chrono::Utc;
use proptest::prelude::*;
use readygate::model::ReadinessRecord;
use readygate::readiness::{assess_task, fold_readiness};
use readygate::types::ReadinessStatus;
use readygate_test_utils::builders::{project_store, RfiBuilder, TaskBuilder};

use crate::PROJECT;

fn record(i: usize, blockers: usize, warnings: usize) -> ReadinessRecord {
    ReadinessRecord {
        task_id: format!("t{i}"),
        project_id: PROJECT.to_string(),
        work_package_id: Some("wp-1".to_string()),
        readiness_status: ReadinessStatus::from_counts(blockers, warnings),
        blocker_count: blockers,
        warning_count: warnings,
        drivers: Vec::new(),
        evaluated_at: Utc::now(),
    }
}

proptest! {
    #[test]
    fn not_ready_exactly_when_a_blocker_is_open(blockers in 0usize..4, warnings in 0usize..4) {
        let store = project_store(PROJECT);
        let task = TaskBuilder::erection("t1", PROJECT).build();
        store.insert(&task).unwrap();
        for i in 0..blockers {
            let rfi = RfiBuilder::new(&format!("b{i}"), PROJECT).blocker().links("t1").build();
            store.insert(&rfi).unwrap();
        }
        for i in 0..warnings {
            store.insert(&RfiBuilder::new(&format!("w{i}"), PROJECT).links("t1").build()).unwrap();
        }

        let rec = assess_task(&store, &task, Utc::now()).unwrap();
        prop_assert_eq!(rec.blocker_count, blockers);
        prop_assert_eq!(rec.warning_count, warnings);
        prop_assert_eq!(rec.readiness_status == ReadinessStatus::NotReady, blockers > 0);
        prop_assert_eq!(rec.drivers.len(), blockers + warnings);
    }

    #[test]
    fn rollup_matches_the_verdict_of_its_sums(
        children in proptest::collection::vec((0usize..3, 0usize..3), 0..8),
    ) {
        let records: Vec<ReadinessRecord> = children
            .iter()
            .enumerate()
            .map(|(i, (b, w))| record(i, *b, *w))
            .collect();

        let totals = fold_readiness(records.iter());
        let blockers: usize = children.iter().map(|(b, _)| b).sum();
        let warnings: usize = children.iter().map(|(_, w)| w).sum();

        prop_assert_eq!(totals.blockers, blockers);
        prop_assert_eq!(totals.warnings, warnings);
        prop_assert_eq!(totals.children, children.len());
        prop_assert_eq!(totals.status, ReadinessStatus::from_counts(blockers, warnings));
    }
}

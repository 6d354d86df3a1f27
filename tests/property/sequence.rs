use std::collections::BTreeSet;

use proptest::prelude::*;
use readygate::model::Task;
use readygate::schedule::{plan_shift, push_sequence};
use readygate::store::{MemoryStore, StoreExt};
use readygate_test_utils::builders::{project_store, TaskBuilder};

use crate::PROJECT;

// Distinct sequence numbers, one task each.
fn sequenced_tasks() -> impl Strategy<Value = Vec<Task>> {
    proptest::collection::btree_set(0i64..500, 1..20).prop_map(|numbers: BTreeSet<i64>| {
        numbers
            .into_iter()
            .map(|n| TaskBuilder::erection(&format!("t{n}"), PROJECT).sequence(n).build())
            .collect()
    })
}

fn seeded(tasks: &[Task]) -> MemoryStore {
    let store = project_store(PROJECT);
    for t in tasks {
        store.insert(t).unwrap();
    }
    store
}

fn numbers(store: &MemoryStore) -> Vec<(String, i64)> {
    store
        .all::<Task>(PROJECT)
        .unwrap()
        .into_iter()
        .map(|t| (t.id, t.install_sequence_number))
        .collect()
}

proptest! {
    #[test]
    fn shift_then_unshift_is_identity(
        tasks in sequenced_tasks(),
        threshold in 0i64..500,
        delta in 1i64..50,
    ) {
        let store = seeded(&tasks);
        let before = numbers(&store);

        push_sequence(&store, PROJECT, threshold, delta).unwrap();
        for ((id, old), (_, new)) in before.iter().zip(numbers(&store)) {
            let expected = if *old >= threshold { old + delta } else { *old };
            prop_assert_eq!(new, expected, "task {}", id);
        }

        push_sequence(&store, PROJECT, threshold, -delta).unwrap();

        prop_assert_eq!(numbers(&store), before);
    }

    #[test]
    fn forward_shift_keeps_order_and_uniqueness(
        tasks in sequenced_tasks(),
        threshold in 0i64..500,
        delta in 1i64..50,
    ) {
        let plan = plan_shift(&tasks, threshold, delta).unwrap();

        let mut after: Vec<(i64, i64)> = tasks
            .iter()
            .map(|t| {
                let new = plan
                    .iter()
                    .find(|(id, _)| *id == t.id)
                    .map(|(_, n)| *n)
                    .unwrap_or(t.install_sequence_number);
                (t.install_sequence_number, new)
            })
            .collect();
        after.sort();

        for pair in after.windows(2) {
            prop_assert!(pair[0].1 < pair[1].1, "order broken: {:?}", pair);
        }
        for t in tasks.iter().filter(|t| t.install_sequence_number < threshold) {
            prop_assert!(plan.iter().all(|(id, _)| *id != t.id));
        }
    }
}

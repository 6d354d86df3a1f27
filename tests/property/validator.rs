use proptest::prelude::*;
use readygate::dag::{validate_edge, validate_project_graph};
use readygate::errors::GateError;
use readygate::model::Task;
use readygate_test_utils::builders::TaskBuilder;

use crate::PROJECT;

fn id(i: usize) -> String {
    format!("task_{i}")
}

// Acyclic by construction: task i may only depend on tasks 0..i.
fn acyclic_tasks(max_tasks: usize) -> impl Strategy<Value = (Vec<Task>, Vec<(usize, usize)>)> {
    (2..=max_tasks).prop_flat_map(|n| {
        proptest::collection::vec((1..n, any::<usize>()), 1..(n * 2)).prop_map(move |raw| {
            let edges: Vec<(usize, usize)> = raw.into_iter().map(|(i, j)| (i, j % i)).collect();
            let tasks = (0..n)
                .map(|i| {
                    edges
                        .iter()
                        .filter(|(from, _)| *from == i)
                        .fold(TaskBuilder::erection(&id(i), PROJECT), |b, (_, to)| {
                            b.predecessor(&id(*to))
                        })
                        .build()
                })
                .collect();
            (tasks, edges)
        })
    })
}

proptest! {
    #[test]
    fn forward_edges_are_always_accepted(
        (tasks, _) in acyclic_tasks(10),
        pick in any::<(usize, usize)>(),
    ) {
        prop_assert!(validate_project_graph(&tasks).is_ok());

        let i = 1 + pick.0 % (tasks.len() - 1);
        let j = pick.1 % i;
        prop_assert!(validate_edge(&id(i), &id(j), &tasks).is_ok());
    }

    #[test]
    fn reversing_an_existing_edge_is_a_cycle(
        (tasks, edges) in acyclic_tasks(10),
        pick in any::<usize>(),
    ) {
        let (from, to) = edges[pick % edges.len()];
        let err = validate_edge(&id(to), &id(from), &tasks).unwrap_err();
        match err {
            GateError::DagCycle { path } => {
                prop_assert!(path.contains(&id(from)));
                prop_assert!(path.contains(&id(to)));
            }
            other => prop_assert!(false, "expected a cycle, got {other:?}"),
        }
    }
}

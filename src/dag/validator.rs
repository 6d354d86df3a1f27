// src/dag/validator.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::graph::PredecessorGraph;
use crate::errors::{GateError, Result};
use crate::model::Task;

/// Check whether `task_id` may take `proposed_predecessor_id` as a
/// predecessor, given every task in the project.
///
/// Pure guard: nothing is mutated. A self-edge is rejected without
/// traversal. Otherwise a depth-first search runs from the proposed
/// predecessor along existing predecessor edges looking for `task_id`; if it
/// is reachable the new edge would close a cycle and the path found is
/// returned in [`GateError::DagCycle`], starting at the proposed predecessor
/// and ending at `task_id`.
pub fn validate_edge(
    task_id: &str,
    proposed_predecessor_id: &str,
    all_tasks: &[Task],
) -> Result<()> {
    if task_id.trim().is_empty() || proposed_predecessor_id.trim().is_empty() {
        return Err(GateError::Validation(
            "task id and predecessor id are required".to_string(),
        ));
    }

    if task_id == proposed_predecessor_id {
        return Err(GateError::SelfPredecessor(task_id.to_string()));
    }

    let graph = PredecessorGraph::from_tasks(all_tasks);

    if !graph.contains(task_id) {
        return Err(GateError::Validation(format!(
            "task '{task_id}' is not part of this project"
        )));
    }
    if !graph.contains(proposed_predecessor_id) {
        return Err(GateError::Validation(format!(
            "unknown predecessor '{proposed_predecessor_id}' for task '{task_id}'"
        )));
    }

    if let Some(path) = graph.find_predecessor_path(proposed_predecessor_id, task_id) {
        debug!(
            task = %task_id,
            predecessor = %proposed_predecessor_id,
            ?path,
            "rejecting predecessor edge: would close a cycle"
        );
        return Err(GateError::DagCycle { path });
    }

    Ok(())
}

/// Check a whole project's persisted predecessor graph.
///
/// Rejects self-edges, edges to unknown tasks and cycles. On a cycle the
/// error carries one cycle path, closed on the task the sort stopped at.
pub fn validate_project_graph(tasks: &[Task]) -> Result<()> {
    let graph = PredecessorGraph::from_tasks(tasks);

    for task in tasks {
        for pred in task.predecessor_ids.iter() {
            if pred == &task.id {
                return Err(GateError::SelfPredecessor(task.id.clone()));
            }
            if !graph.contains(pred) {
                return Err(GateError::Validation(format!(
                    "task '{}' has unknown predecessor '{}'",
                    task.id, pred
                )));
            }
        }
    }

    // Edge direction: predecessor -> task.
    let mut digraph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for task in tasks {
        digraph.add_node(task.id.as_str());
    }
    for task in tasks {
        for pred in task.predecessor_ids.iter() {
            digraph.add_edge(pred.as_str(), task.id.as_str(), ());
        }
    }

    match toposort(&digraph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            let path = graph
                .predecessors_of(node)
                .iter()
                .find_map(|pred| graph.find_predecessor_path(pred, node))
                .map(|tail| {
                    let mut path = vec![node.to_string()];
                    path.extend(tail);
                    path
                })
                .unwrap_or_else(|| vec![node.to_string()]);
            Err(GateError::DagCycle { path })
        }
    }
}

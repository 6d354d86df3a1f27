// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use crate::model::Task;

/// Predecessor adjacency of a project's tasks, keyed by task id.
///
/// Built from plain records so cycle detection never depends on the storage
/// backend. Edges pointing at unknown tasks are kept; those tasks have no
/// entry of their own.
#[derive(Debug, Clone, Default)]
pub struct PredecessorGraph {
    predecessors: HashMap<String, Vec<String>>,
}

impl PredecessorGraph {
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let predecessors = tasks
            .into_iter()
            .map(|task| (task.id.clone(), task.predecessor_ids.iter().cloned().collect()))
            .collect::<HashMap<String, Vec<String>>>();
        Self { predecessors }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.predecessors.contains_key(id)
    }

    pub fn predecessors_of(&self, id: &str) -> &[String] {
        self.predecessors
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Depth-first search from `start` along predecessor edges.
    ///
    /// Returns the path `start -> ... -> target` if `target` is reachable.
    pub fn find_predecessor_path(&self, start: &str, target: &str) -> Option<Vec<String>> {
        let mut stack: Vec<String> = vec![start.to_string()];
        let mut visited: HashSet<String> = HashSet::new();
        let mut parent: HashMap<String, String> = HashMap::new();

        while let Some(node) = stack.pop() {
            if node == target {
                let mut path = vec![node.clone()];
                let mut cursor = node;
                while let Some(prev) = parent.get(&cursor) {
                    path.push(prev.clone());
                    cursor = prev.clone();
                }
                path.reverse();
                return Some(path);
            }

            if !visited.insert(node.clone()) {
                continue;
            }

            for pred in self.predecessors_of(&node) {
                if !visited.contains(pred) {
                    parent.entry(pred.clone()).or_insert_with(|| node.clone());
                    stack.push(pred.clone());
                }
            }
        }

        None
    }
}

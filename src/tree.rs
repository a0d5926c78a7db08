//! The schedule tree: prepared treatment steps arranged for evaluation.
//!
//! The tree is a flat arena of nodes. Node 0 is a processor-less root;
//! every other node wraps one prepared [`TreatmentProcessor`] and each
//! outgoing edge is one alternative continuation. Children are kept in
//! declaration order, which is what makes the order of produced schedules
//! deterministic.

use tracing::debug;

use crate::error::StepFailure;
use crate::payload::{Branchable, SimulationPayload};
use crate::processor::TreatmentProcessor;

/// Index of a node in the schedule tree arena.
pub type NodeId = usize;

struct TreeNode<U> {
    processor: Option<TreatmentProcessor<U>>,
    children: Vec<NodeId>,
}

/// A tree of prepared treatment processors.
pub struct ScheduleTree<U> {
    nodes: Vec<TreeNode<U>>,
}

impl<U> Default for ScheduleTree<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U> ScheduleTree<U> {
    /// The root node: no processor, evaluation starts here.
    pub const ROOT: NodeId = 0;

    /// Creates a tree holding only the root node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![TreeNode {
                processor: None,
                children: Vec::new(),
            }],
        }
    }

    /// Number of nodes, the root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the tree holds only the root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Appends a node under `parent` and returns its id.
    pub fn add_child(&mut self, parent: NodeId, processor: TreatmentProcessor<U>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(TreeNode {
            processor: Some(processor),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    /// Child ids of `node`, in declaration order.
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node].children
    }

    /// The processor at `node`; `None` only for the root.
    #[must_use]
    pub fn processor(&self, node: NodeId) -> Option<&TreatmentProcessor<U>> {
        self.nodes[node].processor.as_ref()
    }

    /// Enumerates every root-to-leaf chain as node ids, in declared branch
    /// order.
    #[must_use]
    pub fn operation_chains(&self) -> Vec<Vec<NodeId>> {
        self.chains_from(Self::ROOT)
    }

    fn chains_from(&self, node: NodeId) -> Vec<Vec<NodeId>> {
        let children = &self.nodes[node].children;
        if children.is_empty() {
            return vec![vec![node]];
        }
        let mut result = Vec::new();
        for &child in children {
            for mut chain in self.chains_from(child) {
                chain.insert(0, node);
                result.push(chain);
            }
        }
        result
    }
}

impl<U: Branchable + 'static> ScheduleTree<U> {
    /// Depth-first evaluation from the root.
    ///
    /// Applies each node's processor to the payload, duplicating it once
    /// per child at branch points. A prunable failure removes only the
    /// failing subtree; the error is returned only when every path below
    /// the root has failed, carrying the last failure seen.
    ///
    /// # Errors
    ///
    /// The last [`StepFailure`] when no leaf survives, or the first
    /// non-prunable failure encountered anywhere in the walk.
    pub fn evaluate(
        &self,
        payload: SimulationPayload<U>,
    ) -> Result<Vec<SimulationPayload<U>>, StepFailure> {
        self.evaluate_node(Self::ROOT, payload)
    }

    fn evaluate_node(
        &self,
        node: NodeId,
        payload: SimulationPayload<U>,
    ) -> Result<Vec<SimulationPayload<U>>, StepFailure> {
        let current = match &self.nodes[node].processor {
            Some(processor) => processor.process(payload)?,
            None => payload,
        };

        match self.nodes[node].children.as_slice() {
            [] => Ok(vec![current]),
            // A single continuation is not a branch point: no duplication.
            [only] => self.evaluate_node(*only, current),
            children => {
                let mut results = Vec::new();
                let mut last_failure = None;
                for &child in children {
                    match self.evaluate_node(child, current.branch()) {
                        Ok(mut leaves) => results.append(&mut leaves),
                        Err(failure) if failure.is_prunable() => {
                            debug!(%failure, "branch pruned");
                            last_failure = Some(failure);
                        }
                        Err(failure) => return Err(failure),
                    }
                }
                match last_failure {
                    Some(failure) if results.is_empty() => Err(failure),
                    _ => Ok(results),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use crate::collected_data::CollectedData;
    use crate::condition::Condition;
    use crate::payload::Plain;
    use crate::processor::TreatmentFn;
    use crate::time::TimePoint;
    use crate::value::{Parameters, Value};

    type Counter = Plain<i64>;

    fn add(amount: i64) -> TreatmentFn<Counter> {
        Arc::new(move |mut unit: Counter, store, _params| {
            *unit += amount;
            store.store("value", Value::Int(*unit));
            Ok((unit, None))
        })
    }

    fn step(
        name: &str,
        amount: i64,
        time_point: TimePoint,
        preconditions: Vec<Condition<Counter>>,
    ) -> TreatmentProcessor<Counter> {
        TreatmentProcessor::new(
            name,
            add(amount),
            Parameters::new(),
            time_point,
            preconditions,
            vec![],
        )
    }

    fn payload() -> SimulationPayload<Counter> {
        SimulationPayload::new(Plain(0), CollectedData::new(0))
    }

    fn below(limit: i64) -> Condition<Counter> {
        Condition::named(format!("unit below {limit}"), move |_, p| {
            *p.computational_unit < limit
        })
    }

    #[test]
    fn linear_chain_yields_one_leaf() {
        let mut tree = ScheduleTree::new();
        let first = tree.add_child(ScheduleTree::<Counter>::ROOT, step("a", 1, 0, vec![]));
        tree.add_child(first, step("b", 2, 5, vec![]));

        let results = tree.evaluate(payload()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(*results[0].computational_unit, 3);
        assert_eq!(results[0].operation_history.len(), 2);
    }

    #[test]
    fn branch_point_yields_leaf_per_child_in_order() {
        let mut tree = ScheduleTree::new();
        let first = tree.add_child(ScheduleTree::<Counter>::ROOT, step("first", 1, 0, vec![]));
        tree.add_child(first, step("alt_a", 10, 5, vec![]));
        tree.add_child(first, step("alt_b", 20, 5, vec![]));
        tree.add_child(first, step("alt_c", 30, 5, vec![]));

        let results = tree.evaluate(payload()).unwrap();
        let values: Vec<i64> = results.iter().map(|p| *p.computational_unit).collect();
        assert_eq!(values, vec![11, 21, 31]);
    }

    #[test]
    fn failing_branch_is_pruned_and_order_kept() {
        let never = Condition::named("never", |_, _: &SimulationPayload<Counter>| false);

        let mut tree = ScheduleTree::new();
        let first = tree.add_child(ScheduleTree::<Counter>::ROOT, step("first", 1, 0, vec![]));
        tree.add_child(first, step("alt_a", 10, 5, vec![]));
        tree.add_child(first, step("alt_b", 20, 5, vec![never]));
        tree.add_child(first, step("alt_c", 30, 5, vec![]));

        let results = tree.evaluate(payload()).unwrap();
        let values: Vec<i64> = results.iter().map(|p| *p.computational_unit).collect();
        assert_eq!(values, vec![11, 31]);
    }

    #[test]
    fn branches_do_not_observe_each_other() {
        let mut tree = ScheduleTree::new();
        tree.add_child(ScheduleTree::<Counter>::ROOT, step("alt_a", 1, 0, vec![]));
        tree.add_child(ScheduleTree::<Counter>::ROOT, step("alt_b", 1, 0, vec![]));

        let results = tree.evaluate(payload()).unwrap();
        assert_eq!(results.len(), 2);
        // Both started from 0, neither saw the other's increment.
        assert_eq!(*results[0].computational_unit, 1);
        assert_eq!(*results[1].computational_unit, 1);
        assert_eq!(results[0].operation_history.len(), 1);
        assert_eq!(results[1].operation_history.len(), 1);
    }

    #[test]
    fn all_children_failing_fails_the_branch_point() {
        let never = Condition::named("never", |_, _: &SimulationPayload<Counter>| false);

        let mut tree = ScheduleTree::new();
        let first = tree.add_child(ScheduleTree::<Counter>::ROOT, step("first", 1, 0, vec![]));
        tree.add_child(first, step("alt_a", 10, 5, vec![never.clone()]));
        tree.add_child(first, step("alt_b", 20, 5, vec![never]));

        let err = tree.evaluate(payload()).unwrap_err();
        assert!(err.is_guard());
    }

    #[test]
    fn deeper_failure_prunes_only_its_subtree() {
        let stop = below(15);

        let mut tree = ScheduleTree::new();
        let a = tree.add_child(ScheduleTree::<Counter>::ROOT, step("alt_a", 10, 0, vec![]));
        let b = tree.add_child(ScheduleTree::<Counter>::ROOT, step("alt_b", 20, 0, vec![]));
        // Continuation requires the unit to still be below 15.
        tree.add_child(a, step("next", 1, 5, vec![stop.clone()]));
        tree.add_child(b, step("next", 1, 5, vec![stop]));

        let results = tree.evaluate(payload()).unwrap();
        let values: Vec<i64> = results.iter().map(|p| *p.computational_unit).collect();
        assert_eq!(values, vec![11]);
    }

    #[test]
    fn operation_chains_enumerate_in_branch_order() {
        let mut tree: ScheduleTree<Counter> = ScheduleTree::new();
        let first = tree.add_child(ScheduleTree::<Counter>::ROOT, step("first", 1, 0, vec![]));
        let a = tree.add_child(first, step("alt_a", 10, 5, vec![]));
        tree.add_child(first, step("alt_b", 20, 5, vec![]));
        tree.add_child(a, step("tail", 100, 10, vec![]));

        let chains = tree.operation_chains();
        assert_eq!(chains.len(), 2);

        let names: Vec<Vec<&str>> = chains
            .iter()
            .map(|chain| {
                chain
                    .iter()
                    .filter_map(|&id| tree.processor(id))
                    .map(TreatmentProcessor::name)
                    .collect()
            })
            .collect();
        assert_eq!(names[0], vec!["first", "alt_a", "tail"]);
        assert_eq!(names[1], vec!["first", "alt_b"]);
    }

    #[test]
    fn empty_tree_returns_input_unchanged() {
        let tree: ScheduleTree<Counter> = ScheduleTree::new();
        let results = tree.evaluate(payload()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(*results[0].computational_unit, 0);
        assert!(results[0].operation_history.is_empty());
    }
}

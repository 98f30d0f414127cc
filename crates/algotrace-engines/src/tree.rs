//! Binary search tree operations over the arena-backed [`TreeSnapshot`].
//!
//! Nodes keep their [`NodeId`] for life, so the projector can follow a node
//! through a deletion. Deleting a node with two children copies the in-order
//! successor's value into it (a `mutate-value` step) and then removes the
//! successor from the right subtree.

use serde::{Deserialize, Serialize};

use algotrace_core::{
    EngineError, NodeId, Role, Side, Step, StepEvent, Subject, Trace, TraceRecorder, TraceResult,
    TreeSnapshot,
};

use crate::EngineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "kebab-case")]
pub enum TreeOp {
    Insert(i64),
    Search(i64),
    Delete(i64),
    InOrder,
    PreOrder,
    PostOrder,
}

impl TreeOp {
    pub fn name(self) -> &'static str {
        match self {
            TreeOp::Insert(_) => "insert",
            TreeOp::Search(_) => "search",
            TreeOp::Delete(_) => "delete",
            TreeOp::InOrder => "in_order",
            TreeOp::PreOrder => "pre_order",
            TreeOp::PostOrder => "post_order",
        }
    }
}

/// Applies one operation to a copy of `state`.
pub fn tree_op(
    state: &TreeSnapshot,
    op: TreeOp,
    config: &EngineConfig,
) -> Result<Trace, EngineError> {
    let mut t = TreeTracer {
        tree: state.clone(),
        rec: TraceRecorder::new(config.capture_snapshots),
    };

    let result = match op {
        TreeOp::Insert(value) => {
            if t.tree.contains(value) {
                return Err(EngineError::DuplicateValue { value });
            }
            t.insert(value)?;
            t.container(None)
        }
        TreeOp::Search(value) => match t.descend(value)? {
            Probe::Hit(node) => {
                t.set_role(Role::Found, node, format!("Found {}", value));
                TraceResult::NodeFound { node }
            }
            Probe::Miss { .. } => {
                t.not_found(value);
                TraceResult::NotFound
            }
        },
        TreeOp::Delete(value) => match t.descend(value)? {
            Probe::Hit(node) => {
                t.delete(node)?;
                t.container(Some(value))
            }
            Probe::Miss { .. } => {
                t.not_found(value);
                t.container(None)
            }
        },
        TreeOp::InOrder | TreeOp::PreOrder | TreeOp::PostOrder => {
            let mut order = Vec::with_capacity(t.tree.len());
            let root = t.tree.root();
            t.traverse(op, root, &mut order)?;
            TraceResult::Traversal(order)
        }
    };
    Ok(t.rec.finish(result))
}

/// Where a descent toward a value ended.
enum Probe {
    Hit(NodeId),
    /// The empty link where the value would hang.
    Miss { parent: Option<NodeId>, side: Side },
}

struct TreeTracer {
    tree: TreeSnapshot,
    rec: TraceRecorder,
}

impl TreeTracer {
    fn push(&mut self, step: Step) {
        self.rec.record(step, &self.tree);
    }

    fn visit(&mut self, node: NodeId, description: String) {
        self.push(
            Step::new(StepEvent::VisitNode { node }, description).with_subject(Subject::Node(node)),
        );
    }

    fn set_role(&mut self, role: Role, node: NodeId, description: String) {
        self.push(
            Step::new(StepEvent::SetRole { role }, description).with_subject(Subject::Node(node)),
        );
    }

    fn not_found(&mut self, value: i64) {
        self.push(Step::new(
            StepEvent::NotFound,
            format!("{} is not in the tree", value),
        ));
    }

    fn container(&self, value: Option<i64>) -> TraceResult {
        TraceResult::Container {
            snapshot: self.tree.clone().into(),
            value,
        }
    }

    /// Walks from the root toward `value`, visiting every node on the path.
    fn descend(&mut self, value: i64) -> Result<Probe, EngineError> {
        let mut parent = None;
        let mut side = Side::Left;
        let mut cursor = self.tree.root();
        while let Some(id) = cursor {
            let node = self.tree.expect_node(id)?;
            let (node_value, left, right) = (node.value, node.left, node.right);
            if value == node_value {
                self.visit(id, format!("{} equals node {}", value, node_value));
                return Ok(Probe::Hit(id));
            }
            parent = Some(id);
            if value < node_value {
                self.visit(id, format!("{} < {}, go left", value, node_value));
                side = Side::Left;
                cursor = left;
            } else {
                self.visit(id, format!("{} > {}, go right", value, node_value));
                side = Side::Right;
                cursor = right;
            }
        }
        Ok(Probe::Miss { parent, side })
    }

    fn insert(&mut self, value: i64) -> Result<NodeId, EngineError> {
        let (parent, side) = match self.descend(value)? {
            Probe::Miss { parent, side } => (parent, side),
            Probe::Hit(_) => return Err(EngineError::DuplicateValue { value }),
        };
        let id = self.tree.attach(parent, side, value)?;
        let description = match (parent, side) {
            (None, _) => format!("Insert {} as the root", value),
            (Some(p), Side::Left) => format!("Insert {} as the left child of node {}", value, p),
            (Some(p), Side::Right) => format!("Insert {} as the right child of node {}", value, p),
        };
        self.push(
            Step::new(
                StepEvent::Insert {
                    position: id.0 as usize,
                    value,
                },
                description,
            )
            .with_subject(Subject::Node(id)),
        );
        Ok(id)
    }

    fn delete(&mut self, id: NodeId) -> Result<(), EngineError> {
        let node = self.tree.expect_node(id)?;
        let (value, left, right) = (node.value, node.left, node.right);

        let right = match (left, right) {
            (Some(_), Some(right)) => right,
            _ => {
                let removed = self.tree.splice_out(id)?;
                self.push(
                    Step::new(
                        StepEvent::Remove {
                            position: id.0 as usize,
                            value: removed.value,
                        },
                        format!("Remove node {} ({})", id, removed.value),
                    )
                    .with_subject(Subject::Node(id)),
                );
                return Ok(());
            }
        };

        // Two children: the successor is the minimum of the right subtree.
        let mut successor = right;
        self.visit(
            successor,
            "Look for the in-order successor in the right subtree".to_string(),
        );
        while let Some(next) = self.tree.expect_node(successor)?.left {
            successor = next;
            self.visit(successor, "Move left toward the minimum".to_string());
        }
        let successor_value = self.tree.expect_node(successor)?.value;
        self.set_role(
            Role::Min,
            successor,
            format!("In-order successor is {}", successor_value),
        );

        let old = self.tree.set_value(id, successor_value)?;
        self.push(
            Step::new(
                StepEvent::MutateValue {
                    position: id.0 as usize,
                    old,
                    new: successor_value,
                },
                format!("Replace {} with successor {}", value, successor_value),
            )
            .with_subject(Subject::Node(id))
            .with_subject(Subject::Node(successor)),
        );
        self.delete(successor)
    }

    fn traverse(
        &mut self,
        op: TreeOp,
        node: Option<NodeId>,
        order: &mut Vec<NodeId>,
    ) -> Result<(), EngineError> {
        let Some(id) = node else {
            return Ok(());
        };
        let n = self.tree.expect_node(id)?;
        let (value, left, right) = (n.value, n.left, n.right);
        if op == TreeOp::PreOrder {
            order.push(id);
            self.visit(id, format!("Visit {}", value));
        }
        self.traverse(op, left, order)?;
        if op == TreeOp::InOrder {
            order.push(id);
            self.visit(id, format!("Visit {}", value));
        }
        self.traverse(op, right, order)?;
        if op == TreeOp::PostOrder {
            order.push(id);
            self.visit(id, format!("Visit {}", value));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use algotrace_core::{Snapshot, StepKind};

    fn sample() -> TreeSnapshot {
        TreeSnapshot::from_values(&[50, 30, 70, 20, 40, 60, 80]).unwrap()
    }

    fn run(tree: &TreeSnapshot, op: TreeOp) -> Trace {
        tree_op(tree, op, &EngineConfig::default()).unwrap()
    }

    fn resulting_tree(trace: &Trace) -> TreeSnapshot {
        match trace.result() {
            TraceResult::Container {
                snapshot: Snapshot::Tree(tree),
                ..
            } => tree.clone(),
            other => panic!("expected tree container, got {:?}", other),
        }
    }

    fn values(tree: &TreeSnapshot, order: &[NodeId]) -> Vec<i64> {
        order
            .iter()
            .map(|&id| tree.node(id).unwrap().value)
            .collect()
    }

    #[test]
    fn insert_keeps_ordering() {
        let tree = sample();
        let after = resulting_tree(&run(&tree, TreeOp::Insert(45)));
        assert!(after.is_valid_bst());
        assert_eq!(after.in_order_values(), vec![20, 30, 40, 45, 50, 60, 70, 80]);
        assert_eq!(tree.len(), 7);
    }

    #[test]
    fn insert_into_empty_tree_makes_root() {
        let after = resulting_tree(&run(&TreeSnapshot::new(), TreeOp::Insert(1)));
        assert_eq!(after.root(), Some(NodeId(0)));
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let err = tree_op(&sample(), TreeOp::Insert(40), &EngineConfig::default()).unwrap_err();
        assert_eq!(err, EngineError::DuplicateValue { value: 40 });
    }

    #[test]
    fn search_hits_and_misses() {
        let tree = sample();
        let trace = run(&tree, TreeOp::Search(60));
        assert_eq!(trace.result(), &TraceResult::NodeFound { node: tree.find(60).unwrap() });
        // root, 70, 60
        let visits = trace.steps().iter().filter(|s| s.kind() == StepKind::Visit).count();
        assert_eq!(visits, 3);

        let trace = run(&tree, TreeOp::Search(65));
        assert_eq!(trace.result(), &TraceResult::NotFound);
    }

    #[test]
    fn delete_leaf_and_single_child() {
        let tree = sample();
        let after = resulting_tree(&run(&tree, TreeOp::Delete(20)));
        assert_eq!(after.in_order_values(), vec![30, 40, 50, 60, 70, 80]);

        let after = resulting_tree(&run(&after, TreeOp::Delete(30)));
        assert_eq!(after.in_order_values(), vec![40, 50, 60, 70, 80]);
        assert!(after.is_valid_bst());
    }

    #[test]
    fn delete_with_two_children_uses_successor() {
        let tree = sample();
        let root = tree.root().unwrap();
        let trace = run(&tree, TreeOp::Delete(50));
        let mutate = trace
            .steps()
            .iter()
            .find_map(|s| match s.event {
                StepEvent::MutateValue { position, old, new } => Some((position, old, new)),
                _ => None,
            })
            .unwrap();
        assert_eq!(mutate, (root.0 as usize, 50, 60));

        let after = resulting_tree(&trace);
        assert_eq!(after.root(), Some(root));
        assert_eq!(after.node(root).unwrap().value, 60);
        assert!(!after.contains(50));
        assert_eq!(after.in_order_values(), vec![20, 30, 40, 60, 70, 80]);
        assert_eq!(after.len(), 6);
    }

    #[test]
    fn delete_absent_value_leaves_tree_unchanged() {
        let tree = sample();
        let trace = run(&tree, TreeOp::Delete(99));
        assert_eq!(resulting_tree(&trace), tree);
        assert_eq!(trace.steps()[trace.len() - 2].kind(), StepKind::NotFound);
    }

    #[test]
    fn traversal_orders() {
        let tree = sample();
        let cases = [
            (TreeOp::InOrder, vec![20, 30, 40, 50, 60, 70, 80]),
            (TreeOp::PreOrder, vec![50, 30, 20, 40, 70, 60, 80]),
            (TreeOp::PostOrder, vec![20, 40, 30, 60, 80, 70, 50]),
        ];
        for (op, expected) in cases {
            match run(&tree, op).result() {
                TraceResult::Traversal(order) => assert_eq!(values(&tree, order), expected),
                other => panic!("expected traversal, got {:?}", other),
            }
        }
        let empty = run(&TreeSnapshot::new(), TreeOp::InOrder);
        assert_eq!(empty.result(), &TraceResult::Traversal(vec![]));
    }
}

//! Instrumented algorithm engines.
//!
//! Each family module exposes a pure function that takes an initial snapshot
//! plus parameters and returns a complete [`Trace`]. Engines run to completion
//! synchronously, never touch I/O or timers, and never mutate their input:
//! they clone it before the first step. The same request always produces the
//! same trace, descriptions included.
//!
//! [`run_algorithm`] is the single entry point used by callers that hold an
//! [`AlgorithmRequest`] value; the per-family functions are public as well.

pub mod graph;
pub mod linear;
pub mod recursion;
pub mod searching;
pub mod sorting;
pub mod tree;
pub mod verify;

use serde::{Deserialize, Serialize};

use algotrace_core::{
    ArraySnapshot, EngineError, GraphSnapshot, NodeId, QueueSnapshot, StackSnapshot, Trace,
    TreeSnapshot,
};

pub use graph::{traverse_graph, GraphTraversal};
pub use linear::{queue_op, stack_op, QueueOp, StackOp};
pub use recursion::{recurse, RecursiveProcedure};
pub use searching::{search, SearchAlgorithm};
pub use sorting::{sort, SortAlgorithm};
pub use tree::{tree_op, TreeOp};

/// Engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Attach a deep copy of the container state to every step.
    pub capture_snapshots: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            capture_snapshots: true,
        }
    }
}

/// One algorithm invocation: family, initial state and parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "kebab-case")]
pub enum AlgorithmRequest {
    Sort {
        algorithm: SortAlgorithm,
        input: ArraySnapshot,
    },
    Search {
        algorithm: SearchAlgorithm,
        input: ArraySnapshot,
        target: i64,
    },
    Recursion {
        procedure: RecursiveProcedure,
    },
    Stack {
        state: StackSnapshot,
        op: StackOp,
    },
    Queue {
        state: QueueSnapshot,
        op: QueueOp,
    },
    Tree {
        state: TreeSnapshot,
        op: TreeOp,
    },
    Graph {
        state: GraphSnapshot,
        traversal: GraphTraversal,
        start: NodeId,
    },
}

impl AlgorithmRequest {
    /// Short label for logs.
    pub fn label(&self) -> String {
        match self {
            AlgorithmRequest::Sort { algorithm, .. } => algorithm.to_string(),
            AlgorithmRequest::Search { algorithm, .. } => algorithm.to_string(),
            AlgorithmRequest::Recursion { procedure } => procedure.name().to_string(),
            AlgorithmRequest::Stack { op, .. } => format!("stack {}", op.name()),
            AlgorithmRequest::Queue { op, .. } => format!("queue {}", op.name()),
            AlgorithmRequest::Tree { op, .. } => format!("tree {}", op.name()),
            AlgorithmRequest::Graph { traversal, .. } => traversal.to_string(),
        }
    }
}

/// Runs a request to completion and returns its trace.
///
/// Input errors abort before any step is recorded. Capacity failures of
/// stack and queue operations are not errors here: they come back inside
/// the trace as a fault result.
pub fn run_algorithm(
    request: &AlgorithmRequest,
    config: &EngineConfig,
) -> Result<Trace, EngineError> {
    tracing::debug!(algorithm = %request.label(), "running engine");
    let trace = match request {
        AlgorithmRequest::Sort { algorithm, input } => sort(*algorithm, input, config),
        AlgorithmRequest::Search {
            algorithm,
            input,
            target,
        } => search(*algorithm, input, *target, config),
        AlgorithmRequest::Recursion { procedure } => recurse(procedure, config),
        AlgorithmRequest::Stack { state, op } => stack_op(state, *op, config),
        AlgorithmRequest::Queue { state, op } => queue_op(state, *op, config),
        AlgorithmRequest::Tree { state, op } => tree_op(state, *op, config),
        AlgorithmRequest::Graph {
            state,
            traversal,
            start,
        } => traverse_graph(state, *traversal, *start, config),
    };
    match &trace {
        Ok(t) => tracing::debug!(steps = t.len(), result = %t.result().summary(), "engine finished"),
        Err(e) => tracing::debug!(error = %e, "engine rejected input"),
    }
    trace
}

#[cfg(test)]
mod tests {
    use super::*;
    use algotrace_core::{StepKind, TraceResult};

    #[test]
    fn dispatch_is_deterministic() {
        let request = AlgorithmRequest::Sort {
            algorithm: SortAlgorithm::Quick,
            input: ArraySnapshot::from_values(&[5, 3, 9, 1, 3]),
        };
        let config = EngineConfig::default();
        let a = run_algorithm(&request, &config).unwrap();
        let b = run_algorithm(&request, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn capture_can_be_disabled() {
        let request = AlgorithmRequest::Search {
            algorithm: SearchAlgorithm::Linear,
            input: ArraySnapshot::from_values(&[4, 2, 7]),
            target: 7,
        };
        let trace = run_algorithm(
            &request,
            &EngineConfig {
                capture_snapshots: false,
            },
        )
        .unwrap();
        assert!(trace.steps().iter().all(|s| s.snapshot.is_none()));
        assert_eq!(trace.result(), &TraceResult::Found { index: 2 });
    }

    #[test]
    fn every_family_ends_with_one_final_result() {
        let requests = vec![
            AlgorithmRequest::Recursion {
                procedure: RecursiveProcedure::Factorial { n: 4 },
            },
            AlgorithmRequest::Stack {
                state: StackSnapshot::with_values(2, &[1, 2]).unwrap(),
                op: StackOp::Push(3),
            },
            AlgorithmRequest::Queue {
                state: QueueSnapshot::new(2).unwrap(),
                op: QueueOp::Dequeue,
            },
            AlgorithmRequest::Tree {
                state: TreeSnapshot::from_values(&[5, 3, 8]).unwrap(),
                op: TreeOp::Delete(5),
            },
            AlgorithmRequest::Graph {
                state: GraphSnapshot::from_edges(false, 3, &[(0, 1), (1, 2)]).unwrap(),
                traversal: GraphTraversal::BreadthFirst,
                start: NodeId(0),
            },
        ];
        for request in requests {
            let trace = run_algorithm(&request, &EngineConfig::default()).unwrap();
            let finals = trace
                .steps()
                .iter()
                .filter(|s| s.kind() == StepKind::FinalResult)
                .count();
            assert_eq!(finals, 1, "{}", request.label());
            assert_eq!(
                trace.steps().last().map(|s| s.kind()),
                Some(StepKind::FinalResult)
            );
        }
    }

    #[test]
    fn requests_round_trip_through_json() {
        let request = AlgorithmRequest::Recursion {
            procedure: RecursiveProcedure::Hanoi { disks: 3 },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["family"], "recursion");
        assert_eq!(json["procedure"]["procedure"], "hanoi");
        let back: AlgorithmRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, request);
    }
}

//! Trace recording.
//!
//! An engine runs to completion synchronously and appends a [`Step`] for every
//! state transition to a [`TraceRecorder`]. [`TraceRecorder::finish`] appends
//! the single `final-result` step and seals everything into a [`Trace`], which
//! exposes read-only accessors only. Replay order equals recording order.

use serde::{Deserialize, Serialize};

use crate::call_tree::CallTree;
use crate::error::CapacityError;
use crate::id::NodeId;
use crate::snapshot::{ArraySnapshot, Snapshot};
use crate::step::{HanoiMove, Step, StepEvent, Subject};

/// Terminal value of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceResult {
    /// Sorted array, non-descending.
    Sorted(ArraySnapshot),
    /// Array search hit.
    Found { index: usize },
    /// Tree search hit.
    NodeFound { node: NodeId },
    NotFound,
    /// Computed number (factorial, fibonacci, power).
    Number(i64),
    /// Tower of Hanoi solution in execution order.
    Moves(Vec<HanoiMove>),
    /// Container state after an operation, plus the value it produced (pop/peek).
    Container {
        snapshot: Snapshot,
        value: Option<i64>,
    },
    /// Visiting order of a traversal.
    Traversal(Vec<NodeId>),
    /// The operation failed; `snapshot` is the unchanged container.
    Fault {
        error: CapacityError,
        snapshot: Snapshot,
    },
}

impl TraceResult {
    /// Short label used in final-result descriptions and logs.
    pub fn summary(&self) -> String {
        match self {
            TraceResult::Sorted(a) => format!("sorted {:?}", a.values()),
            TraceResult::Found { index } => format!("found at index {}", index),
            TraceResult::NodeFound { node } => format!("found at node {}", node),
            TraceResult::NotFound => "not found".to_string(),
            TraceResult::Number(n) => format!("result {}", n),
            TraceResult::Moves(moves) => format!("{} moves", moves.len()),
            TraceResult::Container { value: Some(v), .. } => format!("value {}", v),
            TraceResult::Container { value: None, .. } => "done".to_string(),
            TraceResult::Traversal(order) => format!("visited {} vertices", order.len()),
            TraceResult::Fault { error, .. } => error.to_string(),
        }
    }

    /// Subjects the final-result step refers to.
    fn subjects(&self) -> Vec<Subject> {
        match self {
            TraceResult::Sorted(a) => a.ids().into_iter().map(Subject::Element).collect(),
            TraceResult::NodeFound { node } => vec![Subject::Node(*node)],
            TraceResult::Traversal(order) => order.iter().copied().map(Subject::Node).collect(),
            _ => Vec::new(),
        }
    }
}

/// A sealed, append-only record of one algorithm run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    steps: Vec<Step>,
    result: TraceResult,
    calls: Option<CallTree>,
}

impl Trace {
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false for a finished trace: the final-result step is mandatory.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn result(&self) -> &TraceResult {
        &self.result
    }

    /// Activation tree, for recursive procedures only.
    pub fn call_tree(&self) -> Option<&CallTree> {
        self.calls.as_ref()
    }

    /// Latest captured snapshot at or before `index`.
    pub fn snapshot_at(&self, index: usize) -> Option<&Snapshot> {
        let end = index.saturating_add(1).min(self.steps.len());
        self.steps[..end]
            .iter()
            .rev()
            .find_map(|s| s.snapshot.as_ref())
    }
}

/// Append-only builder for a [`Trace`].
#[derive(Debug)]
pub struct TraceRecorder {
    steps: Vec<Step>,
    capture_snapshots: bool,
    calls: Option<CallTree>,
}

impl TraceRecorder {
    pub fn new(capture_snapshots: bool) -> Self {
        TraceRecorder {
            steps: Vec::new(),
            capture_snapshots,
            calls: None,
        }
    }

    /// Records a step, attaching a copy of `state` when capture is enabled.
    pub fn record<S>(&mut self, mut step: Step, state: &S)
    where
        S: Clone + Into<Snapshot>,
    {
        if self.capture_snapshots {
            step.snapshot = Some(state.clone().into());
        }
        self.steps.push(step);
    }

    /// Records a step that has no container state (recursion bookkeeping).
    pub fn record_bare(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Attaches the activation tree built alongside the steps.
    pub fn set_call_tree(&mut self, calls: CallTree) {
        self.calls = Some(calls);
    }

    /// Appends the final-result step and seals the trace.
    pub fn finish(mut self, result: TraceResult) -> Trace {
        let description = format!("Final result: {}", result.summary());
        let mut step = Step::new(
            StepEvent::FinalResult {
                result: result.clone(),
            },
            description,
        )
        .with_subjects(result.subjects());
        if self.capture_snapshots {
            step.snapshot = match &result {
                TraceResult::Sorted(a) => Some(Snapshot::Array(a.clone())),
                TraceResult::Container { snapshot, .. } | TraceResult::Fault { snapshot, .. } => {
                    Some(snapshot.clone())
                }
                _ => None,
            };
        }
        self.steps.push(step);
        Trace {
            steps: self.steps,
            result,
            calls: self.calls,
        }
    }
}

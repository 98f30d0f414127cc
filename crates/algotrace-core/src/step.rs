//! Step events: the atomic, described state transitions of a trace.
//!
//! A [`Step`] pairs a payload-carrying [`StepEvent`] with the identities it
//! concerns ([`Subject`]s), a human-readable description, and optionally a
//! deep copy of the container state right after the event.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::CapacityError;
use crate::id::{CallId, ElementId, NodeId};
use crate::snapshot::Snapshot;
use crate::trace::TraceResult;

/// A reference from a step to the thing it affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    Element(ElementId),
    Node(NodeId),
    Call(CallId),
    /// A fixed container slot (circular queue, stack position).
    Slot(usize),
    /// An array position independent of which element occupies it.
    Index(usize),
}

/// Visual role tag assigned by the projector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    #[default]
    Normal,
    Comparing,
    Swapping,
    Sorted,
    Pivot,
    Min,
    Found,
    Visited,
    Range,
    Front,
    Rear,
    Top,
    Active,
    Completed,
    BaseCase,
}

impl Role {
    /// Roles held by at most one subject at a time.
    pub fn is_exclusive(self) -> bool {
        matches!(
            self,
            Role::Pivot | Role::Min | Role::Front | Role::Rear | Role::Top
        )
    }

    /// Roles that last for a single step only.
    pub fn is_transient(self) -> bool {
        matches!(self, Role::Comparing | Role::Swapping)
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// Another array slot.
    Index(usize),
    /// A literal such as a search target.
    Value(i64),
}

/// Tower of Hanoi rods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rod {
    Source,
    Auxiliary,
    Target,
}

impl fmt::Display for Rod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rod::Source => "source",
            Rod::Auxiliary => "auxiliary",
            Rod::Target => "target",
        };
        f.write_str(name)
    }
}

/// One disk move in a Tower of Hanoi solution. Disk 1 is the smallest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HanoiMove {
    pub disk: u32,
    pub from: Rod,
    pub to: Rod,
}

/// Discriminant of a [`StepEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    Compare,
    Swap,
    Visit,
    MarkRange,
    SetRole,
    MutateValue,
    Insert,
    Remove,
    Call,
    Return,
    BaseCase,
    Move,
    Found,
    NotFound,
    Fault,
    FinalResult,
}

/// The semantic event of a step, with its kind-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StepEvent {
    /// Array slot `index` compared against `with`.
    Compare { index: usize, with: Operand },
    /// Two slots exchanged their elements.
    Swap { first: usize, second: usize },
    /// Array slot inspected without comparison.
    Visit { index: usize },
    /// Tree node or graph vertex reached.
    VisitNode { node: NodeId },
    /// Active search window, inclusive bounds.
    MarkRange { low: usize, high: usize },
    SetRole { role: Role },
    /// A value overwritten in place (tree successor copy).
    MutateValue { position: usize, old: i64, new: i64 },
    Insert { position: usize, value: i64 },
    Remove { position: usize, value: i64 },
    Call {
        call: CallId,
        function: String,
        parameters: Vec<i64>,
        depth: usize,
    },
    Return { call: CallId, value: i64 },
    BaseCase { call: CallId },
    Move(HanoiMove),
    Found { index: usize },
    NotFound,
    /// A container operation failed with a capacity error.
    Fault { error: CapacityError },
    FinalResult { result: TraceResult },
}

impl StepEvent {
    pub fn kind(&self) -> StepKind {
        match self {
            StepEvent::Compare { .. } => StepKind::Compare,
            StepEvent::Swap { .. } => StepKind::Swap,
            StepEvent::Visit { .. } | StepEvent::VisitNode { .. } => StepKind::Visit,
            StepEvent::MarkRange { .. } => StepKind::MarkRange,
            StepEvent::SetRole { .. } => StepKind::SetRole,
            StepEvent::MutateValue { .. } => StepKind::MutateValue,
            StepEvent::Insert { .. } => StepKind::Insert,
            StepEvent::Remove { .. } => StepKind::Remove,
            StepEvent::Call { .. } => StepKind::Call,
            StepEvent::Return { .. } => StepKind::Return,
            StepEvent::BaseCase { .. } => StepKind::BaseCase,
            StepEvent::Move(_) => StepKind::Move,
            StepEvent::Found { .. } => StepKind::Found,
            StepEvent::NotFound => StepKind::NotFound,
            StepEvent::Fault { .. } => StepKind::Fault,
            StepEvent::FinalResult { .. } => StepKind::FinalResult,
        }
    }
}

/// One immutable record in a trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub event: StepEvent,
    pub subjects: SmallVec<[Subject; 2]>,
    pub description: String,
    /// Container state right after this event, when capture is enabled.
    pub snapshot: Option<Snapshot>,
}

impl Step {
    pub fn new(event: StepEvent, description: impl Into<String>) -> Self {
        Step {
            event,
            subjects: SmallVec::new(),
            description: description.into(),
            snapshot: None,
        }
    }

    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subjects.push(subject);
        self
    }

    pub fn with_subjects(mut self, subjects: impl IntoIterator<Item = Subject>) -> Self {
        self.subjects.extend(subjects);
        self
    }

    pub fn kind(&self) -> StepKind {
        self.event.kind()
    }
}

//! Data model for instrumented algorithm runs.
//!
//! Engines build a [`Trace`] of [`Step`]s against value-type [`Snapshot`]s;
//! playback and projection only ever read what the engines produced.

pub mod call_tree;
pub mod error;
pub mod id;
pub mod snapshot;
pub mod step;
pub mod trace;

// Re-export commonly used types
pub use call_tree::{CallNode, CallTree};
pub use error::{CapacityError, EngineError};
pub use id::{CallId, ElementId, NodeId};
pub use snapshot::{
    ArraySnapshot, Element, GraphSnapshot, QueueSnapshot, Side, Snapshot, StackSnapshot,
    TreeNode, TreeSnapshot, Vertex,
};
pub use step::{HanoiMove, Operand, Rod, Role, Step, StepEvent, StepKind, Subject};
pub use trace::{Trace, TraceRecorder, TraceResult};

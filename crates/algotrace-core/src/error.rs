//! Error types shared by the engines and their callers.
//!
//! Uses `thiserror` for structured, matchable error variants. Two families
//! exist and they travel differently:
//!
//! - [`EngineError`] rejects a request before any trace is produced
//!   (missing or malformed input). The engine returns it as `Err`.
//! - [`CapacityError`] is a container failure (overflow/underflow). It is a
//!   legitimate outcome of a run, so it is carried inside the trace result
//!   rather than returned as `Err`.
//!
//! Calling a search that requires sorted input with unsorted data is a caller
//! obligation: it is not detected and yields an unspecified (but non-panicking)
//! result.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::NodeId;

/// Input errors. The run aborts before producing a trace.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum EngineError {
    /// An element is required but the input container is empty.
    #[error("input is empty: {operation} needs at least one element")]
    EmptyInput { operation: String },

    /// A value-taking operation was requested without a value.
    #[error("missing target value for {operation}")]
    MissingTarget { operation: String },

    /// The value is already present in a structure that forbids duplicates.
    #[error("duplicate value {value}: binary search trees hold distinct values")]
    DuplicateValue { value: i64 },

    /// A numeric parameter is outside the range the procedure can represent.
    #[error("{parameter} = {value} is out of range: {reason}")]
    OutOfRange {
        parameter: String,
        value: i64,
        reason: String,
    },

    /// Fixed-capacity containers need room for at least one element.
    #[error("invalid capacity {capacity}: must be at least 1")]
    InvalidCapacity { capacity: usize },

    /// A traversal was started from a vertex that is not in the graph.
    #[error("unknown vertex: NodeId({node})")]
    UnknownVertex { node: NodeId },

    /// A broken internal invariant. Indicates a bug in an engine.
    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Container capacity failures, reported as part of a run's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CapacityError {
    /// Push/enqueue on a full container.
    #[error("overflow: container is full (capacity {capacity})")]
    Overflow { capacity: usize },

    /// Pop/dequeue/peek on an empty container.
    #[error("underflow: container is empty")]
    Underflow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_problem() {
        let err = EngineError::OutOfRange {
            parameter: "n".into(),
            value: 21,
            reason: "factorial overflows i64 above 20".into(),
        };
        assert_eq!(
            err.to_string(),
            "n = 21 is out of range: factorial overflows i64 above 20"
        );
        assert_eq!(
            CapacityError::Overflow { capacity: 4 }.to_string(),
            "overflow: container is full (capacity 4)"
        );
    }
}

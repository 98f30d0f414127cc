//! Fixed-capacity stack and circular queue primitives.
//!
//! Overflow and underflow are legitimate outcomes here, not input errors: the
//! engine records a `fault` step and returns a [`TraceResult::Fault`] carrying
//! the unchanged container, so the caller can show a message instead of
//! failing.

use serde::{Deserialize, Serialize};

use algotrace_core::{
    CapacityError, Element, EngineError, QueueSnapshot, Role, Snapshot, StackSnapshot, Step,
    StepEvent, Subject, Trace, TraceRecorder, TraceResult,
};

use crate::EngineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "kebab-case")]
pub enum StackOp {
    Push(i64),
    Pop,
    Peek,
}

impl StackOp {
    pub fn name(self) -> &'static str {
        match self {
            StackOp::Push(_) => "push",
            StackOp::Pop => "pop",
            StackOp::Peek => "peek",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "kebab-case")]
pub enum QueueOp {
    Enqueue(i64),
    Dequeue,
    PeekFront,
    PeekRear,
}

impl QueueOp {
    pub fn name(self) -> &'static str {
        match self {
            QueueOp::Enqueue(_) => "enqueue",
            QueueOp::Dequeue => "dequeue",
            QueueOp::PeekFront => "peek_front",
            QueueOp::PeekRear => "peek_rear",
        }
    }
}

/// Records the fault step and seals the trace with the untouched container.
fn fault<S>(mut rec: TraceRecorder, state: &S, error: CapacityError, operation: &str) -> Trace
where
    S: Clone + Into<Snapshot>,
{
    rec.record(
        Step::new(
            StepEvent::Fault { error },
            format!("Cannot {}: {}", operation, error),
        ),
        state,
    );
    rec.finish(TraceResult::Fault {
        error,
        snapshot: state.clone().into(),
    })
}

fn role_step(role: Role, element: &Element, description: String) -> Step {
    Step::new(StepEvent::SetRole { role }, description).with_subject(Subject::Element(element.id))
}

/// Applies one stack operation to a copy of `state`.
pub fn stack_op(
    state: &StackSnapshot,
    op: StackOp,
    config: &EngineConfig,
) -> Result<Trace, EngineError> {
    let mut stack = state.clone();
    let mut rec = TraceRecorder::new(config.capture_snapshots);

    let value = match op {
        StackOp::Push(value) => {
            let element = match stack.push(value) {
                Ok(element) => element,
                Err(error) => return Ok(fault(rec, state, error, "push")),
            };
            rec.record(
                Step::new(
                    StepEvent::Insert {
                        position: element.index,
                        value,
                    },
                    format!("Push {} at position {}", value, element.index),
                )
                .with_subject(Subject::Element(element.id))
                .with_subject(Subject::Slot(element.index)),
                &stack,
            );
            rec.record(
                role_step(Role::Top, &element, format!("{} is the new top", value)),
                &stack,
            );
            None
        }
        StackOp::Pop => {
            let element = match stack.pop() {
                Ok(element) => element,
                Err(error) => return Ok(fault(rec, state, error, "pop")),
            };
            rec.record(
                Step::new(
                    StepEvent::Remove {
                        position: element.index,
                        value: element.value,
                    },
                    format!("Pop {} from position {}", element.value, element.index),
                )
                .with_subject(Subject::Element(element.id))
                .with_subject(Subject::Slot(element.index)),
                &stack,
            );
            if let Some(top) = stack.top().copied() {
                rec.record(
                    role_step(Role::Top, &top, format!("{} is the new top", top.value)),
                    &stack,
                );
            }
            Some(element.value)
        }
        StackOp::Peek => {
            let Some(top) = stack.top().copied() else {
                return Ok(fault(rec, state, CapacityError::Underflow, "peek"));
            };
            rec.record(
                role_step(Role::Top, &top, format!("Top of the stack is {}", top.value)),
                &stack,
            );
            rec.record(
                Step::new(
                    StepEvent::Visit { index: top.index },
                    format!("Peek returns {}", top.value),
                )
                .with_subject(Subject::Element(top.id)),
                &stack,
            );
            Some(top.value)
        }
    };

    Ok(rec.finish(TraceResult::Container {
        snapshot: stack.into(),
        value,
    }))
}

/// Applies one queue operation to a copy of `state`.
pub fn queue_op(
    state: &QueueSnapshot,
    op: QueueOp,
    config: &EngineConfig,
) -> Result<Trace, EngineError> {
    let mut queue = state.clone();
    let mut rec = TraceRecorder::new(config.capture_snapshots);

    let value = match op {
        QueueOp::Enqueue(value) => {
            let element = match queue.enqueue(value) {
                Ok(element) => element,
                Err(error) => return Ok(fault(rec, state, error, "enqueue")),
            };
            rec.record(
                Step::new(
                    StepEvent::Insert {
                        position: element.index,
                        value,
                    },
                    format!("Enqueue {} into slot {}", value, element.index),
                )
                .with_subject(Subject::Element(element.id))
                .with_subject(Subject::Slot(element.index)),
                &queue,
            );
            rec.record(
                role_step(Role::Rear, &element, format!("Rear moves to slot {}", element.index)),
                &queue,
            );
            if queue.len() == 1 {
                rec.record(
                    role_step(Role::Front, &element, format!("Front is slot {}", element.index)),
                    &queue,
                );
            }
            None
        }
        QueueOp::Dequeue => {
            let element = match queue.dequeue() {
                Ok(element) => element,
                Err(error) => return Ok(fault(rec, state, error, "dequeue")),
            };
            rec.record(
                Step::new(
                    StepEvent::Remove {
                        position: element.index,
                        value: element.value,
                    },
                    format!("Dequeue {} from slot {}", element.value, element.index),
                )
                .with_subject(Subject::Element(element.id))
                .with_subject(Subject::Slot(element.index)),
                &queue,
            );
            if let Some(front) = queue.front().copied() {
                rec.record(
                    role_step(Role::Front, &front, format!("Front moves to slot {}", front.index)),
                    &queue,
                );
            }
            Some(element.value)
        }
        QueueOp::PeekFront | QueueOp::PeekRear => {
            let (role, end) = match op {
                QueueOp::PeekRear => (Role::Rear, queue.rear().copied()),
                _ => (Role::Front, queue.front().copied()),
            };
            let Some(element) = end else {
                return Ok(fault(rec, state, CapacityError::Underflow, op.name()));
            };
            rec.record(
                role_step(
                    role,
                    &element,
                    format!("{:?} is slot {}", role, element.index),
                ),
                &queue,
            );
            rec.record(
                Step::new(
                    StepEvent::Visit {
                        index: element.index,
                    },
                    format!("Peek returns {}", element.value),
                )
                .with_subject(Subject::Element(element.id)),
                &queue,
            );
            Some(element.value)
        }
    };

    Ok(rec.finish(TraceResult::Container {
        snapshot: queue.into(),
        value,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use algotrace_core::StepKind;

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    fn container(trace: &Trace) -> (&Snapshot, Option<i64>) {
        match trace.result() {
            TraceResult::Container { snapshot, value } => (snapshot, *value),
            other => panic!("expected container result, got {:?}", other),
        }
    }

    #[test]
    fn push_pop_peek() {
        let stack = StackSnapshot::with_values(3, &[1, 2]).unwrap();
        let trace = stack_op(&stack, StackOp::Push(7), &config()).unwrap();
        let (snapshot, value) = container(&trace);
        assert_eq!(value, None);
        let Snapshot::Stack(after) = snapshot else {
            panic!("expected stack")
        };
        assert_eq!(after.top().map(|e| e.value), Some(7));

        let trace = stack_op(&stack, StackOp::Pop, &config()).unwrap();
        assert_eq!(container(&trace).1, Some(2));
        let trace = stack_op(&stack, StackOp::Peek, &config()).unwrap();
        assert_eq!(container(&trace).1, Some(2));
        // input untouched
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn push_on_full_stack_overflows() {
        let stack = StackSnapshot::with_values(2, &[1, 2]).unwrap();
        let trace = stack_op(&stack, StackOp::Push(3), &config()).unwrap();
        assert_eq!(
            trace.result(),
            &TraceResult::Fault {
                error: CapacityError::Overflow { capacity: 2 },
                snapshot: Snapshot::Stack(stack.clone()),
            }
        );
        assert_eq!(trace.steps()[trace.len() - 2].kind(), StepKind::Fault);
    }

    #[test]
    fn empty_stack_underflows() {
        let stack = StackSnapshot::new(2).unwrap();
        for op in [StackOp::Pop, StackOp::Peek] {
            let trace = stack_op(&stack, op, &config()).unwrap();
            assert!(matches!(
                trace.result(),
                TraceResult::Fault {
                    error: CapacityError::Underflow,
                    ..
                }
            ));
        }
    }

    #[test]
    fn queue_fills_and_wraps() {
        let mut queue = QueueSnapshot::new(3).unwrap();
        for v in [10, 20, 30] {
            let trace = queue_op(&queue, QueueOp::Enqueue(v), &config()).unwrap();
            let Snapshot::Queue(next) = container(&trace).0.clone() else {
                panic!("expected queue")
            };
            queue = next;
        }
        assert!(queue.is_full());

        let trace = queue_op(&queue, QueueOp::Enqueue(40), &config()).unwrap();
        assert!(matches!(
            trace.result(),
            TraceResult::Fault {
                error: CapacityError::Overflow { capacity: 3 },
                ..
            }
        ));

        let trace = queue_op(&queue, QueueOp::Dequeue, &config()).unwrap();
        let (snapshot, value) = container(&trace);
        assert_eq!(value, Some(10));
        let Snapshot::Queue(queue) = snapshot.clone() else {
            panic!("expected queue")
        };
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.front_index(), Some(1));

        let trace = queue_op(&queue, QueueOp::Enqueue(40), &config()).unwrap();
        let insert = trace
            .steps()
            .iter()
            .find_map(|s| match s.event {
                StepEvent::Insert { position, .. } => Some(position),
                _ => None,
            })
            .unwrap();
        assert_eq!(insert, 0, "rear wraps to slot 0");
    }

    #[test]
    fn queue_peeks() {
        let queue = QueueSnapshot::with_values(4, &[5, 6, 7]).unwrap();
        let front = queue_op(&queue, QueueOp::PeekFront, &config()).unwrap();
        assert_eq!(container(&front).1, Some(5));
        let rear = queue_op(&queue, QueueOp::PeekRear, &config()).unwrap();
        assert_eq!(container(&rear).1, Some(7));

        let empty = QueueSnapshot::new(1).unwrap();
        for op in [QueueOp::Dequeue, QueueOp::PeekFront, QueueOp::PeekRear] {
            let trace = queue_op(&empty, op, &config()).unwrap();
            assert!(matches!(trace.result(), TraceResult::Fault { .. }));
        }
    }

    #[test]
    fn ops_serialize_adjacently_tagged() {
        let json = serde_json::to_value(StackOp::Push(4)).unwrap();
        assert_eq!(json["op"], "push");
        assert_eq!(json["value"], 4);
        let json = serde_json::to_value(QueueOp::PeekFront).unwrap();
        assert_eq!(json["op"], "peek-front");
    }
}

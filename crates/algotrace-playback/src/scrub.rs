//! Jump-to-step support.

use algotrace_core::{Snapshot, Step, Trace};

use crate::projector::{project_prefix, VisualState};

/// The view of a trace at one step, computed without playback.
#[derive(Debug, Clone)]
pub struct Scrubbed<'a> {
    pub index: usize,
    pub step: &'a Step,
    /// Roles after folding steps `0..=index`.
    pub state: VisualState,
    /// Latest captured container state at or before `index`.
    pub snapshot: Option<&'a Snapshot>,
}

/// Projects `trace` up to and including step `index`. `None` past the end.
pub fn scrub(trace: &Trace, index: usize) -> Option<Scrubbed<'_>> {
    let step = trace.get(index)?;
    Some(Scrubbed {
        index,
        step,
        state: project_prefix(&trace.steps()[..=index]),
        snapshot: trace.snapshot_at(index),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use algotrace_core::{ArraySnapshot, Operand, StepEvent, Subject, TraceRecorder, TraceResult};

    fn trace() -> Trace {
        let array = ArraySnapshot::from_values(&[2, 1]);
        let mut rec = TraceRecorder::new(true);
        rec.record(
            Step::new(
                StepEvent::Compare {
                    index: 0,
                    with: Operand::Index(1),
                },
                "compare",
            )
            .with_subjects([Subject::Element(array.id(0)), Subject::Element(array.id(1))]),
            &array,
        );
        let mut sorted = array.clone();
        sorted.swap(0, 1);
        rec.finish(TraceResult::Sorted(sorted))
    }

    #[test]
    fn scrub_matches_prefix_and_snapshot() {
        let trace = trace();
        let view = scrub(&trace, 0).unwrap();
        assert_eq!(view.state, project_prefix(&trace.steps()[..1]));
        assert_eq!(view.snapshot, trace.steps()[0].snapshot.as_ref());

        let last = scrub(&trace, 1).unwrap();
        assert_eq!(last.state.holders(algotrace_core::Role::Sorted).len(), 2);
        assert!(scrub(&trace, 2).is_none());
    }
}

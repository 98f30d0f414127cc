//! Recursive procedures with an explicit activation tree.
//!
//! Every activation records a `call` step on entry and exactly one `return`
//! step carrying its value; terminal activations additionally record a
//! `base-case` step. The engine recurses on the native call stack, bounded by
//! the input, and never memoizes: naive fibonacci produces one call node per
//! invocation, overlapping subproblems included.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use algotrace_core::{
    ArraySnapshot, CallId, CallTree, ElementId, EngineError, HanoiMove, Operand, Rod, Step,
    StepEvent, Subject, Trace, TraceRecorder, TraceResult,
};

use crate::EngineConfig;

/// Largest `n` whose factorial fits in an `i64`.
pub const MAX_FACTORIAL_N: i64 = 20;
/// Largest `n` whose fibonacci number fits in an `i64`.
pub const MAX_FIBONACCI_N: i64 = 92;
/// Largest disk count whose move count fits in an `i64`.
pub const MAX_HANOI_DISKS: u32 = 63;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "procedure", rename_all = "kebab-case")]
pub enum RecursiveProcedure {
    Factorial { n: i64 },
    Fibonacci { n: i64 },
    Hanoi { disks: u32 },
    BinarySearch { values: Vec<i64>, target: i64 },
    Power { base: i64, exponent: i64 },
}

impl RecursiveProcedure {
    pub fn name(&self) -> &'static str {
        match self {
            RecursiveProcedure::Factorial { .. } => "factorial",
            RecursiveProcedure::Fibonacci { .. } => "fibonacci",
            RecursiveProcedure::Hanoi { .. } => "hanoi",
            RecursiveProcedure::BinarySearch { .. } => "binary_search",
            RecursiveProcedure::Power { .. } => "power",
        }
    }

    /// Rejects inputs whose result cannot be represented.
    fn validate(&self) -> Result<(), EngineError> {
        let out_of_range = |parameter: &str, value: i64, reason: &str| EngineError::OutOfRange {
            parameter: parameter.to_string(),
            value,
            reason: reason.to_string(),
        };
        match self {
            RecursiveProcedure::Factorial { n } if *n < 0 => {
                Err(out_of_range("n", *n, "must be non-negative"))
            }
            RecursiveProcedure::Factorial { n } if *n > MAX_FACTORIAL_N => {
                Err(out_of_range("n", *n, "factorial overflows i64 above 20"))
            }
            RecursiveProcedure::Fibonacci { n } if *n < 0 => {
                Err(out_of_range("n", *n, "must be non-negative"))
            }
            RecursiveProcedure::Fibonacci { n } if *n > MAX_FIBONACCI_N => {
                Err(out_of_range("n", *n, "fibonacci overflows i64 above 92"))
            }
            RecursiveProcedure::Hanoi { disks } if *disks > MAX_HANOI_DISKS => Err(out_of_range(
                "disks",
                *disks as i64,
                "move count overflows i64 above 63 disks",
            )),
            RecursiveProcedure::BinarySearch { values, .. } if values.is_empty() => {
                Err(EngineError::EmptyInput {
                    operation: "recursive binary search".into(),
                })
            }
            RecursiveProcedure::Power { exponent, .. } if *exponent < 0 => {
                Err(out_of_range("exponent", *exponent, "must be non-negative"))
            }
            RecursiveProcedure::Power { base, exponent } => {
                let fits = u32::try_from(*exponent)
                    .ok()
                    .and_then(|e| base.checked_pow(e))
                    .is_some();
                if fits {
                    Ok(())
                } else {
                    Err(out_of_range("exponent", *exponent, "result overflows i64"))
                }
            }
            _ => Ok(()),
        }
    }
}

/// Runs a recursive procedure, building its call tree alongside the trace.
pub fn recurse(
    procedure: &RecursiveProcedure,
    config: &EngineConfig,
) -> Result<Trace, EngineError> {
    procedure.validate()?;

    let mut t = RecursionTracer {
        rec: TraceRecorder::new(config.capture_snapshots),
        calls: CallTree::new(),
        array: None,
        target: 0,
    };

    let result = match procedure {
        RecursiveProcedure::Factorial { n } => TraceResult::Number(factorial(&mut t, None, *n)?),
        RecursiveProcedure::Fibonacci { n } => TraceResult::Number(fibonacci(&mut t, None, *n)?),
        RecursiveProcedure::Power { base, exponent } => {
            TraceResult::Number(power(&mut t, None, *base, *exponent)?)
        }
        RecursiveProcedure::Hanoi { disks } => {
            let mut moves = Vec::new();
            hanoi(
                &mut t,
                None,
                *disks,
                (Rod::Source, Rod::Target, Rod::Auxiliary),
                &mut moves,
            )?;
            TraceResult::Moves(moves)
        }
        RecursiveProcedure::BinarySearch { values, target } => {
            t.array = Some(ArraySnapshot::from_values(values));
            t.target = *target;
            let high = values.len() as i64 - 1;
            let index = binary_search(&mut t, None, 0, high)?;
            match index {
                Some(index) => TraceResult::Found { index },
                None => TraceResult::NotFound,
            }
        }
    };

    let RecursionTracer { mut rec, calls, .. } = t;
    rec.set_call_tree(calls);
    Ok(rec.finish(result))
}

struct RecursionTracer {
    rec: TraceRecorder,
    calls: CallTree,
    /// Present only for procedures that work on an array.
    array: Option<ArraySnapshot>,
    target: i64,
}

impl RecursionTracer {
    fn push(&mut self, step: Step) {
        match &self.array {
            Some(array) => self.rec.record(step, array),
            None => self.rec.record_bare(step),
        }
    }

    fn enter(
        &mut self,
        parent: Option<CallId>,
        function: &str,
        parameters: Vec<i64>,
    ) -> Result<CallId, EngineError> {
        let id = self.calls.enter(parent, function, parameters.clone())?;
        let depth = self.calls.get(id).map(|n| n.depth).unwrap_or_default();
        let description = format!("Call {}({})", function, join(&parameters));
        self.push(
            Step::new(
                StepEvent::Call {
                    call: id,
                    function: function.to_string(),
                    parameters,
                    depth,
                },
                description,
            )
            .with_subject(Subject::Call(id)),
        );
        Ok(id)
    }

    fn base_case(&mut self, call: CallId, description: String) {
        self.push(
            Step::new(StepEvent::BaseCase { call }, description).with_subject(Subject::Call(call)),
        );
    }

    fn ret(&mut self, call: CallId, value: i64) -> Result<i64, EngineError> {
        self.calls.resolve(call, value)?;
        let label = self
            .calls
            .get(call)
            .map(|n| format!("{}({})", n.function, join(&n.parameters)))
            .unwrap_or_default();
        self.push(
            Step::new(
                StepEvent::Return { call, value },
                format!("{} returns {}", label, value),
            )
            .with_subject(Subject::Call(call)),
        );
        Ok(value)
    }

    fn array(&self) -> Result<&ArraySnapshot, EngineError> {
        self.array.as_ref().ok_or_else(|| EngineError::Internal {
            message: "array procedure started without an array".into(),
        })
    }

    fn record_outcome(&mut self, hit: Option<usize>) {
        let step = match (hit, &self.array) {
            (Some(index), Some(array)) => Step::new(
                StepEvent::Found { index },
                format!("Found {} at index {}", self.target, index),
            )
            .with_subject(Subject::Element(array.id(index))),
            _ => Step::new(
                StepEvent::NotFound,
                format!("{} is not in the array", self.target),
            ),
        };
        self.push(step);
    }
}

fn join(values: &[i64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn internal_overflow(function: &str) -> EngineError {
    EngineError::Internal {
        message: format!("{} overflowed after validation", function),
    }
}

fn factorial(t: &mut RecursionTracer, parent: Option<CallId>, n: i64) -> Result<i64, EngineError> {
    let id = t.enter(parent, "factorial", vec![n])?;
    let value = if n <= 1 {
        t.base_case(id, format!("factorial({}) is 1", n));
        1
    } else {
        let rest = factorial(t, Some(id), n - 1)?;
        n.checked_mul(rest)
            .ok_or_else(|| internal_overflow("factorial"))?
    };
    t.ret(id, value)
}

fn fibonacci(t: &mut RecursionTracer, parent: Option<CallId>, n: i64) -> Result<i64, EngineError> {
    let id = t.enter(parent, "fibonacci", vec![n])?;
    let value = if n <= 1 {
        t.base_case(id, format!("fibonacci({}) is {}", n, n));
        n
    } else {
        let a = fibonacci(t, Some(id), n - 1)?;
        let b = fibonacci(t, Some(id), n - 2)?;
        a.checked_add(b)
            .ok_or_else(|| internal_overflow("fibonacci"))?
    };
    t.ret(id, value)
}

fn power(
    t: &mut RecursionTracer,
    parent: Option<CallId>,
    base: i64,
    exponent: i64,
) -> Result<i64, EngineError> {
    let id = t.enter(parent, "power", vec![base, exponent])?;
    let value = if exponent == 0 {
        t.base_case(id, format!("power({}, 0) is 1", base));
        1
    } else {
        let half = power(t, Some(id), base, exponent / 2)?;
        let square = half
            .checked_mul(half)
            .ok_or_else(|| internal_overflow("power"))?;
        if exponent % 2 == 0 {
            square
        } else {
            square
                .checked_mul(base)
                .ok_or_else(|| internal_overflow("power"))?
        }
    };
    t.ret(id, value)
}

fn rod_number(rod: Rod) -> i64 {
    match rod {
        Rod::Source => 0,
        Rod::Auxiliary => 1,
        Rod::Target => 2,
    }
}

/// Moves `disks` from `from` to `to` using `via`. Returns the number of moves made.
fn hanoi(
    t: &mut RecursionTracer,
    parent: Option<CallId>,
    disks: u32,
    (from, to, via): (Rod, Rod, Rod),
    moves: &mut Vec<HanoiMove>,
) -> Result<i64, EngineError> {
    let id = t.enter(
        parent,
        "hanoi",
        vec![
            disks as i64,
            rod_number(from),
            rod_number(to),
            rod_number(via),
        ],
    )?;
    let count = match disks {
        0 => {
            t.base_case(id, "No disks to move".to_string());
            0
        }
        1 => {
            t.base_case(id, format!("Single disk moves directly from {} to {}", from, to));
            move_disk(t, id, 1, from, to, moves);
            1
        }
        _ => {
            let before = hanoi(t, Some(id), disks - 1, (from, via, to), moves)?;
            move_disk(t, id, disks, from, to, moves);
            let after = hanoi(t, Some(id), disks - 1, (via, to, from), moves)?;
            before + 1 + after
        }
    };
    t.ret(id, count)
}

fn move_disk(
    t: &mut RecursionTracer,
    call: CallId,
    disk: u32,
    from: Rod,
    to: Rod,
    moves: &mut Vec<HanoiMove>,
) {
    let mv = HanoiMove { disk, from, to };
    moves.push(mv);
    t.push(
        Step::new(
            StepEvent::Move(mv),
            format!("Move disk {} from {} to {}", disk, from, to),
        )
        .with_subject(Subject::Element(ElementId(disk)))
        .with_subject(Subject::Call(call)),
    );
}

/// Searches the inclusive window `low..=high`; `high` may be `low - 1` (empty).
fn binary_search(
    t: &mut RecursionTracer,
    parent: Option<CallId>,
    low: i64,
    high: i64,
) -> Result<Option<usize>, EngineError> {
    let id = t.enter(parent, "binary_search", vec![low, high])?;
    let hit = if low > high {
        t.base_case(id, format!("Empty range {}..={}", low, high));
        None
    } else {
        probe_window(t, id, low, high)?
    };
    // The outcome belongs to the root activation, ahead of its return.
    if parent.is_none() {
        t.record_outcome(hit);
    }
    t.ret(id, hit.map_or(-1, |i| i as i64))?;
    Ok(hit)
}

/// Probes the middle of a non-empty `low..=high` and recurses into one half.
fn probe_window(
    t: &mut RecursionTracer,
    id: CallId,
    low: i64,
    high: i64,
) -> Result<Option<usize>, EngineError> {
    let (lo, hi) = (low as usize, high as usize);
    let mid = lo + (hi - lo) / 2;
    let array = t.array()?;
    let range: Vec<Subject> = (lo..=hi).map(|i| Subject::Element(array.id(i))).collect();
    let (mid_value, mid_id) = (array.value(mid), array.id(mid));
    t.push(
        Step::new(
            StepEvent::MarkRange { low: lo, high: hi },
            format!("Search window is indices {}..={}", lo, hi),
        )
        .with_subjects(range),
    );
    t.push(
        Step::new(
            StepEvent::Compare {
                index: mid,
                with: Operand::Value(t.target),
            },
            format!(
                "Compare {} (index {}) with target {}",
                mid_value, mid, t.target
            ),
        )
        .with_subject(Subject::Element(mid_id)),
    );

    let hit = match mid_value.cmp(&t.target) {
        Ordering::Equal => {
            t.base_case(id, format!("Target found at index {}", mid));
            Some(mid)
        }
        Ordering::Less => binary_search(t, Some(id), mid as i64 + 1, high)?,
        Ordering::Greater => binary_search(t, Some(id), low, mid as i64 - 1)?,
    };
    Ok(hit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use algotrace_core::StepKind;

    fn run(procedure: RecursiveProcedure) -> Trace {
        recurse(&procedure, &EngineConfig::default()).unwrap()
    }

    fn count(trace: &Trace, kind: StepKind) -> usize {
        trace.steps().iter().filter(|s| s.kind() == kind).count()
    }

    #[test]
    fn factorial_values_and_depth() {
        for (n, expected) in [(0, 1), (1, 1), (5, 120)] {
            let trace = run(RecursiveProcedure::Factorial { n });
            assert_eq!(trace.result(), &TraceResult::Number(expected));
            let tree = trace.call_tree().unwrap();
            assert_eq!(tree.height(), (n as usize).max(1));
            assert!(tree.is_complete());
        }
    }

    #[test]
    fn one_return_per_call_and_final_result_last() {
        let trace = run(RecursiveProcedure::Fibonacci { n: 6 });
        let calls = count(&trace, StepKind::Call);
        assert_eq!(calls, count(&trace, StepKind::Return));
        assert_eq!(calls, trace.call_tree().unwrap().len());
        assert_eq!(trace.steps().last().unwrap().kind(), StepKind::FinalResult);
        let root_return = &trace.steps()[trace.len() - 2];
        assert_eq!(
            root_return.event,
            StepEvent::Return {
                call: CallId(0),
                value: 8
            }
        );
    }

    #[test]
    fn fibonacci_is_not_memoized() {
        // Naive fib(n) makes 2 * fib(n + 1) - 1 calls.
        let trace = run(RecursiveProcedure::Fibonacci { n: 10 });
        assert_eq!(trace.result(), &TraceResult::Number(55));
        assert_eq!(trace.call_tree().unwrap().len(), 2 * 89 - 1);
    }

    #[test]
    fn power_by_halving() {
        let trace = run(RecursiveProcedure::Power {
            base: 3,
            exponent: 13,
        });
        assert_eq!(trace.result(), &TraceResult::Number(1_594_323));
        // exponents 13, 6, 3, 1, 0
        assert_eq!(trace.call_tree().unwrap().len(), 5);
        let trace = run(RecursiveProcedure::Power {
            base: -2,
            exponent: 0,
        });
        assert_eq!(trace.result(), &TraceResult::Number(1));
    }

    #[test]
    fn hanoi_move_counts() {
        for disks in 0..=6u32 {
            let trace = run(RecursiveProcedure::Hanoi { disks });
            match trace.result() {
                TraceResult::Moves(moves) => assert_eq!(moves.len(), (1usize << disks) - 1),
                other => panic!("expected moves, got {:?}", other),
            }
            assert_eq!(count(&trace, StepKind::Move), (1usize << disks) - 1);
        }
    }

    #[test]
    fn recursive_binary_search() {
        let values = vec![1, 4, 9, 16, 25, 36];
        let trace = run(RecursiveProcedure::BinarySearch {
            values: values.clone(),
            target: 25,
        });
        assert_eq!(trace.result(), &TraceResult::Found { index: 4 });

        let trace = run(RecursiveProcedure::BinarySearch { values, target: 2 });
        assert_eq!(trace.result(), &TraceResult::NotFound);
        let tree = trace.call_tree().unwrap();
        assert_eq!(tree.root().unwrap().return_value, Some(-1));
        assert!(count(&trace, StepKind::BaseCase) >= 1);
    }

    #[test]
    fn binary_search_outcome_precedes_root_return() {
        for target in [25, 2] {
            let trace = run(RecursiveProcedure::BinarySearch {
                values: vec![1, 4, 9, 16, 25, 36],
                target,
            });
            let root = trace.call_tree().unwrap().root().unwrap().id;
            let kinds: Vec<StepKind> = trace.steps().iter().map(|s| s.kind()).collect();
            let n = kinds.len();
            assert_eq!(kinds[n - 1], StepKind::FinalResult);
            assert!(matches!(
                trace.steps()[n - 2].event,
                StepEvent::Return { call, .. } if call == root
            ));
            assert!(matches!(kinds[n - 3], StepKind::Found | StepKind::NotFound));
            assert_eq!(
                kinds
                    .iter()
                    .filter(|k| matches!(k, StepKind::Found | StepKind::NotFound))
                    .count(),
                1
            );
        }
    }

    #[test]
    fn out_of_range_inputs_are_rejected() {
        let config = EngineConfig::default();
        for procedure in [
            RecursiveProcedure::Factorial { n: -1 },
            RecursiveProcedure::Factorial { n: 21 },
            RecursiveProcedure::Fibonacci { n: 93 },
            RecursiveProcedure::Hanoi { disks: 64 },
            RecursiveProcedure::Power {
                base: 2,
                exponent: 63,
            },
            RecursiveProcedure::Power {
                base: 2,
                exponent: -1,
            },
        ] {
            assert!(
                matches!(
                    recurse(&procedure, &config),
                    Err(EngineError::OutOfRange { .. })
                ),
                "{:?}",
                procedure
            );
        }
        assert!(matches!(
            recurse(
                &RecursiveProcedure::BinarySearch {
                    values: vec![],
                    target: 1
                },
                &config
            ),
            Err(EngineError::EmptyInput { .. })
        ));
    }

    #[test]
    fn hanoi_moves_serialize() {
        let trace = run(RecursiveProcedure::Hanoi { disks: 2 });
        let TraceResult::Moves(moves) = trace.result() else {
            panic!("expected moves");
        };
        insta::assert_json_snapshot!(moves, @r###"
        [
          {
            "disk": 1,
            "from": "Source",
            "to": "Auxiliary"
          },
          {
            "disk": 2,
            "from": "Source",
            "to": "Target"
          },
          {
            "disk": 1,
            "from": "Auxiliary",
            "to": "Target"
          }
        ]
        "###);
    }
}

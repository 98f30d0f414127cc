//! Array searches.
//!
//! Binary, jump, interpolation and exponential search require non-descending
//! input. That is a caller obligation: the engines never re-sort or verify,
//! and unsorted input yields an unspecified result without panicking.
//!
//! Each search records `mark-range` for the window it is narrowing,
//! `compare` for every probe against the target, and ends with a `found` or
//! `not-found` step before the final result.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use algotrace_core::{
    ArraySnapshot, EngineError, Operand, Step, StepEvent, Subject, Trace, TraceRecorder,
    TraceResult,
};

use crate::EngineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchAlgorithm {
    Linear,
    Binary,
    Jump,
    Interpolation,
    Exponential,
}

impl SearchAlgorithm {
    pub const ALL: [SearchAlgorithm; 5] = [
        SearchAlgorithm::Linear,
        SearchAlgorithm::Binary,
        SearchAlgorithm::Jump,
        SearchAlgorithm::Interpolation,
        SearchAlgorithm::Exponential,
    ];

    /// Whether the input must be sorted non-descending.
    pub fn requires_sorted(self) -> bool {
        !matches!(self, SearchAlgorithm::Linear)
    }

    pub fn name(self) -> &'static str {
        match self {
            SearchAlgorithm::Linear => "linear",
            SearchAlgorithm::Binary => "binary",
            SearchAlgorithm::Jump => "jump",
            SearchAlgorithm::Interpolation => "interpolation",
            SearchAlgorithm::Exponential => "exponential",
        }
    }
}

impl fmt::Display for SearchAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} search", self.name())
    }
}

impl FromStr for SearchAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SearchAlgorithm::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| format!("unknown search algorithm '{}'", s))
    }
}

/// Searches `input` for `target`.
pub fn search(
    algorithm: SearchAlgorithm,
    input: &ArraySnapshot,
    target: i64,
    config: &EngineConfig,
) -> Result<Trace, EngineError> {
    if input.is_empty() {
        return Err(EngineError::EmptyInput {
            operation: algorithm.to_string(),
        });
    }
    let mut t = SearchTracer {
        array: input.clone(),
        rec: TraceRecorder::new(config.capture_snapshots),
        target,
    };
    let hit = match algorithm {
        SearchAlgorithm::Linear => linear(&mut t),
        SearchAlgorithm::Binary => {
            let high = t.array.len() - 1;
            binary_within(&mut t, 0, high)
        }
        SearchAlgorithm::Jump => jump(&mut t),
        SearchAlgorithm::Interpolation => interpolation(&mut t),
        SearchAlgorithm::Exponential => exponential(&mut t),
    };
    Ok(t.conclude(hit))
}

struct SearchTracer {
    array: ArraySnapshot,
    rec: TraceRecorder,
    target: i64,
}

impl SearchTracer {
    /// Compares slot `index` with the target: `Less` means the slot is smaller.
    fn probe(&mut self, index: usize) -> Ordering {
        let value = self.array.value(index);
        let step = Step::new(
            StepEvent::Compare {
                index,
                with: Operand::Value(self.target),
            },
            format!(
                "Compare {} (index {}) with target {}",
                value, index, self.target
            ),
        )
        .with_subject(Subject::Element(self.array.id(index)));
        self.rec.record(step, &self.array);
        value.cmp(&self.target)
    }

    fn visit(&mut self, index: usize, description: String) {
        let step = Step::new(StepEvent::Visit { index }, description)
            .with_subject(Subject::Element(self.array.id(index)));
        self.rec.record(step, &self.array);
    }

    /// Declares the inclusive window still under consideration.
    fn mark_range(&mut self, low: usize, high: usize) {
        let subjects: Vec<Subject> = (low..=high)
            .map(|i| Subject::Element(self.array.id(i)))
            .collect();
        let step = Step::new(
            StepEvent::MarkRange { low, high },
            format!("Search window is indices {}..={}", low, high),
        )
        .with_subjects(subjects);
        self.rec.record(step, &self.array);
    }

    /// Records the terminal found/not-found step.
    fn record_outcome(&mut self, hit: Option<usize>) {
        let step = match hit {
            Some(index) => Step::new(
                StepEvent::Found { index },
                format!("Found {} at index {}", self.target, index),
            )
            .with_subject(Subject::Element(self.array.id(index))),
            None => Step::new(
                StepEvent::NotFound,
                format!("{} is not in the array", self.target),
            ),
        };
        self.rec.record(step, &self.array);
    }

    fn conclude(mut self, hit: Option<usize>) -> Trace {
        self.record_outcome(hit);
        let result = match hit {
            Some(index) => TraceResult::Found { index },
            None => TraceResult::NotFound,
        };
        self.rec.finish(result)
    }
}

fn linear(t: &mut SearchTracer) -> Option<usize> {
    let n = t.array.len();
    t.mark_range(0, n - 1);
    (0..n).find(|&i| t.probe(i) == Ordering::Equal)
}

/// Iterative binary search over the inclusive window `low..=high`.
fn binary_within(t: &mut SearchTracer, mut low: usize, mut high: usize) -> Option<usize> {
    while low <= high {
        t.mark_range(low, high);
        let mid = low + (high - low) / 2;
        match t.probe(mid) {
            Ordering::Equal => return Some(mid),
            Ordering::Less => low = mid + 1,
            Ordering::Greater => {
                if mid == 0 {
                    return None;
                }
                high = mid - 1;
            }
        }
    }
    None
}

fn jump(t: &mut SearchTracer) -> Option<usize> {
    let n = t.array.len();
    let block = ((n as f64).sqrt() as usize).max(1);
    let mut prev = 0;
    let mut next = block.min(n);
    t.mark_range(prev, next - 1);
    while t.probe(next - 1) == Ordering::Less {
        prev = next;
        if prev >= n {
            return None;
        }
        next = (next + block).min(n);
        t.mark_range(prev, next - 1);
    }
    for i in prev..next {
        match t.probe(i) {
            Ordering::Equal => return Some(i),
            Ordering::Greater => return None,
            Ordering::Less => {}
        }
    }
    None
}

fn interpolation(t: &mut SearchTracer) -> Option<usize> {
    let target = t.target;
    let mut low = 0;
    let mut high = t.array.len() - 1;
    while low <= high {
        t.mark_range(low, high);
        let (lv, hv) = (t.array.value(low), t.array.value(high));
        if target < lv {
            t.probe(low);
            return None;
        }
        if target > hv {
            t.probe(high);
            return None;
        }
        if lv == hv {
            // Equal endpoints would divide by zero; compare directly instead.
            return (t.probe(low) == Ordering::Equal).then_some(low);
        }
        let offset = (target as i128 - lv as i128) * (high - low) as i128
            / (hv as i128 - lv as i128);
        let pos = low + offset as usize;
        t.visit(pos, format!("Interpolated probe position {}", pos));
        match t.probe(pos) {
            Ordering::Equal => return Some(pos),
            Ordering::Less => low = pos + 1,
            Ordering::Greater => {
                if pos == 0 {
                    return None;
                }
                high = pos - 1;
            }
        }
    }
    None
}

fn exponential(t: &mut SearchTracer) -> Option<usize> {
    let n = t.array.len();
    t.mark_range(0, n - 1);
    if t.probe(0) == Ordering::Equal {
        return Some(0);
    }
    let mut bound = 1;
    while bound < n {
        match t.probe(bound) {
            Ordering::Equal => return Some(bound),
            Ordering::Less => bound *= 2,
            Ordering::Greater => break,
        }
    }
    binary_within(t, bound / 2, bound.min(n - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use algotrace_core::StepKind;

    fn run(algorithm: SearchAlgorithm, values: &[i64], target: i64) -> Trace {
        search(
            algorithm,
            &ArraySnapshot::from_values(values),
            target,
            &EngineConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn all_searches_find_present_values() {
        let values = [1, 3, 5, 7, 9, 11, 13, 15, 17];
        for algorithm in SearchAlgorithm::ALL {
            for (i, &v) in values.iter().enumerate() {
                assert_eq!(
                    run(algorithm, &values, v).result(),
                    &TraceResult::Found { index: i },
                    "{} for {}",
                    algorithm,
                    v
                );
            }
        }
    }

    #[test]
    fn all_searches_report_absent_values() {
        let values = [2, 4, 6, 8];
        for algorithm in SearchAlgorithm::ALL {
            for target in [-1, 3, 5, 7, 100] {
                let trace = run(algorithm, &values, target);
                assert_eq!(trace.result(), &TraceResult::NotFound, "{}", algorithm);
                let outcome = &trace.steps()[trace.len() - 2];
                assert_eq!(outcome.kind(), StepKind::NotFound);
            }
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = search(
            SearchAlgorithm::Binary,
            &ArraySnapshot::default(),
            1,
            &EngineConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::EmptyInput { .. }));
    }

    #[test]
    fn interpolation_guards_equal_endpoints() {
        let trace = run(SearchAlgorithm::Interpolation, &[4, 4, 4, 4], 4);
        assert!(matches!(trace.result(), TraceResult::Found { .. }));
        let trace = run(SearchAlgorithm::Interpolation, &[4, 4, 4, 4], 5);
        assert_eq!(trace.result(), &TraceResult::NotFound);
    }

    #[test]
    fn interpolation_survives_extreme_values() {
        let values = [i64::MIN, 0, i64::MAX];
        let trace = run(SearchAlgorithm::Interpolation, &values, i64::MAX);
        assert_eq!(trace.result(), &TraceResult::Found { index: 2 });
    }

    #[test]
    fn unsorted_input_does_not_panic() {
        for algorithm in SearchAlgorithm::ALL {
            let trace = run(algorithm, &[9, 1, 8, 2, 7, 3], 2);
            assert_eq!(trace.steps().last().unwrap().kind(), StepKind::FinalResult);
        }
    }

    #[test]
    fn binary_search_ranges_shrink() {
        let values: Vec<i64> = (0..32).map(|v| v * 2).collect();
        let trace = run(SearchAlgorithm::Binary, &values, 7);
        let ranges: Vec<(usize, usize)> = trace
            .steps()
            .iter()
            .filter_map(|s| match s.event {
                StepEvent::MarkRange { low, high } => Some((low, high)),
                _ => None,
            })
            .collect();
        assert!(ranges.len() > 1);
        for pair in ranges.windows(2) {
            let ((l0, h0), (l1, h1)) = (pair[0], pair[1]);
            assert!(l1 >= l0 && h1 <= h0 && (h1 - l1) < (h0 - l0));
        }
    }

    #[test]
    fn single_element() {
        for algorithm in SearchAlgorithm::ALL {
            assert_eq!(run(algorithm, &[5], 5).result(), &TraceResult::Found { index: 0 });
            assert_eq!(run(algorithm, &[5], 6).result(), &TraceResult::NotFound);
            assert_eq!(run(algorithm, &[5], 4).result(), &TraceResult::NotFound);
        }
    }
}

//! Comparison sorts.
//!
//! Every relocation is a swap of identity-carrying elements, so each recorded
//! snapshot keeps unique identities and stability can be checked on the
//! final array. Insertion sort walks the key left by adjacent swaps and merge
//! sort merges in place by rotating the right-hand element leftward; both stay
//! stable. Bubble sort only swaps on a strict inversion.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use algotrace_core::{
    ArraySnapshot, EngineError, Operand, Role, Step, StepEvent, Subject, Trace, TraceRecorder,
    TraceResult,
};

use crate::EngineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortAlgorithm {
    Bubble,
    Selection,
    Insertion,
    Merge,
    Quick,
    Heap,
}

impl SortAlgorithm {
    pub const ALL: [SortAlgorithm; 6] = [
        SortAlgorithm::Bubble,
        SortAlgorithm::Selection,
        SortAlgorithm::Insertion,
        SortAlgorithm::Merge,
        SortAlgorithm::Quick,
        SortAlgorithm::Heap,
    ];

    /// Whether equal values keep their relative identity order.
    pub fn is_stable(self) -> bool {
        matches!(
            self,
            SortAlgorithm::Bubble | SortAlgorithm::Insertion | SortAlgorithm::Merge
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            SortAlgorithm::Bubble => "bubble",
            SortAlgorithm::Selection => "selection",
            SortAlgorithm::Insertion => "insertion",
            SortAlgorithm::Merge => "merge",
            SortAlgorithm::Quick => "quick",
            SortAlgorithm::Heap => "heap",
        }
    }
}

impl fmt::Display for SortAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} sort", self.name())
    }
}

impl FromStr for SortAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortAlgorithm::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| format!("unknown sort algorithm '{}'", s))
    }
}

/// Sorts a copy of `input` ascending, recording every comparison and swap.
pub fn sort(
    algorithm: SortAlgorithm,
    input: &ArraySnapshot,
    config: &EngineConfig,
) -> Result<Trace, EngineError> {
    let mut t = SortTracer {
        array: input.clone(),
        rec: TraceRecorder::new(config.capture_snapshots),
    };
    let n = t.array.len();
    match algorithm {
        SortAlgorithm::Bubble => bubble(&mut t),
        SortAlgorithm::Selection => selection(&mut t),
        SortAlgorithm::Insertion => insertion(&mut t),
        SortAlgorithm::Merge => {
            merge_sort(&mut t, 0, n);
            t.mark_sorted(0, n);
        }
        SortAlgorithm::Quick => quick_sort(&mut t, 0, n),
        SortAlgorithm::Heap => heap(&mut t),
    }
    let result = TraceResult::Sorted(t.array.clone());
    Ok(t.rec.finish(result))
}

/// Working array plus recorder; every primitive records exactly one step.
struct SortTracer {
    array: ArraySnapshot,
    rec: TraceRecorder,
}

impl SortTracer {
    fn subject(&self, index: usize) -> Subject {
        Subject::Element(self.array.id(index))
    }

    fn compare(&mut self, i: usize, j: usize) -> Ordering {
        let (a, b) = (self.array.value(i), self.array.value(j));
        let step = Step::new(
            StepEvent::Compare {
                index: i,
                with: Operand::Index(j),
            },
            format!("Compare {} (index {}) with {} (index {})", a, i, b, j),
        )
        .with_subject(self.subject(i))
        .with_subject(self.subject(j));
        self.rec.record(step, &self.array);
        a.cmp(&b)
    }

    /// Swapping a slot with itself is not a relocation and records nothing.
    fn swap(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        self.array.swap(i, j);
        let step = Step::new(
            StepEvent::Swap {
                first: i,
                second: j,
            },
            format!(
                "Swap index {} and index {} (now {} and {})",
                i,
                j,
                self.array.value(i),
                self.array.value(j)
            ),
        )
        .with_subject(self.subject(i))
        .with_subject(self.subject(j));
        self.rec.record(step, &self.array);
    }

    fn set_role(&mut self, index: usize, role: Role, description: String) {
        let step = Step::new(StepEvent::SetRole { role }, description).with_subject(self.subject(index));
        self.rec.record(step, &self.array);
    }

    /// Tags `lo..hi` as in final position. Empty ranges record nothing.
    fn mark_sorted(&mut self, lo: usize, hi: usize) {
        if lo >= hi {
            return;
        }
        let description = if hi - lo == 1 {
            format!("Index {} is in its final position", lo)
        } else {
            format!("Indices {}..{} are in their final positions", lo, hi - 1)
        };
        let subjects: Vec<Subject> = (lo..hi).map(|i| self.subject(i)).collect();
        let step = Step::new(StepEvent::SetRole { role: Role::Sorted }, description)
            .with_subjects(subjects);
        self.rec.record(step, &self.array);
    }

    /// Inclusive range.
    fn mark_range(&mut self, low: usize, high: usize) {
        let subjects: Vec<Subject> = (low..=high).map(|i| self.subject(i)).collect();
        let step = Step::new(
            StepEvent::MarkRange { low, high },
            format!("Working on indices {}..={}", low, high),
        )
        .with_subjects(subjects);
        self.rec.record(step, &self.array);
    }
}

fn bubble(t: &mut SortTracer) {
    let mut end = t.array.len();
    while end > 1 {
        let mut swapped = false;
        for j in 0..end - 1 {
            if t.compare(j, j + 1) == Ordering::Greater {
                t.swap(j, j + 1);
                swapped = true;
            }
        }
        end -= 1;
        t.mark_sorted(end, end + 1);
        if !swapped {
            break;
        }
    }
    t.mark_sorted(0, end);
}

fn selection(t: &mut SortTracer) {
    let n = t.array.len();
    for i in 0..n {
        let mut min = i;
        t.set_role(
            min,
            Role::Min,
            format!("Assume {} (index {}) is the minimum", t.array.value(min), min),
        );
        for j in i + 1..n {
            if t.compare(j, min) == Ordering::Less {
                min = j;
                t.set_role(
                    min,
                    Role::Min,
                    format!("New minimum {} at index {}", t.array.value(min), min),
                );
            }
        }
        t.swap(i, min);
        t.mark_sorted(i, i + 1);
    }
}

fn insertion(t: &mut SortTracer) {
    let n = t.array.len();
    for i in 1..n {
        t.set_role(
            i,
            Role::Active,
            format!("Insert {} (index {}) into the sorted prefix", t.array.value(i), i),
        );
        let mut j = i;
        while j > 0 && t.compare(j - 1, j) == Ordering::Greater {
            t.swap(j - 1, j);
            j -= 1;
        }
    }
    t.mark_sorted(0, n);
}

/// Sorts `lo..hi` (exclusive).
fn merge_sort(t: &mut SortTracer, lo: usize, hi: usize) {
    if hi - lo <= 1 {
        return;
    }
    let mid = lo + (hi - lo) / 2;
    merge_sort(t, lo, mid);
    merge_sort(t, mid, hi);

    t.mark_range(lo, hi - 1);
    let (mut i, mut m) = (lo, mid);
    while i < m && m < hi {
        if t.compare(i, m) != Ordering::Greater {
            i += 1;
        } else {
            // Rotate the right-run head into slot i; the left run shifts by one.
            let mut k = m;
            while k > i {
                t.swap(k - 1, k);
                k -= 1;
            }
            i += 1;
            m += 1;
        }
    }
}

/// Sorts `lo..hi` (exclusive) with Lomuto partitioning.
fn quick_sort(t: &mut SortTracer, lo: usize, hi: usize) {
    match hi - lo {
        0 => {}
        1 => t.mark_sorted(lo, hi),
        _ => {
            let p = partition(t, lo, hi - 1);
            t.mark_sorted(p, p + 1);
            quick_sort(t, lo, p);
            quick_sort(t, p + 1, hi);
        }
    }
}

/// Partitions `lo..=hi` around `a[hi]`; returns the pivot's final slot.
fn partition(t: &mut SortTracer, lo: usize, hi: usize) -> usize {
    t.mark_range(lo, hi);
    t.set_role(
        hi,
        Role::Pivot,
        format!("Pivot is {} (index {})", t.array.value(hi), hi),
    );
    let mut store = lo;
    for j in lo..hi {
        if t.compare(j, hi) == Ordering::Less {
            t.swap(store, j);
            store += 1;
        }
    }
    t.swap(store, hi);
    store
}

fn heap(t: &mut SortTracer) {
    let n = t.array.len();
    for start in (0..n / 2).rev() {
        sift_down(t, start, n);
    }
    for end in (1..n).rev() {
        t.swap(0, end);
        t.mark_sorted(end, end + 1);
        sift_down(t, 0, end);
    }
    t.mark_sorted(0, n.min(1));
}

/// Restores the max-heap property below `root` within `0..len`.
fn sift_down(t: &mut SortTracer, mut root: usize, len: usize) {
    loop {
        let left = 2 * root + 1;
        if left >= len {
            return;
        }
        let mut largest = root;
        if t.compare(left, largest) == Ordering::Greater {
            largest = left;
        }
        let right = left + 1;
        if right < len && t.compare(right, largest) == Ordering::Greater {
            largest = right;
        }
        if largest == root {
            return;
        }
        t.swap(root, largest);
        root = largest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use algotrace_core::StepKind;

    fn run(algorithm: SortAlgorithm, values: &[i64]) -> Trace {
        sort(
            algorithm,
            &ArraySnapshot::from_values(values),
            &EngineConfig::default(),
        )
        .unwrap()
    }

    fn sorted_values(trace: &Trace) -> Vec<i64> {
        match trace.result() {
            TraceResult::Sorted(a) => a.values(),
            other => panic!("expected sorted result, got {:?}", other),
        }
    }

    #[test]
    fn every_algorithm_sorts() {
        let input = [5, -2, 9, 0, 5, 3, 3, 1];
        let mut expected = input.to_vec();
        expected.sort();
        for algorithm in SortAlgorithm::ALL {
            let trace = run(algorithm, &input);
            assert_eq!(sorted_values(&trace), expected, "{}", algorithm);
        }
    }

    #[test]
    fn trivial_inputs() {
        for algorithm in SortAlgorithm::ALL {
            assert!(sorted_values(&run(algorithm, &[])).is_empty());
            assert_eq!(sorted_values(&run(algorithm, &[7])), vec![7]);
        }
    }

    #[test]
    fn exactly_one_final_result_and_it_is_last() {
        for algorithm in SortAlgorithm::ALL {
            let trace = run(algorithm, &[3, 1, 2]);
            let finals: Vec<usize> = trace
                .steps()
                .iter()
                .enumerate()
                .filter(|(_, s)| s.kind() == StepKind::FinalResult)
                .map(|(i, _)| i)
                .collect();
            assert_eq!(finals, vec![trace.len() - 1], "{}", algorithm);
        }
    }

    #[test]
    fn bubble_on_sorted_input_exits_after_one_pass() {
        let trace = run(SortAlgorithm::Bubble, &[1, 2, 3, 4]);
        let compares = trace
            .steps()
            .iter()
            .filter(|s| s.kind() == StepKind::Compare)
            .count();
        assert_eq!(compares, 3);
        assert!(trace.steps().iter().all(|s| s.kind() != StepKind::Swap));
    }

    #[test]
    fn swap_steps_replay_to_the_final_array() {
        let input = ArraySnapshot::from_values(&[4, 3, 2, 1, 0]);
        for algorithm in SortAlgorithm::ALL {
            let trace = sort(algorithm, &input, &EngineConfig::default()).unwrap();
            let mut replay = input.clone();
            for step in trace.steps() {
                if let StepEvent::Swap { first, second } = step.event {
                    replay.swap(first, second);
                }
            }
            assert_eq!(&TraceResult::Sorted(replay), trace.result(), "{}", algorithm);
        }
    }

    #[test]
    fn quick_sort_marks_pivots() {
        let trace = run(SortAlgorithm::Quick, &[3, 1, 2]);
        assert!(trace.steps().iter().any(|s| matches!(
            s.event,
            StepEvent::SetRole { role: Role::Pivot }
        )));
    }

    #[test]
    fn input_snapshot_is_not_mutated() {
        let input = ArraySnapshot::from_values(&[2, 1]);
        let before = input.clone();
        sort(SortAlgorithm::Heap, &input, &EngineConfig::default()).unwrap();
        assert_eq!(input, before);
    }

    #[test]
    fn parse_names() {
        assert_eq!("merge".parse::<SortAlgorithm>(), Ok(SortAlgorithm::Merge));
        assert!("bogo".parse::<SortAlgorithm>().is_err());
    }
}

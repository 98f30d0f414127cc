//! Randomized invariant checks for the sort and search engines.
//!
//! Callers provide seed inputs (the interesting cases) and an iteration count.
//! The harness runs the seeds first, then random inputs drawn from a
//! deterministic PRNG, and checks every resulting trace:
//!
//! - exactly one `final-result` step, placed last, matching the trace result
//! - sorts: non-descending output that is a permutation of the input, and
//!   equal values keep their identity order for stable algorithms
//! - searches: a reported index holds the target; "not found" only when the
//!   target is absent
//!
//! Given the same `random_seed` the same inputs are generated and the same
//! report is produced.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use algotrace_core::{ArraySnapshot, EngineError, StepEvent, StepKind, Trace, TraceResult};

use crate::{search, sort, EngineConfig, SearchAlgorithm, SortAlgorithm};

/// Which engine a verification run exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyTarget {
    Sort(SortAlgorithm),
    Search(SearchAlgorithm),
}

#[derive(Debug, Clone)]
pub struct VerifyConfig {
    /// Hand-picked inputs, run before the random ones.
    pub seeds: Vec<Vec<i64>>,
    /// Number of randomized inputs to run.
    pub iterations: u32,
    pub random_seed: u64,
    /// Upper bound on generated input length.
    pub max_len: usize,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        VerifyConfig {
            seeds: Vec::new(),
            iterations: 100,
            random_seed: 0,
            max_len: 16,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub total_run: u32,
    pub passed: u32,
    pub failures: Vec<VerifyFailure>,
    /// The seed used, for reproducing a failing run.
    pub random_seed: u64,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A counterexample with the property it broke.
#[derive(Debug, Clone)]
pub struct VerifyFailure {
    pub input: Vec<i64>,
    /// Search target, for search runs.
    pub target: Option<i64>,
    pub violation: Violation,
    /// Absent when the engine rejected the input.
    pub trace: Option<Trace>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("expected exactly one trailing final-result step, found {count}")]
    FinalResultCount { count: usize },

    #[error("final-result payload differs from the trace result")]
    FinalResultMismatch,

    #[error("output is not sorted non-descending: {values:?}")]
    NotSorted { values: Vec<i64> },

    #[error("output is not a permutation of the input")]
    NotPermutation,

    #[error("equal values {value} changed their relative order")]
    Unstable { value: i64 },

    #[error("reported index {index} does not hold target {target}")]
    WrongIndex { target: i64, index: usize },

    #[error("target {target} is present but was reported missing")]
    Missed { target: i64 },

    #[error("unexpected result kind: {summary}")]
    UnexpectedResult { summary: String },

    #[error("engine rejected a valid input: {0}")]
    Rejected(EngineError),
}

/// Draws one value; about 30% of draws are boundary values.
///
/// The non-boundary range is narrow so inputs regularly contain duplicates,
/// which is what the stability check needs.
pub fn generate_random_value(rng: &mut ChaCha8Rng) -> i64 {
    if rng.gen_ratio(3, 10) {
        let boundaries: &[i64] = &[0, 1, -1, i64::MIN, i64::MAX];
        boundaries[rng.gen_range(0..boundaries.len())]
    } else {
        rng.gen_range(-20..=20)
    }
}

pub fn generate_random_values(min_len: usize, max_len: usize, rng: &mut ChaCha8Rng) -> Vec<i64> {
    let len = rng.gen_range(min_len..=max_len.max(min_len));
    (0..len).map(|_| generate_random_value(rng)).collect()
}

/// Checks the trace-shape property shared by every engine.
pub fn check_final_result(trace: &Trace) -> Result<(), Violation> {
    let count = trace
        .steps()
        .iter()
        .filter(|s| s.kind() == StepKind::FinalResult)
        .count();
    let last = trace.steps().last().map(|s| s.kind());
    if count != 1 || last != Some(StepKind::FinalResult) {
        return Err(Violation::FinalResultCount { count });
    }
    match trace.steps().last().map(|s| &s.event) {
        Some(StepEvent::FinalResult { result }) if result == trace.result() => Ok(()),
        _ => Err(Violation::FinalResultMismatch),
    }
}

pub fn check_sort_trace(
    algorithm: SortAlgorithm,
    input: &[i64],
    trace: &Trace,
) -> Result<(), Violation> {
    check_final_result(trace)?;
    let output = match trace.result() {
        TraceResult::Sorted(output) => output,
        other => {
            return Err(Violation::UnexpectedResult {
                summary: other.summary(),
            })
        }
    };
    if !output.is_sorted() {
        return Err(Violation::NotSorted {
            values: output.values(),
        });
    }
    let mut expected = input.to_vec();
    expected.sort_unstable();
    if output.values() != expected {
        return Err(Violation::NotPermutation);
    }
    if algorithm.is_stable() {
        // Identities follow input order, so equal values must keep ascending ids.
        for pair in output.elements().windows(2) {
            if pair[0].value == pair[1].value && pair[0].id > pair[1].id {
                return Err(Violation::Unstable {
                    value: pair[0].value,
                });
            }
        }
    }
    Ok(())
}

/// `input` must be sorted non-descending.
pub fn check_search_trace(input: &[i64], target: i64, trace: &Trace) -> Result<(), Violation> {
    check_final_result(trace)?;
    match trace.result() {
        TraceResult::Found { index } => {
            if input.get(*index) == Some(&target) {
                Ok(())
            } else {
                Err(Violation::WrongIndex {
                    target,
                    index: *index,
                })
            }
        }
        TraceResult::NotFound if input.contains(&target) => Err(Violation::Missed { target }),
        TraceResult::NotFound => Ok(()),
        other => Err(Violation::UnexpectedResult {
            summary: other.summary(),
        }),
    }
}

enum SingleTestResult {
    Pass,
    Failure(VerifyFailure),
}

fn run_single_test(
    target: VerifyTarget,
    input: Vec<i64>,
    rng: &mut ChaCha8Rng,
) -> SingleTestResult {
    let config = EngineConfig {
        capture_snapshots: false,
    };
    let array = ArraySnapshot::from_values(&input);
    let (search_target, outcome) = match target {
        VerifyTarget::Sort(algorithm) => {
            let outcome = sort(algorithm, &array, &config).map(|trace| {
                let checked = check_sort_trace(algorithm, &input, &trace);
                (trace, checked)
            });
            (None, outcome)
        }
        VerifyTarget::Search(algorithm) => {
            // Half the time look for a value that is present.
            let wanted = if !input.is_empty() && rng.gen_bool(0.5) {
                input[rng.gen_range(0..input.len())]
            } else {
                generate_random_value(rng)
            };
            let outcome = search(algorithm, &array, wanted, &config).map(|trace| {
                let checked = check_search_trace(&input, wanted, &trace);
                (trace, checked)
            });
            (Some(wanted), outcome)
        }
    };

    let (violation, trace) = match outcome {
        Ok((_, Ok(()))) => return SingleTestResult::Pass,
        Ok((trace, Err(violation))) => (violation, Some(trace)),
        Err(error) => (Violation::Rejected(error), None),
    };
    tracing::debug!(%violation, ?input, "verification failure");
    SingleTestResult::Failure(VerifyFailure {
        input,
        target: search_target,
        violation,
        trace,
    })
}

/// Runs the seeds, then `iterations` random inputs, against one engine.
///
/// Search inputs are sorted before use since every search but linear
/// requires it. Empty inputs are skipped for searches, which reject them.
pub fn run_verification(target: VerifyTarget, config: VerifyConfig) -> VerifyReport {
    let mut rng = ChaCha8Rng::seed_from_u64(config.random_seed);
    let mut failures = Vec::new();
    let mut total_run: u32 = 0;
    let mut passed: u32 = 0;

    let prepare = |mut input: Vec<i64>| match target {
        VerifyTarget::Sort(_) => Some(input),
        VerifyTarget::Search(_) if input.is_empty() => None,
        VerifyTarget::Search(_) => {
            input.sort_unstable();
            Some(input)
        }
    };
    let min_len = match target {
        VerifyTarget::Sort(_) => 0,
        VerifyTarget::Search(_) => 1,
    };

    let seeds = config.seeds.into_iter().filter_map(prepare).collect::<Vec<_>>();
    for input in seeds {
        total_run += 1;
        match run_single_test(target, input, &mut rng) {
            SingleTestResult::Pass => passed += 1,
            SingleTestResult::Failure(failure) => failures.push(failure),
        }
    }

    for _ in 0..config.iterations {
        let Some(input) = prepare(generate_random_values(min_len, config.max_len, &mut rng))
        else {
            continue;
        };
        total_run += 1;
        match run_single_test(target, input, &mut rng) {
            SingleTestResult::Pass => passed += 1,
            SingleTestResult::Failure(failure) => failures.push(failure),
        }
    }

    tracing::info!(
        ?target,
        total_run,
        passed,
        failed = failures.len(),
        random_seed = config.random_seed,
        "verification finished"
    );
    VerifyReport {
        total_run,
        passed,
        failures,
        random_seed: config.random_seed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use algotrace_core::TraceRecorder;

    fn config(random_seed: u64) -> VerifyConfig {
        VerifyConfig {
            seeds: vec![vec![], vec![1], vec![3, 3, 3], vec![5, 4, 3, 2, 1], vec![i64::MAX, i64::MIN]],
            iterations: 60,
            random_seed,
            max_len: 12,
        }
    }

    #[test]
    fn every_sort_passes() {
        for algorithm in SortAlgorithm::ALL {
            let report = run_verification(VerifyTarget::Sort(algorithm), config(7));
            assert!(report.is_clean(), "{}: {:?}", algorithm, report.failures);
            assert_eq!(report.total_run, 65);
            assert_eq!(report.passed, report.total_run);
        }
    }

    #[test]
    fn every_search_passes() {
        for algorithm in SearchAlgorithm::ALL {
            let report = run_verification(VerifyTarget::Search(algorithm), config(11));
            assert!(report.is_clean(), "{}: {:?}", algorithm, report.failures);
            // the empty seed is skipped
            assert_eq!(report.total_run, 64);
        }
    }

    #[test]
    fn same_seed_same_inputs() {
        let mut a = ChaCha8Rng::seed_from_u64(42);
        let mut b = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..10 {
            assert_eq!(
                generate_random_values(0, 8, &mut a),
                generate_random_values(0, 8, &mut b)
            );
        }
    }

    #[test]
    fn detects_unsorted_output() {
        let trace = TraceRecorder::new(false)
            .finish(TraceResult::Sorted(ArraySnapshot::from_values(&[2, 1])));
        assert_eq!(
            check_sort_trace(SortAlgorithm::Bubble, &[1, 2], &trace),
            Err(Violation::NotSorted { values: vec![2, 1] })
        );
    }

    #[test]
    fn detects_instability() {
        // ids 0 and 1 both hold 4; swapping them breaks identity order.
        let mut array = ArraySnapshot::from_values(&[4, 4]);
        array.swap(0, 1);
        let trace = TraceRecorder::new(false).finish(TraceResult::Sorted(array));
        assert_eq!(
            check_sort_trace(SortAlgorithm::Merge, &[4, 4], &trace),
            Err(Violation::Unstable { value: 4 })
        );
        assert_eq!(check_sort_trace(SortAlgorithm::Quick, &[4, 4], &trace), Ok(()));
    }

    #[test]
    fn detects_missed_target() {
        let trace = TraceRecorder::new(false).finish(TraceResult::NotFound);
        assert_eq!(
            check_search_trace(&[1, 2, 3], 2, &trace),
            Err(Violation::Missed { target: 2 })
        );
        let trace = TraceRecorder::new(false).finish(TraceResult::Found { index: 0 });
        assert_eq!(
            check_search_trace(&[1, 2, 3], 2, &trace),
            Err(Violation::WrongIndex { target: 2, index: 0 })
        );
    }
}

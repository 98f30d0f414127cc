//! Algorithm trace CLI.
//!
//! Provides the `algotrace` binary: builds an algorithm request from flags,
//! runs it through `algotrace_engines::run_algorithm`, and either replays the
//! trace on stdout through the playback controller or dumps it as JSON.
//!
//! Reads configuration from environment variables:
//! - `ALGOTRACE_DELAY_MS`: delay between replayed steps (default: 250).
//!   `--delay-ms` overrides it.

mod sink;

use std::process;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use algotrace_core::{
    ArraySnapshot, EngineError, GraphSnapshot, NodeId, QueueSnapshot, StackSnapshot, Trace,
    TreeSnapshot,
};
use algotrace_engines::verify::{run_verification, VerifyConfig, VerifyTarget};
use algotrace_engines::{
    run_algorithm, AlgorithmRequest, EngineConfig, GraphTraversal, QueueOp, RecursiveProcedure,
    SearchAlgorithm, SortAlgorithm, StackOp, TreeOp,
};
use algotrace_playback::{PlaybackConfig, PlaybackController, PlaybackOutcome, DEFAULT_DELAY};

use crate::sink::PrintSink;

/// Environment variable holding the default step delay in milliseconds.
const DELAY_ENV: &str = "ALGOTRACE_DELAY_MS";

/// Step through instrumented algorithm runs.
#[derive(Parser)]
#[command(name = "algotrace", about = "Step through instrumented algorithm runs")]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct OutputArgs {
    /// Print the whole trace as JSON instead of replaying it.
    #[arg(long, global = true)]
    json: bool,

    /// Delay between replayed steps, in milliseconds.
    #[arg(long, global = true)]
    delay_ms: Option<u64>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Sort an array: bubble, selection, insertion, merge, quick, heap.
    Sort {
        algorithm: SortAlgorithm,

        /// Comma-separated values.
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
        values: Vec<i64>,
    },

    /// Search an array: linear, binary, jump, interpolation, exponential.
    ///
    /// Every search except linear expects the values sorted ascending.
    Search {
        algorithm: SearchAlgorithm,

        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
        values: Vec<i64>,

        #[arg(short, long, allow_hyphen_values = true)]
        target: i64,
    },

    /// Run a recursive procedure.
    Recurse {
        #[command(subcommand)]
        procedure: ProcedureCommand,
    },

    /// Apply one operation to a fixed-capacity stack.
    Stack {
        #[arg(short, long)]
        capacity: usize,

        /// Initial contents, bottom to top.
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
        values: Vec<i64>,

        #[command(subcommand)]
        op: StackCommand,
    },

    /// Apply one operation to a fixed-capacity circular queue.
    Queue {
        #[arg(short, long)]
        capacity: usize,

        /// Initial contents, front to rear.
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
        values: Vec<i64>,

        #[command(subcommand)]
        op: QueueCommand,
    },

    /// Apply one operation to a binary search tree.
    Tree {
        /// Values inserted in order to build the initial tree.
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
        values: Vec<i64>,

        #[command(subcommand)]
        op: TreeCommand,
    },

    /// Traverse a graph: bfs or dfs.
    Graph {
        traversal: GraphTraversal,

        /// Number of vertices, ids 0..N.
        #[arg(short = 'n', long)]
        vertices: u32,

        /// Comma-separated edges written `from:to`.
        #[arg(short, long, value_delimiter = ',', value_parser = parse_edge)]
        edges: Vec<(u32, u32)>,

        #[arg(long)]
        directed: bool,

        #[arg(short, long, default_value_t = 0)]
        start: u32,
    },

    /// Check sort or search invariants over random inputs.
    Verify {
        #[command(subcommand)]
        target: VerifyCommand,

        #[arg(short, long, default_value_t = 200, global = true)]
        iterations: u32,

        #[arg(long, default_value_t = 0, global = true)]
        seed: u64,
    },
}

#[derive(Subcommand)]
enum ProcedureCommand {
    Factorial { n: i64 },
    Fibonacci { n: i64 },
    Hanoi { disks: u32 },
    Power {
        #[arg(allow_hyphen_values = true)]
        base: i64,
        exponent: i64,
    },
    BinarySearch {
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
        values: Vec<i64>,

        #[arg(short, long, allow_hyphen_values = true)]
        target: i64,
    },
}

#[derive(Subcommand)]
enum StackCommand {
    Push {
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },
    Pop,
    Peek,
}

#[derive(Subcommand)]
enum QueueCommand {
    Enqueue {
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },
    Dequeue,
    PeekFront,
    PeekRear,
}

#[derive(Subcommand)]
enum TreeCommand {
    Insert {
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },
    Search {
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },
    Delete {
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },
    InOrder,
    PreOrder,
    PostOrder,
}

#[derive(Subcommand)]
enum VerifyCommand {
    Sort { algorithm: SortAlgorithm },
    Search { algorithm: SearchAlgorithm },
}

fn parse_edge(s: &str) -> Result<(u32, u32), String> {
    let (from, to) = s
        .split_once(':')
        .ok_or_else(|| format!("edge '{}' must be written from:to", s))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .map_err(|e| format!("bad vertex '{}' in edge '{}': {}", v, s, e))
    };
    Ok((parse(from)?, parse(to)?))
}

/// Delay from `--delay-ms`, then `ALGOTRACE_DELAY_MS`, then the default.
fn resolve_delay(flag: Option<u64>) -> Duration {
    if let Some(ms) = flag {
        return Duration::from_millis(ms);
    }
    match std::env::var(DELAY_ENV) {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                tracing::warn!("ignoring invalid {}={:?}", DELAY_ENV, raw);
                DEFAULT_DELAY
            }
        },
        Err(_) => DEFAULT_DELAY,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Verify {
            target,
            iterations,
            seed,
        } => run_verify(target, iterations, seed),
        command => match build_request(command) {
            Ok(request) => run_request(&request, &cli.output).await,
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
    };
    process::exit(exit_code);
}

/// Turns a parsed subcommand into an engine request.
fn build_request(command: Commands) -> Result<AlgorithmRequest, EngineError> {
    let request = match command {
        Commands::Sort { algorithm, values } => AlgorithmRequest::Sort {
            algorithm,
            input: ArraySnapshot::from_values(&values),
        },
        Commands::Search {
            algorithm,
            values,
            target,
        } => AlgorithmRequest::Search {
            algorithm,
            input: ArraySnapshot::from_values(&values),
            target,
        },
        Commands::Recurse { procedure } => AlgorithmRequest::Recursion {
            procedure: match procedure {
                ProcedureCommand::Factorial { n } => RecursiveProcedure::Factorial { n },
                ProcedureCommand::Fibonacci { n } => RecursiveProcedure::Fibonacci { n },
                ProcedureCommand::Hanoi { disks } => RecursiveProcedure::Hanoi { disks },
                ProcedureCommand::Power { base, exponent } => {
                    RecursiveProcedure::Power { base, exponent }
                }
                ProcedureCommand::BinarySearch { values, target } => {
                    RecursiveProcedure::BinarySearch { values, target }
                }
            },
        },
        Commands::Stack {
            capacity,
            values,
            op,
        } => AlgorithmRequest::Stack {
            state: StackSnapshot::with_values(capacity, &values)?,
            op: match op {
                StackCommand::Push { value } => StackOp::Push(value),
                StackCommand::Pop => StackOp::Pop,
                StackCommand::Peek => StackOp::Peek,
            },
        },
        Commands::Queue {
            capacity,
            values,
            op,
        } => AlgorithmRequest::Queue {
            state: QueueSnapshot::with_values(capacity, &values)?,
            op: match op {
                QueueCommand::Enqueue { value } => QueueOp::Enqueue(value),
                QueueCommand::Dequeue => QueueOp::Dequeue,
                QueueCommand::PeekFront => QueueOp::PeekFront,
                QueueCommand::PeekRear => QueueOp::PeekRear,
            },
        },
        Commands::Tree { values, op } => AlgorithmRequest::Tree {
            state: TreeSnapshot::from_values(&values)?,
            op: match op {
                TreeCommand::Insert { value } => TreeOp::Insert(value),
                TreeCommand::Search { value } => TreeOp::Search(value),
                TreeCommand::Delete { value } => TreeOp::Delete(value),
                TreeCommand::InOrder => TreeOp::InOrder,
                TreeCommand::PreOrder => TreeOp::PreOrder,
                TreeCommand::PostOrder => TreeOp::PostOrder,
            },
        },
        Commands::Graph {
            traversal,
            vertices,
            edges,
            directed,
            start,
        } => AlgorithmRequest::Graph {
            state: GraphSnapshot::from_edges(directed, vertices, &edges)?,
            traversal,
            start: NodeId(start),
        },
        Commands::Verify { .. } => {
            return Err(EngineError::Internal {
                message: "verify is not an algorithm request".into(),
            })
        }
    };
    Ok(request)
}

/// Runs a request and presents its trace.
///
/// Returns exit code: 0 = success, 1 = rejected input, 3 = output error,
/// 130 = interrupted.
async fn run_request(request: &AlgorithmRequest, output: &OutputArgs) -> i32 {
    let trace = match run_algorithm(request, &EngineConfig::default()) {
        Ok(trace) => trace,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    if output.json {
        return match serde_json::to_string_pretty(&trace) {
            Ok(json) => {
                println!("{}", json);
                0
            }
            Err(e) => {
                eprintln!("Error: failed to serialize trace: {}", e);
                3
            }
        };
    }

    replay(trace, resolve_delay(output.delay_ms)).await
}

async fn replay(trace: Trace, delay: Duration) -> i32 {
    println!("{} steps", trace.len());
    let mut controller = PlaybackController::new();
    let handle = controller.play(trace, PlaybackConfig { delay }, PrintSink::new());

    tokio::select! {
        outcome = handle.wait() => match outcome {
            PlaybackOutcome::Completed => 0,
            PlaybackOutcome::Cancelled => 130,
        },
        _ = tokio::signal::ctrl_c() => {
            handle.cancel();
            eprintln!("Interrupted after {} steps", handle.position());
            130
        }
    }
}

/// Execute the verify subcommand.
///
/// Returns exit code: 0 = every input passed, 2 = violations found.
fn run_verify(target: VerifyCommand, iterations: u32, seed: u64) -> i32 {
    let target = match target {
        VerifyCommand::Sort { algorithm } => VerifyTarget::Sort(algorithm),
        VerifyCommand::Search { algorithm } => VerifyTarget::Search(algorithm),
    };
    let config = VerifyConfig {
        seeds: vec![vec![], vec![0], vec![2, 2, 1, 1], vec![i64::MAX, i64::MIN, 0]],
        iterations,
        random_seed: seed,
        ..VerifyConfig::default()
    };
    let report = run_verification(target, config);

    println!(
        "{} run, {} passed, {} failed (seed {})",
        report.total_run,
        report.passed,
        report.failures.len(),
        report.random_seed
    );
    for failure in &report.failures {
        match failure.target {
            Some(t) => println!("  {:?} target {}: {}", failure.input, t, failure.violation),
            None => println!("  {:?}: {}", failure.input, failure.violation),
        }
    }
    if report.is_clean() {
        0
    } else {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_edges() {
        assert_eq!(parse_edge("0:3"), Ok((0, 3)));
        assert_eq!(parse_edge(" 2 : 1 "), Ok((2, 1)));
        assert!(parse_edge("0-3").is_err());
        assert!(parse_edge("a:1").is_err());
    }

    #[test]
    fn flag_overrides_environment_delay() {
        assert_eq!(resolve_delay(Some(5)), Duration::from_millis(5));
    }

    #[test]
    fn cli_builds_requests() {
        let cli = Cli::parse_from(["algotrace", "sort", "merge", "--values", "3,-1,2"]);
        let request = build_request(cli.command).unwrap();
        assert_eq!(
            request,
            AlgorithmRequest::Sort {
                algorithm: SortAlgorithm::Merge,
                input: ArraySnapshot::from_values(&[3, -1, 2]),
            }
        );

        let cli = Cli::parse_from(["algotrace", "queue", "-c", "2", "-v", "1,2", "enqueue", "3"]);
        assert!(matches!(
            build_request(cli.command),
            Ok(AlgorithmRequest::Queue {
                op: QueueOp::Enqueue(3),
                ..
            })
        ));

        let cli = Cli::parse_from(["algotrace", "tree", "-v", "1,1", "in-order"]);
        assert_eq!(
            build_request(cli.command),
            Err(EngineError::DuplicateValue { value: 1 })
        );
    }

    #[test]
    fn graph_flags() {
        let cli = Cli::parse_from([
            "algotrace", "--json", "graph", "bfs", "-n", "3", "-e", "0:1,1:2", "--start", "1",
        ]);
        assert!(cli.output.json);
        assert!(matches!(
            build_request(cli.command),
            Ok(AlgorithmRequest::Graph { start: NodeId(1), .. })
        ));
    }
}

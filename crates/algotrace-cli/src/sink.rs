//! Terminal rendering of replayed steps.

use algotrace_core::{Role, Snapshot, Step, Subject, TraceResult};
use algotrace_playback::{PlaybackSink, VisualState};

/// Prints one line per step, followed by the container state when the step
/// carries a snapshot.
#[derive(Debug, Default)]
pub struct PrintSink;

impl PrintSink {
    pub fn new() -> Self {
        PrintSink
    }
}

impl PlaybackSink for PrintSink {
    fn on_step(&mut self, index: usize, step: &Step, state: &VisualState) {
        println!("[{:>4}] {:<12} {}", index, format!("{:?}", step.kind()), step.description);
        if let Some(snapshot) = &step.snapshot {
            println!("       {}", render(snapshot, state));
        }
    }

    fn on_complete(&mut self, result: &TraceResult) {
        println!("=> {}", result.summary());
    }
}

/// Single-character marker for a role; normal subjects get none.
fn marker(role: Role) -> &'static str {
    match role {
        Role::Normal => "",
        Role::Comparing => "?",
        Role::Swapping => "~",
        Role::Sorted => "*",
        Role::Pivot => "p:",
        Role::Min => "m:",
        Role::Found => "!",
        Role::Visited => "v:",
        Role::Range => "r:",
        Role::Front => "F:",
        Role::Rear => "R:",
        Role::Top => "T:",
        Role::Active => ">",
        Role::Completed => "c:",
        Role::BaseCase => "b:",
    }
}

fn cell(subject: Subject, value: i64, state: &VisualState) -> String {
    format!("{}{}", marker(state.role(&subject)), value)
}

/// One-line view of `snapshot` with role markers from `state`.
pub fn render(snapshot: &Snapshot, state: &VisualState) -> String {
    let cells: Vec<String> = match snapshot {
        Snapshot::Array(a) => a
            .elements()
            .iter()
            .map(|e| cell(Subject::Element(e.id), e.value, state))
            .collect(),
        Snapshot::Stack(s) => s
            .elements()
            .iter()
            .map(|e| cell(Subject::Element(e.id), e.value, state))
            .collect(),
        Snapshot::Queue(q) => q
            .slots()
            .iter()
            .map(|slot| match slot {
                Some(e) => cell(Subject::Element(e.id), e.value, state),
                None => "_".to_string(),
            })
            .collect(),
        Snapshot::Tree(t) => {
            return format!("in-order {:?} height {}", t.in_order_values(), t.height());
        }
        Snapshot::Graph(g) => g
            .vertices()
            .iter()
            .map(|v| cell(Subject::Node(v.id), v.value, state))
            .collect(),
    };
    format!("[{}]", cells.join(" "))
}

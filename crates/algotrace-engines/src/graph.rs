//! Breadth-first and depth-first traversal.
//!
//! The graph is read through its petgraph adjacency map. Neighbours are
//! explored in ascending id order so the visiting order depends only on the
//! vertex and edge sets, never on insertion order.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};

use algotrace_core::{
    EngineError, GraphSnapshot, NodeId, Role, Step, StepEvent, Subject, Trace, TraceRecorder,
    TraceResult,
};

use crate::EngineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GraphTraversal {
    BreadthFirst,
    DepthFirst,
}

impl GraphTraversal {
    pub fn name(self) -> &'static str {
        match self {
            GraphTraversal::BreadthFirst => "bfs",
            GraphTraversal::DepthFirst => "dfs",
        }
    }
}

impl fmt::Display for GraphTraversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphTraversal::BreadthFirst => f.write_str("breadth-first traversal"),
            GraphTraversal::DepthFirst => f.write_str("depth-first traversal"),
        }
    }
}

impl FromStr for GraphTraversal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bfs" | "breadth-first" => Ok(GraphTraversal::BreadthFirst),
            "dfs" | "depth-first" => Ok(GraphTraversal::DepthFirst),
            other => Err(format!("unknown traversal '{}'", other)),
        }
    }
}

/// Traverses `state` from `start`, visiting every reachable vertex once.
pub fn traverse_graph(
    state: &GraphSnapshot,
    traversal: GraphTraversal,
    start: NodeId,
    config: &EngineConfig,
) -> Result<Trace, EngineError> {
    if !state.contains(start) {
        return Err(EngineError::UnknownVertex { node: start });
    }
    let mut t = GraphTracer {
        graph: state.clone(),
        adjacency: state.adjacency(),
        rec: TraceRecorder::new(config.capture_snapshots),
        discovered: HashSet::new(),
        order: Vec::new(),
    };
    match traversal {
        GraphTraversal::BreadthFirst => t.breadth_first(start),
        GraphTraversal::DepthFirst => t.depth_first(start),
    }
    let GraphTracer { rec, order, .. } = t;
    Ok(rec.finish(TraceResult::Traversal(order)))
}

struct GraphTracer {
    graph: GraphSnapshot,
    adjacency: DiGraphMap<NodeId, ()>,
    rec: TraceRecorder,
    discovered: HashSet<NodeId>,
    order: Vec<NodeId>,
}

impl GraphTracer {
    fn neighbours(&self, node: NodeId) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self.adjacency.neighbors(node).collect();
        out.sort();
        out.dedup();
        out
    }

    fn discover(&mut self, node: NodeId) {
        self.discovered.insert(node);
        self.rec.record(
            Step::new(
                StepEvent::SetRole { role: Role::Active },
                format!("Discover vertex {}", node),
            )
            .with_subject(Subject::Node(node)),
            &self.graph,
        );
    }

    fn visit(&mut self, node: NodeId) {
        self.order.push(node);
        self.rec.record(
            Step::new(StepEvent::VisitNode { node }, format!("Visit vertex {}", node))
                .with_subject(Subject::Node(node)),
            &self.graph,
        );
    }

    fn breadth_first(&mut self, start: NodeId) {
        let mut queue = VecDeque::from([start]);
        self.discover(start);
        while let Some(node) = queue.pop_front() {
            self.visit(node);
            for next in self.neighbours(node) {
                if !self.discovered.contains(&next) {
                    self.discover(next);
                    queue.push_back(next);
                }
            }
        }
    }

    fn depth_first(&mut self, node: NodeId) {
        self.discover(node);
        self.visit(node);
        for next in self.neighbours(node) {
            if !self.discovered.contains(&next) {
                self.depth_first(next);
            }
        }
        self.rec.record(
            Step::new(
                StepEvent::SetRole {
                    role: Role::Completed,
                },
                format!("Vertex {} is finished", node),
            )
            .with_subject(Subject::Node(node)),
            &self.graph,
        );
    }
}

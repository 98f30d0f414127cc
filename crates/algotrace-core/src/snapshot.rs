//! Point-in-time values of the containers an algorithm works on.
//!
//! Every snapshot is a plain value: `Clone` is a deep copy and nothing inside
//! is shared, so an engine can freely keep a copy per recorded step. Element
//! and node identities are assigned once and never reassigned, which lets the
//! projector follow an element across swaps.
//!
//! Five container shapes exist:
//!
//! - [`ArraySnapshot`]: contiguous elements, indices `0..len`.
//! - [`StackSnapshot`]: fixed capacity, top is the last element.
//! - [`QueueSnapshot`]: fixed-capacity circular buffer with explicit empty slots.
//! - [`TreeSnapshot`]: arena of [`TreeNode`]s addressed by [`NodeId`].
//! - [`GraphSnapshot`]: vertex and edge lists, convertible to a petgraph map.

use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};

use crate::error::{CapacityError, EngineError};
use crate::id::{ElementId, NodeId};
use crate::step::Subject;

/// One addressable unit of a linear container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Element {
    /// Stable identity, survives reordering.
    pub id: ElementId,
    /// Current slot.
    pub index: usize,
    pub value: i64,
}

// ---------------------------------------------------------------------------
// Array
// ---------------------------------------------------------------------------

/// Contiguous sequence of elements; `elements[i].index == i` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArraySnapshot {
    elements: Vec<Element>,
}

impl ArraySnapshot {
    /// Builds an array whose element identities follow input order (0..n).
    pub fn from_values(values: &[i64]) -> Self {
        let elements = values
            .iter()
            .enumerate()
            .map(|(index, &value)| Element {
                id: ElementId(index as u32),
                index,
                value,
            })
            .collect();
        ArraySnapshot { elements }
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    /// Value at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`. Engines only call this with in-range
    /// indices derived from the array length.
    pub fn value(&self, index: usize) -> i64 {
        self.elements[index].value
    }

    /// Identity of the element at `index`. Same panic contract as [`value`](Self::value).
    pub fn id(&self, index: usize) -> ElementId {
        self.elements[index].id
    }

    pub fn values(&self) -> Vec<i64> {
        self.elements.iter().map(|e| e.value).collect()
    }

    pub fn ids(&self) -> Vec<ElementId> {
        self.elements.iter().map(|e| e.id).collect()
    }

    /// Exchanges two slots, keeping each element's `index` field current.
    pub fn swap(&mut self, a: usize, b: usize) {
        self.elements.swap(a, b);
        self.elements[a].index = a;
        self.elements[b].index = b;
    }

    /// True when values are non-descending.
    pub fn is_sorted(&self) -> bool {
        self.elements.windows(2).all(|w| w[0].value <= w[1].value)
    }
}

// ---------------------------------------------------------------------------
// Stack
// ---------------------------------------------------------------------------

/// Fixed-capacity stack. The last element is the top.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackSnapshot {
    capacity: usize,
    elements: Vec<Element>,
    next_id: u32,
}

impl StackSnapshot {
    pub fn new(capacity: usize) -> Result<Self, EngineError> {
        if capacity == 0 {
            return Err(EngineError::InvalidCapacity { capacity });
        }
        Ok(StackSnapshot {
            capacity,
            elements: Vec::with_capacity(capacity),
            next_id: 0,
        })
    }

    /// Builds a stack with `values` pushed bottom to top.
    pub fn with_values(capacity: usize, values: &[i64]) -> Result<Self, EngineError> {
        let mut stack = Self::new(capacity)?;
        for &value in values {
            stack.push(value).map_err(|_| EngineError::OutOfRange {
                parameter: "values".into(),
                value: values.len() as i64,
                reason: format!("stack capacity is {}", capacity),
            })?;
        }
        Ok(stack)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.elements.len() == self.capacity
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn top(&self) -> Option<&Element> {
        self.elements.last()
    }

    pub fn push(&mut self, value: i64) -> Result<Element, CapacityError> {
        if self.is_full() {
            return Err(CapacityError::Overflow {
                capacity: self.capacity,
            });
        }
        let element = Element {
            id: ElementId(self.next_id),
            index: self.elements.len(),
            value,
        };
        self.next_id += 1;
        self.elements.push(element);
        Ok(element)
    }

    pub fn pop(&mut self) -> Result<Element, CapacityError> {
        self.elements.pop().ok_or(CapacityError::Underflow)
    }
}

// ---------------------------------------------------------------------------
// Circular queue
// ---------------------------------------------------------------------------

/// Fixed-capacity circular queue.
///
/// `None` slots are empty. `front` is the slot the next dequeue reads and
/// `rear` the slot of the most recent enqueue; both advance with
/// `(index + 1) % capacity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    capacity: usize,
    slots: Vec<Option<Element>>,
    front: usize,
    rear: usize,
    len: usize,
    next_id: u32,
}

impl QueueSnapshot {
    pub fn new(capacity: usize) -> Result<Self, EngineError> {
        if capacity == 0 {
            return Err(EngineError::InvalidCapacity { capacity });
        }
        Ok(QueueSnapshot {
            capacity,
            slots: vec![None; capacity],
            front: 0,
            rear: capacity - 1,
            len: 0,
            next_id: 0,
        })
    }

    /// Builds a queue with `values` enqueued in order.
    pub fn with_values(capacity: usize, values: &[i64]) -> Result<Self, EngineError> {
        let mut queue = Self::new(capacity)?;
        for &value in values {
            queue.enqueue(value).map_err(|_| EngineError::OutOfRange {
                parameter: "values".into(),
                value: values.len() as i64,
                reason: format!("queue capacity is {}", capacity),
            })?;
        }
        Ok(queue)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    pub fn slots(&self) -> &[Option<Element>] {
        &self.slots
    }

    /// Slot of the front element, if any.
    pub fn front_index(&self) -> Option<usize> {
        (self.len > 0).then_some(self.front)
    }

    /// Slot of the rear element, if any.
    pub fn rear_index(&self) -> Option<usize> {
        (self.len > 0).then_some(self.rear)
    }

    pub fn front(&self) -> Option<&Element> {
        self.front_index().and_then(|i| self.slots[i].as_ref())
    }

    pub fn rear(&self) -> Option<&Element> {
        self.rear_index().and_then(|i| self.slots[i].as_ref())
    }

    /// Slot the next enqueue will write.
    pub fn next_rear_slot(&self) -> usize {
        (self.rear + 1) % self.capacity
    }

    /// Elements in dequeue order.
    pub fn elements(&self) -> Vec<Element> {
        (0..self.len)
            .filter_map(|offset| self.slots[(self.front + offset) % self.capacity])
            .collect()
    }

    pub fn enqueue(&mut self, value: i64) -> Result<Element, CapacityError> {
        if self.is_full() {
            return Err(CapacityError::Overflow {
                capacity: self.capacity,
            });
        }
        let slot = self.next_rear_slot();
        let element = Element {
            id: ElementId(self.next_id),
            index: slot,
            value,
        };
        self.next_id += 1;
        self.slots[slot] = Some(element);
        self.rear = slot;
        self.len += 1;
        Ok(element)
    }

    pub fn dequeue(&mut self) -> Result<Element, CapacityError> {
        if self.is_empty() {
            return Err(CapacityError::Underflow);
        }
        let element = self.slots[self.front]
            .take()
            .ok_or(CapacityError::Underflow)?;
        self.front = (self.front + 1) % self.capacity;
        self.len -= 1;
        Ok(element)
    }
}

// ---------------------------------------------------------------------------
// Binary search tree
// ---------------------------------------------------------------------------

/// Which child link of a parent a node hangs from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: NodeId,
    pub value: i64,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    pub parent: Option<NodeId>,
}

/// Arena-backed binary tree.
///
/// `nodes[id]` holds the node with that id; removed nodes leave `None`
/// behind so ids are never reused.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TreeSnapshot {
    nodes: Vec<Option<TreeNode>>,
    root: Option<NodeId>,
}

impl TreeSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `values` in order with binary-search-tree placement.
    pub fn from_values(values: &[i64]) -> Result<Self, EngineError> {
        let mut tree = Self::new();
        for &value in values {
            if tree.contains(value) {
                return Err(EngineError::DuplicateValue { value });
            }
            let mut parent = None;
            let mut side = Side::Left;
            let mut cursor = tree.root;
            while let Some(id) = cursor {
                let node = tree.expect_node(id)?;
                parent = Some(id);
                if value < node.value {
                    side = Side::Left;
                    cursor = node.left;
                } else {
                    side = Side::Right;
                    cursor = node.right;
                }
            }
            tree.attach(parent, side, value)?;
        }
        Ok(tree)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0 as usize).and_then(|slot| slot.as_ref())
    }

    /// Like [`node`](Self::node) but reports a dangling link as an internal error.
    pub fn expect_node(&self, id: NodeId) -> Result<&TreeNode, EngineError> {
        self.node(id).ok_or_else(|| EngineError::Internal {
            message: format!("dangling tree link to NodeId({})", id),
        })
    }

    fn expect_node_mut(&mut self, id: NodeId) -> Result<&mut TreeNode, EngineError> {
        self.nodes
            .get_mut(id.0 as usize)
            .and_then(|slot| slot.as_mut())
            .ok_or_else(|| EngineError::Internal {
                message: format!("dangling tree link to NodeId({})", id),
            })
    }

    /// Live nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter().filter_map(|slot| slot.as_ref())
    }

    pub fn len(&self) -> usize {
        self.nodes().count()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn find(&self, value: i64) -> Option<NodeId> {
        let mut cursor = self.root;
        while let Some(id) = cursor {
            let node = self.node(id)?;
            if value == node.value {
                return Some(id);
            }
            cursor = if value < node.value {
                node.left
            } else {
                node.right
            };
        }
        None
    }

    pub fn contains(&self, value: i64) -> bool {
        self.find(value).is_some()
    }

    pub fn in_order_values(&self) -> Vec<i64> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = Vec::new();
        let mut cursor = self.root;
        loop {
            while let Some(id) = cursor {
                stack.push(id);
                cursor = self.node(id).and_then(|n| n.left);
            }
            let Some(id) = stack.pop() else { break };
            if let Some(node) = self.node(id) {
                out.push(node.value);
                cursor = node.right;
            }
        }
        out
    }

    /// Checks the ordering invariant: strictly increasing in-order values.
    pub fn is_valid_bst(&self) -> bool {
        self.in_order_values().windows(2).all(|w| w[0] < w[1])
    }

    /// Number of levels; an empty tree has height 0.
    pub fn height(&self) -> usize {
        fn level(tree: &TreeSnapshot, id: Option<NodeId>) -> usize {
            match id.and_then(|id| tree.node(id)) {
                Some(node) => 1 + level(tree, node.left).max(level(tree, node.right)),
                None => 0,
            }
        }
        level(self, self.root)
    }

    /// Allocates a new node under `parent` (or as root when `parent` is None).
    pub fn attach(
        &mut self,
        parent: Option<NodeId>,
        side: Side,
        value: i64,
    ) -> Result<NodeId, EngineError> {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(TreeNode {
            id,
            value,
            left: None,
            right: None,
            parent,
        }));
        match parent {
            None => self.root = Some(id),
            Some(p) => {
                let parent_node = self.expect_node_mut(p)?;
                match side {
                    Side::Left => parent_node.left = Some(id),
                    Side::Right => parent_node.right = Some(id),
                }
            }
        }
        Ok(id)
    }

    /// Overwrites a node's value in place. Returns the old value.
    pub fn set_value(&mut self, id: NodeId, value: i64) -> Result<i64, EngineError> {
        let node = self.expect_node_mut(id)?;
        Ok(std::mem::replace(&mut node.value, value))
    }

    /// Removes a node with at most one child, lifting that child into its place.
    pub fn splice_out(&mut self, id: NodeId) -> Result<TreeNode, EngineError> {
        let node = self.expect_node(id)?.clone();
        let child = match (node.left, node.right) {
            (Some(_), Some(_)) => {
                return Err(EngineError::Internal {
                    message: format!("cannot splice NodeId({}) with two children", id),
                })
            }
            (left, right) => left.or(right),
        };
        if let Some(c) = child {
            self.expect_node_mut(c)?.parent = node.parent;
        }
        match node.parent {
            None => self.root = child,
            Some(p) => {
                let parent = self.expect_node_mut(p)?;
                if parent.left == Some(id) {
                    parent.left = child;
                } else {
                    parent.right = child;
                }
            }
        }
        self.nodes[id.0 as usize] = None;
        Ok(node)
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: NodeId,
    pub value: i64,
}

/// Vertex/edge lists. Undirected graphs store each edge once.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    directed: bool,
    vertices: Vec<Vertex>,
    edges: Vec<(NodeId, NodeId)>,
}

impl GraphSnapshot {
    pub fn new(directed: bool) -> Self {
        GraphSnapshot {
            directed,
            ..Default::default()
        }
    }

    /// Builds a graph with vertices `0..vertex_count` (value = id) and the given edges.
    pub fn from_edges(
        directed: bool,
        vertex_count: u32,
        edges: &[(u32, u32)],
    ) -> Result<Self, EngineError> {
        let mut graph = Self::new(directed);
        for v in 0..vertex_count {
            graph.add_vertex(v as i64);
        }
        for &(a, b) in edges {
            graph.add_edge(NodeId(a), NodeId(b))?;
        }
        Ok(graph)
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[(NodeId, NodeId)] {
        &self.edges
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.vertices.iter().any(|v| v.id == id)
    }

    pub fn add_vertex(&mut self, value: i64) -> NodeId {
        let id = NodeId(self.vertices.len() as u32);
        self.vertices.push(Vertex { id, value });
        id
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> Result<(), EngineError> {
        for node in [from, to] {
            if !self.contains(node) {
                return Err(EngineError::UnknownVertex { node });
            }
        }
        self.edges.push((from, to));
        Ok(())
    }

    /// Adjacency map; undirected edges appear in both directions.
    pub fn adjacency(&self) -> DiGraphMap<NodeId, ()> {
        let mut map = DiGraphMap::new();
        for v in &self.vertices {
            map.add_node(v.id);
        }
        for &(a, b) in &self.edges {
            map.add_edge(a, b, ());
            if !self.directed {
                map.add_edge(b, a, ());
            }
        }
        map
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Any visualizable container state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Snapshot {
    Array(ArraySnapshot),
    Stack(StackSnapshot),
    Queue(QueueSnapshot),
    Tree(TreeSnapshot),
    Graph(GraphSnapshot),
}

impl Snapshot {
    /// Every identity present in this snapshot, in container order.
    pub fn subjects(&self) -> Vec<Subject> {
        match self {
            Snapshot::Array(a) => a.ids().into_iter().map(Subject::Element).collect(),
            Snapshot::Stack(s) => s.elements().iter().map(|e| Subject::Element(e.id)).collect(),
            Snapshot::Queue(q) => q
                .elements()
                .into_iter()
                .map(|e| Subject::Element(e.id))
                .collect(),
            Snapshot::Tree(t) => t.nodes().map(|n| Subject::Node(n.id)).collect(),
            Snapshot::Graph(g) => g.vertices().iter().map(|v| Subject::Node(v.id)).collect(),
        }
    }
}

impl From<ArraySnapshot> for Snapshot {
    fn from(s: ArraySnapshot) -> Self {
        Snapshot::Array(s)
    }
}

impl From<StackSnapshot> for Snapshot {
    fn from(s: StackSnapshot) -> Self {
        Snapshot::Stack(s)
    }
}

impl From<QueueSnapshot> for Snapshot {
    fn from(s: QueueSnapshot) -> Self {
        Snapshot::Queue(s)
    }
}

impl From<TreeSnapshot> for Snapshot {
    fn from(s: TreeSnapshot) -> Self {
        Snapshot::Tree(s)
    }
}

impl From<GraphSnapshot> for Snapshot {
    fn from(s: GraphSnapshot) -> Self {
        Snapshot::Graph(s)
    }
}

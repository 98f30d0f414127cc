//! Activation tree for recursive procedures.
//!
//! Each [`CallNode`] is owned by the tree arena and linked to its parent; the
//! children list is append-only and a node is frozen once its return value is
//! resolved.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::id::CallId;

/// One activation of a recursive function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallNode {
    pub id: CallId,
    pub function: String,
    pub parameters: Vec<i64>,
    pub return_value: Option<i64>,
    /// Root is depth 0.
    pub depth: usize,
    pub parent: Option<CallId>,
    pub children: Vec<CallId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CallTree {
    nodes: Vec<CallNode>,
}

impl CallTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new activation under `parent` (root when `None`).
    pub fn enter(
        &mut self,
        parent: Option<CallId>,
        function: &str,
        parameters: Vec<i64>,
    ) -> Result<CallId, EngineError> {
        let id = CallId(self.nodes.len() as u32);
        let depth = match parent {
            None => 0,
            Some(p) => {
                let parent_node = self.node_mut(p)?;
                if parent_node.return_value.is_some() {
                    return Err(EngineError::Internal {
                        message: format!("call {} already returned", p),
                    });
                }
                parent_node.children.push(id);
                parent_node.depth + 1
            }
        };
        self.nodes.push(CallNode {
            id,
            function: function.to_string(),
            parameters,
            return_value: None,
            depth,
            parent,
            children: Vec::new(),
        });
        Ok(id)
    }

    /// Sets the return value. Resolving twice is an internal error.
    pub fn resolve(&mut self, id: CallId, value: i64) -> Result<(), EngineError> {
        let node = self.node_mut(id)?;
        if node.return_value.is_some() {
            return Err(EngineError::Internal {
                message: format!("call {} resolved twice", id),
            });
        }
        node.return_value = Some(value);
        Ok(())
    }

    pub fn get(&self, id: CallId) -> Option<&CallNode> {
        self.nodes.get(id.0 as usize)
    }

    fn node_mut(&mut self, id: CallId) -> Result<&mut CallNode, EngineError> {
        self.nodes
            .get_mut(id.0 as usize)
            .ok_or_else(|| EngineError::Internal {
                message: format!("unknown call {}", id),
            })
    }

    pub fn root(&self) -> Option<&CallNode> {
        self.nodes.first()
    }

    pub fn nodes(&self) -> &[CallNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of levels; a lone root has height 1.
    pub fn height(&self) -> usize {
        self.nodes.iter().map(|n| n.depth + 1).max().unwrap_or(0)
    }

    /// True when every activation has a return value.
    pub fn is_complete(&self) -> bool {
        self.nodes.iter().all(|n| n.return_value.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_and_children_follow_nesting() {
        let mut tree = CallTree::new();
        let root = tree.enter(None, "f", vec![2]).unwrap();
        let child = tree.enter(Some(root), "f", vec![1]).unwrap();
        tree.resolve(child, 1).unwrap();
        tree.resolve(root, 2).unwrap();

        assert_eq!(tree.get(child).unwrap().depth, 1);
        assert_eq!(tree.root().unwrap().children, vec![child]);
        assert_eq!(tree.height(), 2);
        assert!(tree.is_complete());
    }

    #[test]
    fn resolved_calls_are_frozen() {
        let mut tree = CallTree::new();
        let root = tree.enter(None, "f", vec![]).unwrap();
        tree.resolve(root, 0).unwrap();
        assert!(tree.resolve(root, 1).is_err());
        assert!(tree.enter(Some(root), "f", vec![]).is_err());
    }
}

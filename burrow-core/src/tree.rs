//! Discovery tree.
//!
//! An arena of nodes addressed by [`NodeId`]. Children are only ever
//! appended, and once the crawl is sealed the tree is frozen: inserting into
//! a sealed tree is a bug and panics.

use burrow_scanner::ResponseRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// Stable handle to a node in a [`DiscoveryTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub word: String,
    /// `None` only for the root
    pub record: Option<ResponseRecord>,
    pub parent: Option<NodeId>,
    pub depth: usize,
    children: Vec<NodeId>,
}

impl TreeNode {
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Traversal order for exporters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalOrder {
    DepthFirst,
    BreadthFirst,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryTree {
    nodes: Vec<TreeNode>,
    root: Option<NodeId>,
    #[serde(default)]
    sealed: bool,
}

impl DiscoveryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node. Without a parent the node becomes the root and any
    /// previous tree is discarded.
    ///
    /// # Panics
    ///
    /// Panics if the tree is sealed or `parent` is not a node of this tree.
    pub fn insert(
        &mut self,
        word: impl Into<String>,
        record: Option<ResponseRecord>,
        parent: Option<NodeId>,
    ) -> NodeId {
        assert!(!self.sealed, "insert into a sealed discovery tree");

        let word = word.into();
        let Some(parent) = parent else {
            self.nodes.clear();
            self.nodes.push(TreeNode {
                word,
                record,
                parent: None,
                depth: 0,
                children: Vec::new(),
            });
            let root = NodeId(0);
            self.root = Some(root);
            return root;
        };

        let depth = match self.nodes.get(parent.0) {
            Some(node) => node.depth + 1,
            None => panic!("parent {} is not part of this tree", parent),
        };

        let id = NodeId(self.nodes.len());
        self.nodes.push(TreeNode {
            word,
            record,
            parent: Some(parent),
            depth,
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0)
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every node reached by descending exactly `depth` edges from the root
    pub fn nodes_at_depth(&self, depth: usize) -> Vec<NodeId> {
        let Some(root) = self.root else {
            return Vec::new();
        };

        let mut level = vec![root];
        for _ in 0..depth {
            level = level
                .iter()
                .flat_map(|id| self.nodes[id.0].children.iter().copied())
                .collect();
            if level.is_empty() {
                break;
            }
        }
        level
    }

    /// Snapshot of depth -> nodes, computed freshly
    pub fn depth_index(&self) -> BTreeMap<usize, Vec<NodeId>> {
        let mut index: BTreeMap<usize, Vec<NodeId>> = BTreeMap::new();
        for id in self.traverse(TraversalOrder::BreadthFirst) {
            index.entry(self.nodes[id.0].depth).or_default().push(id);
        }
        index
    }

    /// Words from the root's child down to `id`; empty for the root itself
    pub fn path(&self, id: NodeId) -> Vec<&str> {
        let mut words = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current.and_then(|c| self.nodes.get(c.0)) {
            if node.parent.is_none() {
                break;
            }
            words.push(node.word.as_str());
            current = node.parent;
        }
        words.reverse();
        words
    }

    pub fn traverse(&self, order: TraversalOrder) -> Vec<NodeId> {
        let Some(root) = self.root else {
            return Vec::new();
        };

        let mut out = Vec::with_capacity(self.nodes.len());
        match order {
            TraversalOrder::DepthFirst => {
                let mut stack = vec![root];
                while let Some(id) = stack.pop() {
                    out.push(id);
                    stack.extend(self.nodes[id.0].children.iter().rev().copied());
                }
            }
            TraversalOrder::BreadthFirst => {
                let mut queue = VecDeque::from([root]);
                while let Some(id) = queue.pop_front() {
                    out.push(id);
                    queue.extend(self.nodes[id.0].children.iter().copied());
                }
            }
        }
        out
    }

    /// Checks the arena links of a tree that did not come from `insert`, such
    /// as one read back from disk. Every parent precedes its children, so a
    /// tree that passes has no cycles and no dangling ids.
    pub fn check_integrity(&self) -> Result<(), String> {
        match (self.root, self.nodes.is_empty()) {
            (None, true) => return Ok(()),
            (Some(NodeId(0)), false) => {}
            (root, _) => {
                return Err(format!(
                    "root {:?} does not match {} stored node(s)",
                    root.map(|r| r.0),
                    self.nodes.len()
                ));
            }
        }

        for (index, node) in self.nodes.iter().enumerate() {
            match node.parent {
                None if index == 0 && node.depth == 0 => {}
                None => return Err(format!("node #{} has no parent", index)),
                Some(parent) => {
                    let parent_node = match self.nodes.get(parent.0) {
                        Some(p) if parent.0 < index => p,
                        _ => return Err(format!("node #{} has invalid parent {}", index, parent)),
                    };
                    if node.depth != parent_node.depth + 1 {
                        return Err(format!("node #{} has inconsistent depth", index));
                    }
                    if !parent_node.children.contains(&NodeId(index)) {
                        return Err(format!("node #{} is missing from its parent", index));
                    }
                }
            }

            for child in &node.children {
                let linked = self
                    .nodes
                    .get(child.0)
                    .is_some_and(|c| c.parent == Some(NodeId(index)));
                if !linked {
                    return Err(format!("node #{} has invalid child {}", index, child));
                }
            }
        }
        Ok(())
    }

    /// Kept responses, i.e. every node except the root
    pub fn discovered(&self) -> impl Iterator<Item = (NodeId, &TreeNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.parent.is_some())
            .map(|(i, node)| (NodeId(i), node))
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }
}

//! The in-memory document tree.
//!
//! A [`Node`] is a name, a string payload, and an ordered list of owned
//! children. Leaves carry data; interior nodes carry children. Child names may
//! repeat, in which case [`Node::find`] returns the first match.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A named tree of string-valued nodes.
///
/// Children are owned values, so a tree can never contain a cycle or share a
/// subtree with another parent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    data: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<Node>,
}

impl Node {
    /// Create an empty node with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: String::new(),
            children: Vec::new(),
        }
    }

    /// Create a leaf node carrying `data`.
    pub fn leaf(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            children: Vec::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The string payload. Empty when the node carries no data.
    #[inline]
    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn set_data(&mut self, data: impl Into<String>) {
        self.data = data.into();
    }

    #[inline]
    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }

    #[inline]
    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }

    /// Whether this node has no children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Append a child, keeping insertion order. Returns a reference to the
    /// stored child so callers can keep filling it.
    pub fn add_child(&mut self, child: Node) -> &mut Node {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Ordered child nodes.
    #[inline]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    #[inline]
    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    /// First child with the given name.
    pub fn find(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First child with the given name, mutably.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// All children with the given name, in order.
    pub fn find_all<'a, 'b>(&'a self, name: &'b str) -> impl Iterator<Item = &'a Node> + 'b
    where
        'a: 'b,
    {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Number of children named `name`.
    pub fn count(&self, name: &str) -> usize {
        self.find_all(name).count()
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn len_recursive(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(Node::len_recursive)
            .sum::<usize>()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

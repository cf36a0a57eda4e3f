//! Decoding typed values and objects out of a [`Node`].

use std::any::Any;

use crate::node::Node;
use crate::serializable::Serializable;
use crate::value::NodeValue;
use crate::DeserializeError;

/// Reads fields from a node.
///
/// Absent and unparsable fields are not errors at this level: `try_read`
/// leaves the destination untouched, which keeps whatever default the caller
/// constructed. Objects decide for themselves which fields are mandatory.
#[derive(Clone, Copy)]
pub struct Reader<'a> {
    node: &'a Node,
    data: Option<&'a dyn Any>,
}

impl<'a> Reader<'a> {
    /// Create a reader with no payload.
    pub fn new(node: &'a Node) -> Self {
        Self { node, data: None }
    }

    /// Create a reader that threads `data` into every nested reader.
    pub fn with_data(node: &'a Node, data: &'a dyn Any) -> Self {
        Self {
            node,
            data: Some(data),
        }
    }

    #[inline]
    pub fn node(&self) -> &'a Node {
        self.node
    }

    #[inline]
    pub fn name(&self) -> &'a str {
        self.node.name()
    }

    /// The raw side-channel payload, if any.
    #[inline]
    pub fn payload(&self) -> Option<&'a dyn Any> {
        self.data
    }

    /// The side-channel payload downcast to `T`.
    pub fn data<T: Any>(&self) -> Option<&'a T> {
        self.data.and_then(|d| d.downcast_ref::<T>())
    }

    /// Like [`data`](Self::data), but missing payloads are an error.
    pub fn require_data<T: Any>(&self) -> Result<&'a T, DeserializeError> {
        self.data::<T>().ok_or(DeserializeError::MissingPayload {
            expected: std::any::type_name::<T>(),
        })
    }

    /// Whether a child named `name` exists.
    pub fn exists(&self, name: &str) -> bool {
        self.node.find(name).is_some()
    }

    /// Reader over the first child named `name`.
    pub fn child(&self, name: &str) -> Option<Reader<'a>> {
        self.node.find(name).map(|node| self.scoped(node))
    }

    /// Reader over the only child named `name`.
    ///
    /// Returns `Ok(None)` when absent and an error when the name repeats.
    pub fn unique_child(&self, name: &str) -> Result<Option<Reader<'a>>, DeserializeError> {
        let mut matches = self.node.find_all(name);
        let first = matches.next();
        if matches.next().is_some() {
            return Err(DeserializeError::DuplicateField {
                name: name.to_owned(),
            });
        }
        Ok(first.map(|node| self.scoped(node)))
    }

    /// Readers over every child, in order.
    pub fn children(&self) -> impl Iterator<Item = Reader<'a>> + 'a {
        let data = self.data;
        self.node
            .children()
            .iter()
            .map(move |node| Reader { node, data })
    }

    /// Parse this node's own data.
    pub fn value<T: NodeValue>(&self) -> Option<T> {
        T::from_node_str(self.node.data())
    }

    /// Parse the child `name` into `out`.
    ///
    /// Returns `false` and leaves `out` unchanged when the child is absent or
    /// its data does not parse.
    pub fn try_read<T: NodeValue>(&self, name: &str, out: &mut T) -> bool {
        match self.read(name) {
            Some(value) => {
                *out = value;
                true
            }
            None => false,
        }
    }

    /// Parse the child `name`.
    pub fn read<T: NodeValue>(&self, name: &str) -> Option<T> {
        self.node
            .find(name)
            .and_then(|node| T::from_node_str(node.data()))
    }

    /// Parse the child `name`, falling back to `default`.
    pub fn read_or<T: NodeValue>(&self, name: &str, default: T) -> T {
        self.read(name).unwrap_or(default)
    }

    /// Deserialize the child `name` into `out`.
    ///
    /// Returns `Ok(false)` when the child is absent, leaving `out` unchanged.
    pub fn read_object<S: Serializable + ?Sized>(
        &self,
        name: &str,
        out: &mut S,
    ) -> Result<bool, DeserializeError> {
        match self.child(name) {
            Some(reader) => {
                out.deserialize(&reader)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Parse every child of `name` as a value, skipping unparsable entries.
    pub fn read_list<T: NodeValue>(&self, name: &str) -> Vec<T> {
        self.node
            .find(name)
            .map(|list| {
                list.children()
                    .iter()
                    .filter_map(|child| T::from_node_str(child.data()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn scoped(&self, node: &'a Node) -> Reader<'a> {
        Reader {
            node,
            data: self.data,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

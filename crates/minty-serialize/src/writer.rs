//! Encoding typed values and objects into a [`Node`].

use std::any::Any;

use crate::node::Node;
use crate::serializable::Serializable;
use crate::value::NodeValue;

/// Writes fields into a node.
///
/// A `Writer` is scoped to one node. Nested objects get a fresh writer bound
/// to their own child node, carrying the same side-channel payload so that
/// deeply nested objects can reach external context (for example the owning
/// scene or the asset engine) without any global lookup.
pub struct Writer<'a> {
    node: &'a mut Node,
    data: Option<&'a dyn Any>,
}

impl<'a> Writer<'a> {
    /// Create a writer with no payload.
    pub fn new(node: &'a mut Node) -> Self {
        Self { node, data: None }
    }

    /// Create a writer that threads `data` into every nested writer.
    pub fn with_data(node: &'a mut Node, data: &'a dyn Any) -> Self {
        Self {
            node,
            data: Some(data),
        }
    }

    #[inline]
    pub fn node(&self) -> &Node {
        self.node
    }

    #[inline]
    pub fn node_mut(&mut self) -> &mut Node {
        self.node
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

    /// Whether a child named `name` has already been written.
    pub fn exists(&self, name: &str) -> bool {
        self.node.find(name).is_some()
    }

    /// Append a leaf holding `value`.
    pub fn write<T: NodeValue>(&mut self, name: &str, value: &T) {
        self.node.add_child(Node::leaf(name, value.to_node_string()));
    }

    /// Append a leaf only when `value` differs from `default`.
    pub fn write_if_changed<T: NodeValue + PartialEq>(&mut self, name: &str, value: &T, default: &T) {
        if value != default {
            self.write(name, value);
        }
    }

    /// Append an optional leaf; `None` writes nothing.
    pub fn write_optional<T: NodeValue>(&mut self, name: &str, value: Option<&T>) {
        if let Some(value) = value {
            self.write(name, value);
        }
    }

    /// Append an empty named node.
    ///
    /// The node is always created, so readers can test for the field with
    /// [`Reader::exists`](crate::reader::Reader::exists).
    pub fn write_name(&mut self, name: &str) {
        self.node.add_child(Node::new(name));
    }

    /// Append a prebuilt node.
    pub fn write_node(&mut self, node: Node) {
        self.node.add_child(node);
    }

    /// Append a child named `name` and serialize `value` into it.
    pub fn write_object<S: Serializable + ?Sized>(&mut self, name: &str, value: &S) {
        let data = self.data;
        let child = self.node.add_child(Node::new(name));
        let mut writer = Writer { node: child, data };
        value.serialize(&mut writer);
    }

    /// Append a child named `name` holding one unnamed leaf per value.
    pub fn write_list<T: NodeValue>(&mut self, name: &str, values: &[T]) {
        let list = self.node.add_child(Node::new(name));
        for value in values {
            list.add_child(Node::leaf("", value.to_node_string()));
        }
    }

    /// Append a child named `name` holding one named child per object.
    pub fn write_objects<'s, S, I>(&mut self, name: &str, items: I)
    where
        S: Serializable + 's,
        I: IntoIterator<Item = (&'s str, &'s S)>,
    {
        let data = self.data;
        let list = self.node.add_child(Node::new(name));
        let mut writer = Writer { node: list, data };
        for (item_name, item) in items {
            writer.write_object(item_name, item);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Reader;
    use crate::DeserializeError;

    #[derive(Default)]
    struct Inner {
        depth: u32,
    }

    impl Serializable for Inner {
        fn serialize(&self, writer: &mut Writer<'_>) {
            // Payload must reach nested writers.
            let marker = writer.data::<&'static str>().copied().unwrap_or("none");
            writer.write("depth", &self.depth);
            writer.write("marker", &marker.to_owned());
        }

        fn deserialize(&mut self, reader: &Reader<'_>) -> Result<(), DeserializeError> {
            reader.try_read("depth", &mut self.depth);
            Ok(())
        }
    }

    #[test]
    fn write_appends_leaves_in_order() {
        let mut node = Node::new("root");
        let mut writer = Writer::new(&mut node);
        writer.write("a", &1i32);
        writer.write("b", &"text".to_owned());
        writer.write("c", &true);

        let names: Vec<_> = node.children().iter().map(Node::name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(node.find("b").unwrap().data(), "text");
    }

    #[test]
    fn write_name_always_creates_node() {
        let mut node = Node::new("root");
        let mut writer = Writer::new(&mut node);
        writer.write_name("flag");
        assert!(writer.exists("flag"));
        assert!(node.find("flag").unwrap().is_leaf());
    }

    #[test]
    fn write_object_threads_payload() {
        let payload: &'static str = "scene-7";
        let mut node = Node::new("root");
        let mut writer = Writer::with_data(&mut node, &payload);
        writer.write_object("inner", &Inner { depth: 3 });

        let inner = node.find("inner").unwrap();
        assert_eq!(inner.find("depth").unwrap().data(), "3");
        assert_eq!(inner.find("marker").unwrap().data(), "scene-7");
    }

    #[test]
    fn write_if_changed_skips_defaults() {
        let mut node = Node::new("root");
        let mut writer = Writer::new(&mut node);
        writer.write_if_changed("volume", &1.0f32, &1.0);
        writer.write_if_changed("pitch", &0.5f32, &1.0);
        assert!(node.find("volume").is_none());
        assert_eq!(node.find("pitch").unwrap().data(), "0.5");
    }

    #[test]
    fn write_list_uses_unnamed_children() {
        let mut node = Node::new("root");
        Writer::new(&mut node).write_list("values", &[1u8, 2, 3]);
        let list = node.find("values").unwrap();
        assert_eq!(list.children().len(), 3);
        assert!(list.children().iter().all(|c| !c.has_name()));
    }
}

//! The two-way serialization capability.

use crate::node::Node;
use crate::reader::Reader;
use crate::writer::Writer;
use crate::DeserializeError;

/// A type that can write itself into a node and restore itself from one.
///
/// `deserialize` updates `self` in place. Fields missing from the node keep
/// whatever value `self` already held, so the usual pattern is to start from
/// `Default` and call `deserialize`.
pub trait Serializable {
    fn serialize(&self, writer: &mut Writer<'_>);

    fn deserialize(&mut self, reader: &Reader<'_>) -> Result<(), DeserializeError>;
}

/// Serialize `value` into a fresh node named `name`.
pub fn to_node<S: Serializable + ?Sized>(name: &str, value: &S) -> Node {
    let mut node = Node::new(name);
    value.serialize(&mut Writer::new(&mut node));
    node
}

/// Build a default `S` and deserialize `node` into it.
pub fn from_node<S: Serializable + Default>(node: &Node) -> Result<S, DeserializeError> {
    let mut value = S::default();
    value.deserialize(&Reader::new(node))?;
    Ok(value)
}

impl<T: Serializable> Serializable for Option<T>
where
    T: Default,
{
    fn serialize(&self, writer: &mut Writer<'_>) {
        if let Some(inner) = self {
            inner.serialize(writer);
        }
    }

    fn deserialize(&mut self, reader: &Reader<'_>) -> Result<(), DeserializeError> {
        if reader.node().is_leaf() && !reader.node().has_data() {
            *self = None;
            return Ok(());
        }
        let mut inner = self.take().unwrap_or_default();
        inner.deserialize(reader)?;
        *self = Some(inner);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Settings {
        volume: f32,
        muted: bool,
    }

    impl Serializable for Settings {
        fn serialize(&self, writer: &mut Writer<'_>) {
            writer.write("volume", &self.volume);
            writer.write("muted", &self.muted);
        }

        fn deserialize(&mut self, reader: &Reader<'_>) -> Result<(), DeserializeError> {
            reader.try_read("volume", &mut self.volume);
            reader.try_read("muted", &mut self.muted);
            Ok(())
        }
    }

    #[test]
    fn to_node_and_back() {
        let settings = Settings {
            volume: 0.75,
            muted: true,
        };
        let node = to_node("Settings", &settings);
        assert_eq!(node.name(), "Settings");
        assert_eq!(from_node::<Settings>(&node).unwrap(), settings);
    }

    #[test]
    fn missing_fields_keep_existing_values() {
        let mut node = Node::new("Settings");
        node.add_child(Node::leaf("muted", "true"));

        let mut settings = Settings {
            volume: 0.3,
            muted: false,
        };
        settings.deserialize(&Reader::new(&node)).unwrap();
        assert_eq!(settings.volume, 0.3);
        assert!(settings.muted);
    }

    #[test]
    fn option_is_none_for_empty_node() {
        let empty = Node::new("Settings");
        let mut value: Option<Settings> = Some(Settings::default());
        value.deserialize(&Reader::new(&empty)).unwrap();
        assert!(value.is_none());

        let node = to_node("Settings", &Settings { volume: 1.0, muted: false });
        value.deserialize(&Reader::new(&node)).unwrap();
        assert_eq!(value.map(|s| s.volume), Some(1.0));
    }
}

//! Built-in components every registry knows about.

use minty_serialize::prelude::*;

/// A human-readable entity name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameComponent {
    pub name: String,
}

impl NameComponent {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Serializable for NameComponent {
    fn serialize(&self, writer: &mut Writer<'_>) {
        writer.write("name", &self.name);
    }

    fn deserialize(&mut self, reader: &Reader<'_>) -> Result<(), DeserializeError> {
        reader.try_read("name", &mut self.name);
        Ok(())
    }
}

/// A free-form grouping label, e.g. `"Player"` or `"Enemy"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagComponent {
    pub tag: String,
}

impl TagComponent {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }
}

impl Serializable for TagComponent {
    fn serialize(&self, writer: &mut Writer<'_>) {
        writer.write("tag", &self.tag);
    }

    fn deserialize(&mut self, reader: &Reader<'_>) -> Result<(), DeserializeError> {
        reader.try_read("tag", &mut self.tag);
        Ok(())
    }
}

/// Frame marker: the entity changed this frame. Cleared at end of frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirtyComponent;

impl Serializable for DirtyComponent {
    fn serialize(&self, _writer: &mut Writer<'_>) {}

    fn deserialize(&mut self, _reader: &Reader<'_>) -> Result<(), DeserializeError> {
        Ok(())
    }
}

/// Frame marker: destroy the entity during the end-of-frame sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DestroyEntityComponent;

impl Serializable for DestroyEntityComponent {
    fn serialize(&self, _writer: &mut Writer<'_>) {}

    fn deserialize(&mut self, _reader: &Reader<'_>) -> Result<(), DeserializeError> {
        Ok(())
    }
}

//! Minty Serialize -- tree-structured serialization for scenes and assets.
//!
//! Every persistent object in the engine writes itself into a [`Node`] tree
//! through a [`Writer`] and restores itself through a [`Reader`]. Both carry an
//! optional, type-erased payload that nested objects can downcast to reach
//! external context while they are being encoded or decoded.
//!
//! Trees render to an indented text form ([`Node::to_text`]) and, through
//! serde, to JSON.
//!
//! # Quick Start
//!
//! ```
//! use minty_serialize::prelude::*;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Health { current: u32, max: u32 }
//!
//! impl Serializable for Health {
//!     fn serialize(&self, writer: &mut Writer<'_>) {
//!         writer.write("current", &self.current);
//!         writer.write("max", &self.max);
//!     }
//!
//!     fn deserialize(&mut self, reader: &Reader<'_>) -> Result<(), DeserializeError> {
//!         reader.try_read("current", &mut self.current);
//!         reader.try_read("max", &mut self.max);
//!         Ok(())
//!     }
//! }
//!
//! let node = to_node("Health", &Health { current: 3, max: 10 });
//! let text = node.to_text();
//! let parsed = Node::parse_text(&text).unwrap();
//! assert_eq!(from_node::<Health>(&parsed).unwrap(), Health { current: 3, max: 10 });
//! ```

#![deny(unsafe_code)]

pub mod node;
pub mod reader;
pub mod serializable;
pub mod text;
pub mod value;
pub mod writer;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while parsing the text form of a node tree.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// A line is indented with spaces or jumps more than one level deeper.
    #[error("line {line}: invalid indentation ({details})")]
    InvalidIndentation { line: usize, details: String },
}

/// Errors produced while restoring an object from a node.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DeserializeError {
    /// The object needs a side-channel payload that was not supplied.
    #[error("missing serialization payload of type {expected}")]
    MissingPayload { expected: &'static str },

    /// A field that must be unique appears more than once.
    #[error("field '{name}' appears more than once")]
    DuplicateField { name: String },

    /// A field is present but its value cannot be used.
    #[error("invalid value for '{field}': {details}")]
    Invalid { field: String, details: String },

    /// A reference to an external resource could not be resolved.
    #[error("unresolved {kind} '{id}': {details}")]
    Unresolved {
        kind: &'static str,
        id: String,
        details: String,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::node::Node;
    pub use crate::reader::Reader;
    pub use crate::serializable::{from_node, to_node, Serializable};
    pub use crate::value::NodeValue;
    pub use crate::writer::Writer;
    pub use crate::{DeserializeError, ParseError};
}

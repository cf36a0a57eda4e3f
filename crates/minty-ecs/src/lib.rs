//! Minty ECS -- sparse-set Entity Component System.
//!
//! This crate provides the entity substrate for Minty scenes. Each component
//! type is stored in its own sparse set (a dense array of values plus a
//! sparse index by entity slot), giving O(1) attach, detach and lookup and
//! contiguous iteration. Generational entity handles make stale references
//! detectable immediately.
//!
//! Components are registered by name so that entities can be written to and
//! restored from [`minty_serialize`] node trees.
//!
//! # Quick Start
//!
//! ```
//! use minty_ecs::prelude::*;
//! use minty_serialize::prelude::*;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Velocity { dx: f32, dy: f32 }
//!
//! impl Serializable for Velocity {
//!     fn serialize(&self, writer: &mut Writer<'_>) {
//!         writer.write("dx", &self.dx);
//!         writer.write("dy", &self.dy);
//!     }
//!
//!     fn deserialize(&mut self, reader: &Reader<'_>) -> Result<(), DeserializeError> {
//!         reader.try_read("dx", &mut self.dx);
//!         reader.try_read("dy", &mut self.dy);
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = EntityRegistry::new();
//! registry.register_component::<Velocity>("Velocity");
//!
//! let ship = registry.create_named("Ship");
//! registry.add(ship, Velocity { dx: 1.0, dy: 0.0 }).unwrap();
//!
//! let node = to_node("Scene", &registry);
//! let mut restored = registry.empty_like();
//! restored.load_entities(&Reader::new(&node)).unwrap();
//!
//! let ship = restored.find_by_name("Ship").unwrap();
//! assert_eq!(restored.get::<Velocity>(ship), Some(&Velocity { dx: 1.0, dy: 0.0 }));
//! ```

#![deny(unsafe_code)]

pub mod component;
pub mod components;
pub mod entity;
pub mod registry;
pub mod storage;
pub mod view;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity was destroyed or never allocated.
    #[error("entity {entity:?} does not exist (destroyed or never allocated)")]
    InvalidEntity { entity: entity::Entity },

    /// A component type or name was referenced that has not been registered.
    #[error(
        "component '{name}'{} not registered. Registered components: [{registered}]",
        on_entity(.entity_index)
    )]
    UnknownComponent {
        name: String,
        /// Position of the offending entity node when loading.
        entity_index: Option<usize>,
        registered: String,
    },

    /// A component name is already taken by a different type.
    #[error("component name '{name}' is already registered for a different type")]
    DuplicateComponentName { name: String },

    /// An entity node lists the same component twice.
    #[error("entity #{entity} has more than one '{component}' component")]
    DuplicateComponent { entity: usize, component: String },

    /// A node that must be unique appears more than once.
    #[error("duplicate '{name}' node")]
    DuplicateNode { name: String },
}

fn on_entity(entity_index: &Option<usize>) -> String {
    entity_index
        .map(|i| format!(" on entity #{i}"))
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::component::{Component, ComponentId, ComponentInfo, ComponentRegistry};
    pub use crate::components::{DestroyEntityComponent, DirtyComponent, NameComponent, TagComponent};
    pub use crate::entity::Entity;
    pub use crate::registry::{EntityRegistry, EntityScope, LoadIssue, LoadReport, ENTITY_NODE};
    pub use crate::view::View;
    pub use crate::EcsError;
}

//! Component type registration and metadata.
//!
//! Every component type must be registered in a [`ComponentRegistry`] under a
//! unique name before it can be stored. The name is what persisted entity
//! nodes use to refer to the component; the [`ComponentId`] indexes the
//! registry's storage table.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use minty_serialize::serializable::Serializable;

use crate::storage::{ErasedStorage, SparseSet};
use crate::EcsError;

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// Marker for types that can be attached to entities.
///
/// Components must serialize themselves and have a default value: loading
/// starts from `Default` and overlays whatever fields the node carries.
pub trait Component: Serializable + Default + Send + Sync + 'static {}

impl<T: Serializable + Default + Send + Sync + 'static> Component for T {}

// ---------------------------------------------------------------------------
// ComponentId
// ---------------------------------------------------------------------------

/// Opaque, lightweight identifier for a registered component type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) u32);

impl ComponentId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// ComponentInfo
// ---------------------------------------------------------------------------

/// Metadata about a registered component type.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    pub id: ComponentId,
    /// Name used for the component's node in persisted entities.
    pub name: String,
    pub type_name: &'static str,
    pub type_id: TypeId,
    /// Transient components (frame markers) are never written out.
    pub persistent: bool,
}

// ---------------------------------------------------------------------------
// ComponentRegistry
// ---------------------------------------------------------------------------

/// Registry mapping Rust types and names to [`ComponentId`]s.
///
/// A type can only be registered once; registering it again returns the
/// existing id and ignores the new name.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    by_type: HashMap<TypeId, ComponentId>,
    by_name: HashMap<String, ComponentId>,
    infos: Vec<ComponentInfo>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under `name`. Returns the id and, for a first
    /// registration, a fresh storage for the caller to keep.
    ///
    /// Fails if `name` is already taken by a different type.
    pub(crate) fn register<T: Component>(
        &mut self,
        name: &str,
        persistent: bool,
    ) -> Result<(ComponentId, Option<Box<dyn ErasedStorage>>), EcsError> {
        let type_id = TypeId::of::<T>();
        if let Some(&existing) = self.by_type.get(&type_id) {
            return Ok((existing, None));
        }
        if self.by_name.contains_key(name) {
            return Err(EcsError::DuplicateComponentName {
                name: name.to_owned(),
            });
        }

        let id = ComponentId(self.infos.len() as u32);
        self.infos.push(ComponentInfo {
            id,
            name: name.to_owned(),
            type_name: std::any::type_name::<T>(),
            type_id,
            persistent,
        });
        self.by_type.insert(type_id, id);
        self.by_name.insert(name.to_owned(), id);
        tracing::trace!(component = name, id = id.0, persistent, "registered component");
        Ok((id, Some(Box::new(SparseSet::<T>::new()))))
    }

    pub fn lookup<T: 'static>(&self) -> Option<ComponentId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<ComponentId> {
        self.by_name.get(name).copied()
    }

    pub fn info(&self, id: ComponentId) -> Option<&ComponentInfo> {
        self.infos.get(id.index())
    }

    /// Registered components in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentInfo> {
        self.infos.iter()
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Names of all registered components, sorted.
    pub fn registered_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use minty_serialize::prelude::*;

    #[derive(Debug, Default)]
    struct Pos {
        x: f32,
    }

    impl Serializable for Pos {
        fn serialize(&self, writer: &mut Writer<'_>) {
            writer.write("x", &self.x);
        }

        fn deserialize(&mut self, reader: &Reader<'_>) -> Result<(), DeserializeError> {
            reader.try_read("x", &mut self.x);
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct Marker;

    impl Serializable for Marker {
        fn serialize(&self, _writer: &mut Writer<'_>) {}

        fn deserialize(&mut self, _reader: &Reader<'_>) -> Result<(), DeserializeError> {
            Ok(())
        }
    }

    #[test]
    fn register_assigns_sequential_ids() {
        let mut reg = ComponentRegistry::new();
        let (pos, storage) = reg.register::<Pos>("Pos", true).unwrap();
        assert!(storage.is_some());
        let (marker, _) = reg.register::<Marker>("Marker", false).unwrap();
        assert_ne!(pos, marker);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.lookup::<Pos>(), Some(pos));
        assert_eq!(reg.lookup_by_name("Marker"), Some(marker));
        assert!(!reg.info(marker).unwrap().persistent);
    }

    #[test]
    fn reregistering_returns_existing() {
        let mut reg = ComponentRegistry::new();
        let (first, _) = reg.register::<Pos>("Pos", true).unwrap();
        let (second, storage) = reg.register::<Pos>("Other", true).unwrap();
        assert_eq!(first, second);
        assert!(storage.is_none());
        assert_eq!(reg.lookup_by_name("Other"), None);
    }

    #[test]
    fn name_collision_is_an_error() {
        let mut reg = ComponentRegistry::new();
        reg.register::<Pos>("Thing", true).unwrap();
        let err = reg.register::<Marker>("Thing", true).err();
        assert!(matches!(err, Some(EcsError::DuplicateComponentName { ref name }) if name == "Thing"));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.lookup::<Marker>(), None);
    }

    #[test]
    fn registered_names_sorted() {
        let mut reg = ComponentRegistry::new();
        reg.register::<Pos>("b", true).unwrap();
        reg.register::<Marker>("a", true).unwrap();
        assert_eq!(reg.registered_names(), vec!["a", "b"]);
        let order: Vec<_> = reg.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(order, vec!["b", "a"]);
    }
}

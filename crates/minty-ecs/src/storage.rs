//! Sparse-set component storage.
//!
//! Each registered component type gets one [`SparseSet`]. Values live in a
//! dense `Vec<T>` next to a dense list of their owning entities; a sparse
//! table indexed by entity slot points into the dense arrays. Insert, remove
//! and lookup are O(1), and iteration walks contiguous memory.
//!
//! The registry holds storages type-erased as `Box<dyn ErasedStorage>` so it
//! can destroy, clear and (de)serialize components without knowing their
//! concrete types.

use std::any::Any;

use minty_serialize::reader::Reader;
use minty_serialize::serializable::Serializable;
use minty_serialize::writer::Writer;
use minty_serialize::DeserializeError;

use crate::component::Component;
use crate::entity::Entity;

const EMPTY: u32 = u32::MAX;

// ---------------------------------------------------------------------------
// SparseSet
// ---------------------------------------------------------------------------

/// Dense storage for one component type.
#[derive(Debug)]
pub struct SparseSet<T> {
    /// Entity slot index -> position in `dense`, or `EMPTY`.
    sparse: Vec<u32>,
    dense: Vec<Entity>,
    values: Vec<T>,
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
            values: Vec::new(),
        }
    }
}

impl<T> SparseSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn position(&self, entity: Entity) -> Option<usize> {
        let slot = *self.sparse.get(entity.index() as usize)?;
        if slot == EMPTY {
            return None;
        }
        let pos = slot as usize;
        // A stale handle shares the slot index but not the generation.
        (self.dense[pos] == entity).then_some(pos)
    }

    /// Insert or replace the value for `entity`.
    pub fn insert(&mut self, entity: Entity, value: T) -> &mut T {
        if let Some(pos) = self.position(entity) {
            self.values[pos] = value;
            return &mut self.values[pos];
        }
        let idx = entity.index() as usize;
        if idx >= self.sparse.len() {
            self.sparse.resize(idx + 1, EMPTY);
        }
        // A recycled slot may still point at the previous owner's entry.
        if self.sparse[idx] != EMPTY {
            let stale = self.dense[self.sparse[idx] as usize];
            self.remove(stale);
        }
        self.sparse[idx] = self.dense.len() as u32;
        self.dense.push(entity);
        self.values.push(value);
        let last = self.values.len() - 1;
        &mut self.values[last]
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.position(entity).map(|pos| &self.values[pos])
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.position(entity).map(move |pos| &mut self.values[pos])
    }

    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.position(entity).is_some()
    }

    /// Remove and return the value for `entity`. The last element is moved
    /// into the freed position.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let pos = self.position(entity)?;
        self.sparse[entity.index() as usize] = EMPTY;
        let value = self.values.swap_remove(pos);
        self.dense.swap_remove(pos);
        if let Some(&moved) = self.dense.get(pos) {
            self.sparse[moved.index() as usize] = pos as u32;
        }
        Some(value)
    }

    /// Owning entities in dense order.
    #[inline]
    pub fn entities(&self) -> &[Entity] {
        &self.dense
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub fn clear(&mut self) {
        self.sparse.clear();
        self.dense.clear();
        self.values.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> + '_ {
        self.dense.iter().copied().zip(self.values.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> + '_ {
        self.dense.iter().copied().zip(self.values.iter_mut())
    }
}

// ---------------------------------------------------------------------------
// ErasedStorage
// ---------------------------------------------------------------------------

/// Type-erased view of a [`SparseSet`], used by the registry for operations
/// that span every component type.
pub trait ErasedStorage: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn contains(&self, entity: Entity) -> bool;

    /// Drop the component of `entity`, if present.
    fn erase(&mut self, entity: Entity) -> bool;

    fn entities(&self) -> &[Entity];

    fn len(&self) -> usize;

    fn clear(&mut self);

    /// Write the component of `entity` into `writer`. Returns `false` if the
    /// entity has no such component.
    fn serialize_one(&self, entity: Entity, writer: &mut Writer<'_>) -> bool;

    /// Build a default component for `entity`, deserialize into it and
    /// insert it. The component is inserted even when decoding fails, so the
    /// entity still ends up with a default value.
    fn deserialize_one(&mut self, entity: Entity, reader: &Reader<'_>) -> Result<(), DeserializeError>;

    /// A new, empty storage of the same component type.
    fn empty_clone(&self) -> Box<dyn ErasedStorage>;
}

impl<T: Component> ErasedStorage for SparseSet<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn contains(&self, entity: Entity) -> bool {
        SparseSet::contains(self, entity)
    }

    fn erase(&mut self, entity: Entity) -> bool {
        self.remove(entity).is_some()
    }

    fn entities(&self) -> &[Entity] {
        SparseSet::entities(self)
    }

    fn len(&self) -> usize {
        SparseSet::len(self)
    }

    fn clear(&mut self) {
        SparseSet::clear(self)
    }

    fn serialize_one(&self, entity: Entity, writer: &mut Writer<'_>) -> bool {
        match self.get(entity) {
            Some(value) => {
                value.serialize(writer);
                true
            }
            None => false,
        }
    }

    fn deserialize_one(&mut self, entity: Entity, reader: &Reader<'_>) -> Result<(), DeserializeError> {
        let mut value = T::default();
        match value.deserialize(reader) {
            Ok(()) => {
                self.insert(entity, value);
                Ok(())
            }
            Err(err) => {
                self.insert(entity, T::default());
                Err(err)
            }
        }
    }

    fn empty_clone(&self) -> Box<dyn ErasedStorage> {
        Box::new(SparseSet::<T>::new())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

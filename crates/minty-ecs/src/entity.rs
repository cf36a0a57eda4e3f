//! Entity handles and allocation.
//!
//! An [`Entity`] packs a *generation* counter in the high 32 bits and a slot
//! *index* in the low 32 bits. Destroying an entity bumps the generation of
//! its slot, so any handle kept past the destroy stops resolving even after
//! the index is handed out again.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use minty_serialize::value::NodeValue;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A generational entity handle.
///
/// Layout: `[generation: u32 | index: u32]`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(u64);

impl Entity {
    /// A handle that never refers to a live entity.
    pub const NULL: Entity = Entity(u64::MAX);

    #[inline]
    pub fn new(index: u32, generation: u32) -> Self {
        Self((generation as u64) << 32 | index as u64)
    }

    /// Slot index (low 32 bits).
    #[inline]
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    /// Generation (high 32 bits).
    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self == Self::NULL
    }

    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("Entity(null)");
        }
        write!(f, "Entity({}v{})", self.index(), self.generation())
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("null");
        }
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

/// Entities are stored as `index v generation`, e.g. `12v3`.
impl NodeValue for Entity {
    fn to_node_string(&self) -> String {
        self.to_string()
    }

    fn from_node_str(text: &str) -> Option<Self> {
        let text = text.trim();
        if text == "null" {
            return Some(Self::NULL);
        }
        let (index, generation) = text.split_once('v')?;
        Some(Self::new(index.parse().ok()?, generation.parse().ok()?))
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Allocates and recycles [`Entity`] handles with generational tracking.
///
/// Free indices are kept in a FIFO queue so that generations are spread out
/// over time rather than concentrated on a hot index.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free_indices: VecDeque<u32>,
    alive_count: usize,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh handle, reusing a recycled index when one is free.
    pub fn allocate(&mut self) -> Entity {
        self.alive_count += 1;
        if let Some(index) = self.free_indices.pop_front() {
            // Generation was already bumped on deallocate.
            self.alive[index as usize] = true;
            Entity::new(index, self.generations[index as usize])
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            self.alive.push(true);
            Entity::new(index, 0)
        }
    }

    /// Release `entity`. Returns `false` if it was already dead or stale.
    pub fn deallocate(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let idx = entity.index() as usize;
        self.alive[idx] = false;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.free_indices.push_back(entity.index());
        self.alive_count -= 1;
        true
    }

    /// Whether `entity` is alive with a matching generation.
    pub fn is_alive(&self, entity: Entity) -> bool {
        let idx = entity.index() as usize;
        idx < self.generations.len() && self.alive[idx] && self.generations[idx] == entity.generation()
    }

    /// The live handle currently occupying `index`, if any.
    pub fn resolve(&self, index: u32) -> Option<Entity> {
        let idx = index as usize;
        (idx < self.alive.len() && self.alive[idx]).then(|| Entity::new(index, self.generations[idx]))
    }

    #[inline]
    pub fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Live handles in ascending index order.
    pub fn iter_alive(&self) -> impl Iterator<Item = Entity> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, &alive)| alive)
            .map(|(idx, _)| Entity::new(idx as u32, self.generations[idx]))
    }

    /// Release every live handle, bumping generations so none stay valid.
    pub fn clear(&mut self) {
        let live: Vec<Entity> = self.iter_alive().collect();
        for entity in live {
            self.deallocate(entity);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

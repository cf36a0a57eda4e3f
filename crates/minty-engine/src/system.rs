//! Systems and the per-scene [`SystemRegistry`].
//!
//! A system is a named unit of per-frame behavior. It does not hold a
//! pointer to its scene; every hook instead receives a [`SystemContext`]
//! with the scene's entities, the shared asset engine and the frame time.
//!
//! Lifecycle: `Unloaded -> Loaded -> Enabled <-> Disabled -> Unloaded`.
//! Hooks run in registration order, except `unload`, which runs in reverse.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use minty_ecs::prelude::*;

use crate::animation::AnimationSystem;
use crate::asset::AssetEngine;
use crate::SceneError;

// ---------------------------------------------------------------------------
// FrameTime / SystemContext
// ---------------------------------------------------------------------------

/// Timing for the frame being processed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTime {
    /// Seconds since the previous frame.
    pub delta: f32,
    /// Seconds since the scene started updating.
    pub elapsed: f64,
    /// Frames completed before this one.
    pub frame: u64,
}

/// What a system may touch while one of its hooks runs.
pub struct SystemContext<'a> {
    pub entities: &'a mut EntityRegistry,
    pub assets: &'a Arc<AssetEngine>,
    pub time: FrameTime,
}

impl<'a> SystemContext<'a> {
    pub fn new(entities: &'a mut EntityRegistry, assets: &'a Arc<AssetEngine>, time: FrameTime) -> Self {
        Self {
            entities,
            assets,
            time,
        }
    }

    /// Reborrow for a nested call.
    pub fn reborrow(&mut self) -> SystemContext<'_> {
        SystemContext {
            entities: self.entities,
            assets: self.assets,
            time: self.time,
        }
    }
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// A named, stateful unit of scene behavior.
///
/// Only [`update`](System::update) is required; every other hook defaults
/// to doing nothing.
pub trait System: Any {
    /// Unique within a registry.
    fn name(&self) -> &str;

    fn load(&mut self, _ctx: &mut SystemContext<'_>) {}

    fn update(&mut self, ctx: &mut SystemContext<'_>);

    /// Runs after every enabled system has updated.
    fn finalize(&mut self, _ctx: &mut SystemContext<'_>) {}

    fn unload(&mut self, _ctx: &mut SystemContext<'_>) {}

    /// Reinitialize transient state without unloading.
    fn reset(&mut self) {}

    fn on_enable(&mut self) {}

    fn on_disable(&mut self) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemState {
    Unloaded,
    Loaded,
    Enabled,
    Disabled,
}

struct SystemSlot {
    system: Box<dyn System>,
    enabled: bool,
    state: SystemState,
    last_time: Duration,
}

impl SystemSlot {
    /// Move between `Enabled` and `Disabled` to match the flag, firing the
    /// matching hook. Unloaded systems do not change state.
    fn sync_state(&mut self) {
        let wanted = if self.enabled {
            SystemState::Enabled
        } else {
            SystemState::Disabled
        };
        if self.state == SystemState::Unloaded || self.state == wanted {
            return;
        }
        let previous = self.state;
        self.state = wanted;
        match wanted {
            SystemState::Enabled => self.system.on_enable(),
            SystemState::Disabled if previous == SystemState::Enabled => self.system.on_disable(),
            _ => {}
        }
        tracing::trace!(system = self.system.name(), state = ?wanted, "system state changed");
    }
}

// ---------------------------------------------------------------------------
// SystemRegistry
// ---------------------------------------------------------------------------

/// Ordered collection of a scene's systems.
#[derive(Default)]
pub struct SystemRegistry {
    slots: Vec<SystemSlot>,
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `system`, enabled, and return it.
    ///
    /// # Panics
    ///
    /// Panics if a system with the same name is already registered.
    pub fn add<S: System>(&mut self, system: S) -> &mut S {
        let index = self.push(Box::new(system));
        match self.slots[index].system.as_any_mut().downcast_mut::<S>() {
            Some(system) => system,
            None => unreachable!("slot {index} was just filled with this type"),
        }
    }

    /// Like [`add`](Self::add), returning [`SceneError::DuplicateSystem`]
    /// instead of panicking when the name is taken.
    pub fn try_add<S: System>(&mut self, system: S) -> Result<&mut S, SceneError> {
        if self.find_by_name(system.name()).is_some() {
            return Err(SceneError::DuplicateSystem {
                name: system.name().to_owned(),
            });
        }
        Ok(self.add(system))
    }

    /// Append an already boxed system, enabled.
    ///
    /// # Panics
    ///
    /// Panics if a system with the same name is already registered.
    pub fn add_boxed(&mut self, system: Box<dyn System>) -> &mut dyn System {
        let index = self.push(system);
        self.slots[index].system.as_mut()
    }

    fn push(&mut self, system: Box<dyn System>) -> usize {
        let name = system.name();
        assert!(
            self.find_by_name(name).is_none(),
            "system '{name}' is already registered"
        );
        tracing::debug!(system = name, "added system");
        self.slots.push(SystemSlot {
            system,
            enabled: true,
            state: SystemState::Unloaded,
            last_time: Duration::ZERO,
        });
        self.slots.len() - 1
    }

    pub fn find<S: System>(&self) -> Option<&S> {
        self.slots
            .iter()
            .find_map(|slot| slot.system.as_any().downcast_ref::<S>())
    }

    pub fn find_mut<S: System>(&mut self) -> Option<&mut S> {
        self.slots
            .iter_mut()
            .find_map(|slot| slot.system.as_any_mut().downcast_mut::<S>())
    }

    pub fn find_by_name(&self, name: &str) -> Option<&dyn System> {
        self.slots
            .iter()
            .find(|slot| slot.system.name() == name)
            .map(|slot| slot.system.as_ref())
    }

    fn slot_of<S: System>(&mut self) -> Option<&mut SystemSlot> {
        self.slots.iter_mut().find(|slot| slot.system.as_any().is::<S>())
    }

    /// Enable or disable the system of type `S`. Returns `false` if there is
    /// none. Takes effect immediately for loaded systems.
    pub fn set_enabled<S: System>(&mut self, enabled: bool) -> bool {
        match self.slot_of::<S>() {
            Some(slot) => {
                slot.enabled = enabled;
                slot.sync_state();
                true
            }
            None => false,
        }
    }

    pub fn set_enabled_by_name(&mut self, name: &str, enabled: bool) -> bool {
        match self.slots.iter_mut().find(|slot| slot.system.name() == name) {
            Some(slot) => {
                slot.enabled = enabled;
                slot.sync_state();
                true
            }
            None => false,
        }
    }

    pub fn is_enabled<S: System>(&self) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.enabled && slot.system.as_any().is::<S>())
    }

    pub fn state_of<S: System>(&self) -> Option<SystemState> {
        self.slots
            .iter()
            .find(|slot| slot.system.as_any().is::<S>())
            .map(|slot| slot.state)
    }

    /// Load every unloaded system, in registration order.
    pub fn load(&mut self, ctx: &mut SystemContext<'_>) {
        for slot in &mut self.slots {
            if slot.state != SystemState::Unloaded {
                continue;
            }
            slot.system.load(ctx);
            slot.state = SystemState::Loaded;
            tracing::debug!(system = slot.system.name(), "system loaded");
        }
    }

    /// Run every enabled, loaded system, in registration order.
    pub fn update(&mut self, ctx: &mut SystemContext<'_>) {
        for slot in &mut self.slots {
            if slot.state == SystemState::Unloaded {
                continue;
            }
            slot.sync_state();
            if !slot.enabled {
                slot.last_time = Duration::ZERO;
                continue;
            }
            let start = Instant::now();
            slot.system.update(ctx);
            slot.last_time = start.elapsed();
        }
    }

    /// End-of-frame hook for every enabled, loaded system.
    pub fn finalize(&mut self, ctx: &mut SystemContext<'_>) {
        for slot in &mut self.slots {
            if slot.enabled && slot.state != SystemState::Unloaded {
                slot.system.finalize(ctx);
            }
        }
    }

    /// Unload every loaded system, in reverse registration order.
    pub fn unload(&mut self, ctx: &mut SystemContext<'_>) {
        for slot in self.slots.iter_mut().rev() {
            if slot.state == SystemState::Unloaded {
                continue;
            }
            if slot.state == SystemState::Enabled {
                slot.system.on_disable();
            }
            slot.system.unload(ctx);
            slot.state = SystemState::Unloaded;
            tracing::debug!(system = slot.system.name(), "system unloaded");
        }
    }

    /// Reset every system's transient state.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.system.reset();
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.slots.iter().map(|slot| slot.system.name()).collect()
    }

    /// Wall-clock time each system spent in its last `update`, in order.
    pub fn last_timings(&self) -> Vec<(&str, Duration)> {
        self.slots
            .iter()
            .map(|slot| (slot.system.name(), slot.last_time))
            .collect()
    }
}

impl fmt::Debug for SystemRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.slots.iter().map(|slot| (slot.system.name(), slot.state, slot.enabled)))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SystemFactory
// ---------------------------------------------------------------------------

type Constructor = Box<dyn Fn() -> Box<dyn System> + Send + Sync>;

/// Creates systems by name, for scenes built from configuration.
pub struct SystemFactory {
    constructors: HashMap<String, Constructor>,
}

impl SystemFactory {
    /// A factory that knows no systems.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// A factory that knows the engine's built-in systems.
    pub fn with_builtin() -> Self {
        let mut factory = Self::empty();
        factory.register(AnimationSystem::NAME, || Box::new(AnimationSystem::new()));
        factory
    }

    /// Register (or replace) the constructor for `name`.
    pub fn register<F>(&mut self, name: &str, constructor: F)
    where
        F: Fn() -> Box<dyn System> + Send + Sync + 'static,
    {
        self.constructors.insert(name.to_owned(), Box::new(constructor));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn System>, SceneError> {
        match self.constructors.get(name) {
            Some(constructor) => Ok(constructor()),
            None => Err(SceneError::UnknownSystem {
                name: name.to_owned(),
                available: self.names().join(", "),
            }),
        }
    }

    /// Known system names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for SystemFactory {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl fmt::Debug for SystemFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemFactory")
            .field("systems", &self.names())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

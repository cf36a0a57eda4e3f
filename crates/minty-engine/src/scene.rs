//! Scenes: one entity registry and one system registry sharing an asset
//! engine.
//!
//! # Frame order
//!
//! [`Scene::update`] runs, in order:
//!
//! 1. every enabled system's `update`, in registration order
//! 2. every enabled system's `finalize`
//! 3. removal of all [`DirtyComponent`] markers
//! 4. destruction of every entity queued with
//!    [`EntityRegistry::queue_destroy`]
//!
//! # Persistence
//!
//! A scene is written as a `Scene` node whose data is the scene name and
//! whose children are `Entity` nodes. Loading is all-or-nothing: entities are
//! decoded into a fresh registry that replaces the current one only when the
//! document is structurally valid.

use std::fmt;
use std::sync::Arc;

use minty_ecs::prelude::*;
use minty_serialize::prelude::*;

use crate::asset::AssetEngine;
use crate::config::SceneConfig;
use crate::system::{FrameTime, System, SystemContext, SystemFactory, SystemRegistry};
use crate::SceneError;

/// Name of the node a scene is written under.
pub const SCENE_NODE: &str = "Scene";

// ---------------------------------------------------------------------------
// SerializationData
// ---------------------------------------------------------------------------

/// Side-channel payload handed to components while a scene is written or
/// read. `entity` is the entity whose components are being processed.
#[derive(Debug, Clone)]
pub struct SerializationData {
    pub assets: Arc<AssetEngine>,
    pub entity: Option<Entity>,
}

impl SerializationData {
    pub fn new(assets: Arc<AssetEngine>) -> Self {
        Self {
            assets,
            entity: None,
        }
    }
}

impl EntityScope for SerializationData {
    fn for_entity(&self, entity: Entity) -> Self {
        Self {
            assets: Arc::clone(&self.assets),
            entity: Some(entity),
        }
    }
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

pub struct Scene {
    name: String,
    entities: EntityRegistry,
    systems: SystemRegistry,
    assets: Arc<AssetEngine>,
    loaded: bool,
    elapsed: f64,
    frame: u64,
}

impl Scene {
    /// An unnamed scene with the engine components registered and no
    /// systems.
    pub fn new(assets: Arc<AssetEngine>) -> Self {
        Self::named("", assets)
    }

    pub fn named(name: impl Into<String>, assets: Arc<AssetEngine>) -> Self {
        let mut entities = EntityRegistry::new();
        crate::register_components(&mut entities);
        Self {
            name: name.into(),
            entities,
            systems: SystemRegistry::new(),
            assets,
            loaded: false,
            elapsed: 0.0,
            frame: 0,
        }
    }

    /// A scene running the systems `config` lists, created by `factory`.
    pub fn from_config(
        config: &SceneConfig,
        factory: &SystemFactory,
        assets: Arc<AssetEngine>,
    ) -> Result<Self, SceneError> {
        let mut scene = Self::named(config.name.as_str(), assets);
        for system in &config.systems {
            if scene.systems.find_by_name(&system.name).is_some() {
                return Err(SceneError::InvalidConfig {
                    details: format!("system '{}' listed twice", system.name),
                });
            }
            scene.systems.add_boxed(factory.create(&system.name)?);
            if !system.enabled {
                scene.systems.set_enabled_by_name(&system.name, false);
            }
        }
        tracing::debug!(scene = %scene.name, systems = scene.systems.len(), "created scene");
        Ok(scene)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn entity_registry(&self) -> &EntityRegistry {
        &self.entities
    }

    pub fn entity_registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.entities
    }

    pub fn system_registry(&self) -> &SystemRegistry {
        &self.systems
    }

    pub fn system_registry_mut(&mut self) -> &mut SystemRegistry {
        &mut self.systems
    }

    pub fn assets(&self) -> &Arc<AssetEngine> {
        &self.assets
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Seconds of updates run since the scene was created.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Updates run since the scene was created.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    fn with_systems<F>(&mut self, delta: f32, f: F)
    where
        F: FnOnce(&mut SystemRegistry, &mut SystemContext<'_>),
    {
        let time = FrameTime {
            delta,
            elapsed: self.elapsed,
            frame: self.frame,
        };
        let mut ctx = SystemContext::new(&mut self.entities, &self.assets, time);
        f(&mut self.systems, &mut ctx);
    }

    /// Load every system. Does nothing if already loaded.
    pub fn load(&mut self) {
        if self.loaded {
            return;
        }
        self.with_systems(0.0, |systems, ctx| systems.load(ctx));
        self.loaded = true;
        tracing::info!(scene = %self.name, entities = self.entities.len(), "scene loaded");
    }

    /// Run one frame of `delta` seconds, loading first if needed. Systems
    /// added since the last frame are loaded before any system updates.
    pub fn update(&mut self, delta: f32) {
        if !self.loaded {
            self.load();
        }
        self.with_systems(delta, |systems, ctx| {
            systems.load(ctx);
            systems.update(ctx);
            systems.finalize(ctx);
        });
        self.entities.clear_component::<DirtyComponent>();
        self.entities.destroy_queued();
        self.elapsed += f64::from(delta);
        self.frame += 1;
    }

    /// Unload every system, in reverse order. Entities are kept.
    pub fn unload(&mut self) {
        if !self.loaded {
            return;
        }
        self.with_systems(0.0, |systems, ctx| systems.unload(ctx));
        self.loaded = false;
        tracing::info!(scene = %self.name, "scene unloaded");
    }

    /// Reset every system's transient state.
    pub fn reset_systems(&mut self) {
        self.systems.reset();
    }

    // -- persistence --------------------------------------------------------

    pub fn to_node(&self) -> Node {
        to_node(SCENE_NODE, self)
    }

    /// The scene as a text document.
    pub fn to_text(&self) -> String {
        let mut root = Node::default();
        root.add_child(self.to_node());
        root.to_text()
    }

    /// Report of the last successful load, whether through
    /// [`load_node`](Self::load_node) or [`Serializable::deserialize`].
    pub fn last_load_report(&self) -> Option<&LoadReport> {
        self.entities.last_load_report()
    }

    /// Replace this scene's entities with those under `node`.
    ///
    /// On error the scene is unchanged. Components that fail to decode are
    /// listed in the returned report while their entities still load.
    pub fn load_node(&mut self, node: &Node) -> Result<LoadReport, SceneError> {
        let data = SerializationData::new(Arc::clone(&self.assets));
        let mut fresh = self.entities.empty_like();
        let report = fresh.load_entities_scoped(&Reader::new(node), &data)?;

        self.entities = fresh;
        if node.has_data() {
            self.name = node.data().to_owned();
        }
        tracing::info!(
            scene = %self.name,
            entities = report.entities.len(),
            issues = report.issues.len(),
            "scene entities loaded"
        );
        Ok(report)
    }
}

impl Serializable for Scene {
    fn serialize(&self, writer: &mut Writer<'_>) {
        if !self.name.is_empty() {
            writer.node_mut().set_data(self.name.as_str());
        }
        let data = SerializationData::new(Arc::clone(&self.assets));
        self.entities.serialize_scoped(writer, &data);
    }

    /// Component failures do not fail the call; they are kept in
    /// [`Scene::last_load_report`].
    fn deserialize(&mut self, reader: &Reader<'_>) -> Result<(), DeserializeError> {
        self.load_node(reader.node())
            .map(|_| ())
            .map_err(|e| DeserializeError::Invalid {
                field: SCENE_NODE.to_owned(),
                details: e.to_string(),
            })
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field("entities", &self.entities.len())
            .field("systems", &self.systems)
            .field("loaded", &self.loaded)
            .field("frame", &self.frame)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SceneObject
// ---------------------------------------------------------------------------

/// Something that belongs to a scene without owning it.
pub trait SceneObject {
    fn scene(&self) -> &Scene;

    fn entity_registry(&self) -> &EntityRegistry {
        self.scene().entity_registry()
    }

    fn system_registry(&self) -> &SystemRegistry {
        self.scene().system_registry()
    }

    fn assets(&self) -> &Arc<AssetEngine> {
        self.scene().assets()
    }

    fn find_system<S: System>(&self) -> Option<&S>
    where
        Self: Sized,
    {
        self.scene().system_registry().find::<S>()
    }
}

impl SceneObject for Scene {
    fn scene(&self) -> &Scene {
        self
    }
}

/// A borrowed view of a scene.
#[derive(Debug, Clone, Copy)]
pub struct SceneRef<'a>(pub &'a Scene);

impl SceneObject for SceneRef<'_> {
    fn scene(&self) -> &Scene {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

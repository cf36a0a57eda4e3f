//! Owns every scene and drives the active one with a fixed time step.

use std::fmt;
use std::sync::Arc;

use minty_ecs::prelude::*;
use minty_serialize::prelude::*;

use crate::asset::AssetEngine;
use crate::config::{EngineConfig, SceneConfig};
use crate::scene::{Scene, SCENE_NODE};
use crate::system::SystemFactory;
use crate::SceneError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneId(usize);

impl SceneId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scene#{}", self.0)
    }
}

/// Holds scenes and runs the active one.
///
/// [`update`](SceneManager::update) accumulates wall-clock time and runs as
/// many fixed-length scene updates as fit, up to
/// [`EngineConfig::max_steps_per_update`].
pub struct SceneManager {
    config: EngineConfig,
    factory: SystemFactory,
    assets: Arc<AssetEngine>,
    scenes: Vec<Option<Scene>>,
    active: Option<SceneId>,
    accumulator: f64,
}

impl SceneManager {
    pub fn new(config: EngineConfig, assets: Arc<AssetEngine>) -> Result<Self, SceneError> {
        config.validate()?;
        Ok(Self {
            config,
            factory: SystemFactory::with_builtin(),
            assets,
            scenes: Vec::new(),
            active: None,
            accumulator: 0.0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn assets(&self) -> &Arc<AssetEngine> {
        &self.assets
    }

    pub fn factory(&self) -> &SystemFactory {
        &self.factory
    }

    /// For registering game-specific systems before scenes are created.
    pub fn factory_mut(&mut self) -> &mut SystemFactory {
        &mut self.factory
    }

    pub fn create_scene(&mut self, config: &SceneConfig) -> Result<SceneId, SceneError> {
        let scene = Scene::from_config(config, &self.factory, Arc::clone(&self.assets))?;
        Ok(self.add_scene(scene))
    }

    pub fn add_scene(&mut self, scene: Scene) -> SceneId {
        self.scenes.push(Some(scene));
        SceneId(self.scenes.len() - 1)
    }

    /// Parse a text document and build a scene from its single `Scene`
    /// node, running the systems `config` lists.
    ///
    /// A name stored in the document replaces `config.name`.
    pub fn load_text(&mut self, text: &str, config: &SceneConfig) -> Result<(SceneId, LoadReport), SceneError> {
        let root = Node::parse_text(text)?;
        let mut nodes = root.find_all(SCENE_NODE);
        let node = nodes.next().ok_or(SceneError::MissingSceneNode)?;
        if nodes.next().is_some() {
            return Err(EcsError::DuplicateNode {
                name: SCENE_NODE.to_owned(),
            }
            .into());
        }

        let mut scene = Scene::from_config(config, &self.factory, Arc::clone(&self.assets))?;
        let report = scene.load_node(node)?;
        Ok((self.add_scene(scene), report))
    }

    pub fn scene(&self, id: SceneId) -> Option<&Scene> {
        self.scenes.get(id.0).and_then(Option::as_ref)
    }

    pub fn scene_mut(&mut self, id: SceneId) -> Option<&mut Scene> {
        self.scenes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn active_id(&self) -> Option<SceneId> {
        self.active
    }

    pub fn active(&self) -> Option<&Scene> {
        self.active.and_then(|id| self.scene(id))
    }

    pub fn active_mut(&mut self) -> Option<&mut Scene> {
        let id = self.active?;
        self.scene_mut(id)
    }

    /// Make `id` the active scene: unload the previous one and load this.
    pub fn activate(&mut self, id: SceneId) -> Result<(), SceneError> {
        if self.scene(id).is_none() {
            return Err(SceneError::UnknownScene { id: id.0 });
        }
        if let Some(previous) = self.active.filter(|&previous| previous != id) {
            if let Some(scene) = self.scene_mut(previous) {
                scene.unload();
            }
        }
        if let Some(scene) = self.scene_mut(id) {
            scene.load();
        }
        self.active = Some(id);
        self.accumulator = 0.0;
        tracing::info!(scene = %id, "activated scene");
        Ok(())
    }

    /// Remove a scene, unloading it first. Ids of other scenes stay valid.
    pub fn remove_scene(&mut self, id: SceneId) -> Option<Scene> {
        let mut scene = self.scenes.get_mut(id.0)?.take()?;
        scene.unload();
        if self.active == Some(id) {
            self.active = None;
        }
        Some(scene)
    }

    pub fn len(&self) -> usize {
        self.scenes.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn scene_ids(&self) -> impl Iterator<Item = SceneId> + '_ {
        self.scenes
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| SceneId(index))
    }

    /// Run one fixed step on the active scene. Returns `false` if there is
    /// no active scene.
    pub fn tick(&mut self) -> bool {
        let dt = self.config.fixed_dt as f32;
        match self.active_mut() {
            Some(scene) => {
                scene.update(dt);
                true
            }
            None => false,
        }
    }

    /// Advance the active scene by `elapsed` seconds of wall-clock time.
    /// Returns how many fixed steps ran.
    pub fn update(&mut self, elapsed: f64) -> u32 {
        if self.active.is_none() || !(elapsed.is_finite() && elapsed > 0.0) {
            return 0;
        }
        self.accumulator += elapsed;

        let mut steps = 0;
        while self.accumulator >= self.config.fixed_dt && steps < self.config.max_steps_per_update {
            self.tick();
            self.accumulator -= self.config.fixed_dt;
            steps += 1;
        }
        if self.accumulator >= self.config.fixed_dt {
            tracing::debug!(
                dropped = self.accumulator,
                steps,
                "frame budget exceeded, dropping time"
            );
            self.accumulator = 0.0;
        }
        steps
    }
}

impl fmt::Debug for SceneManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneManager")
            .field("config", &self.config)
            .field("scenes", &self.len())
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SceneManager {
        SceneManager::new(EngineConfig::default(), Arc::new(AssetEngine::new())).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = EngineConfig {
            fixed_dt: -1.0,
            ..EngineConfig::default()
        };
        assert!(SceneManager::new(config, Arc::new(AssetEngine::new())).is_err());
    }

    #[test]
    fn activate_switches_loaded_scene() {
        let mut manager = manager();
        let a = manager.create_scene(&SceneConfig::new("A")).unwrap();
        let b = manager.create_scene(&SceneConfig::new("B").with_system("Animation")).unwrap();

        manager.activate(a).unwrap();
        assert!(manager.scene(a).unwrap().is_loaded());

        manager.activate(b).unwrap();
        assert!(!manager.scene(a).unwrap().is_loaded());
        assert!(manager.scene(b).unwrap().is_loaded());
        assert_eq!(manager.active().map(Scene::name), Some("B"));

        assert!(matches!(
            manager.activate(SceneId(42)),
            Err(SceneError::UnknownScene { id: 42 })
        ));
    }

    #[test]
    fn update_runs_fixed_steps() {
        let mut manager = manager();
        assert_eq!(manager.update(1.0), 0);

        let id = manager.create_scene(&SceneConfig::new("A")).unwrap();
        manager.activate(id).unwrap();

        let dt = manager.config().fixed_dt;
        assert_eq!(manager.update(dt * 0.5), 0);
        assert_eq!(manager.update(dt * 0.6), 1);
        assert_eq!(manager.update(dt * 2.0), 2);
        assert_eq!(manager.scene(id).unwrap().frame(), 3);

        // More than the step budget: capped, remainder dropped.
        assert_eq!(manager.update(dt * 100.0), 8);
        assert_eq!(manager.update(dt * 0.5), 0);
    }

    #[test]
    fn load_text_needs_exactly_one_scene() {
        let mut manager = manager();
        let config = SceneConfig::new("fallback");

        let (id, report) = manager
            .load_text("Scene: Level 1\n\tEntity\n\t\tName\n\t\t\tname: Hero\n", &config)
            .unwrap();
        assert!(report.is_clean());
        let scene = manager.scene(id).unwrap();
        assert_eq!(scene.name(), "Level 1");
        assert!(scene.entity_registry().find_by_name("Hero").is_some());

        assert!(matches!(
            manager.load_text("Other\n", &config),
            Err(SceneError::MissingSceneNode)
        ));
        assert!(matches!(
            manager.load_text("Scene\nScene\n", &config),
            Err(SceneError::Ecs(EcsError::DuplicateNode { .. }))
        ));
        assert!(matches!(
            manager.load_text("Scene\n\t\tEntity\n", &config),
            Err(SceneError::Parse(_))
        ));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn removing_the_active_scene_clears_it() {
        let mut manager = manager();
        let id = manager.create_scene(&SceneConfig::new("A")).unwrap();
        manager.activate(id).unwrap();
        let scene = manager.remove_scene(id).unwrap();
        assert!(!scene.is_loaded());
        assert!(manager.active().is_none());
        assert!(!manager.tick());
        assert!(manager.remove_scene(id).is_none());
    }
}

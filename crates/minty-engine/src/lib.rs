//! Minty Engine -- scenes, systems, assets and animation.
//!
//! This crate builds on [`minty_ecs`] and [`minty_serialize`] to provide the
//! runtime object model: a [`Scene`](scene::Scene) owns one entity registry
//! and one [`SystemRegistry`](system::SystemRegistry), systems run in
//! registration order each frame, and scenes persist to and from node trees.
//! Components refer to shared assets by [`AssetId`](asset::AssetId) and
//! resolve them through an [`AssetEngine`](asset::AssetEngine) passed as the
//! serialization payload.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use minty_engine::prelude::*;
//!
//! let assets = Arc::new(AssetEngine::new());
//! let mut manager = SceneManager::new(EngineConfig::default(), assets).unwrap();
//!
//! let id = manager
//!     .create_scene(&SceneConfig::new("Level").with_system("Animation"))
//!     .unwrap();
//! manager.activate(id).unwrap();
//!
//! let scene = manager.active_mut().unwrap();
//! let camera = scene.entity_registry_mut().create_named("Camera");
//! scene
//!     .entity_registry_mut()
//!     .add(camera, CameraComponent::default())
//!     .unwrap();
//!
//! assert_eq!(manager.update(1.0 / 30.0), 2);
//! let text = manager.active().unwrap().to_text();
//! assert!(text.contains("name: Camera"));
//! ```

#![deny(unsafe_code)]

pub mod animation;
pub mod asset;
pub mod audio;
pub mod camera;
pub mod config;
pub mod fsm;
pub mod manager;
pub mod scene;
pub mod system;

pub use minty_ecs;
pub use minty_serialize;

use minty_ecs::registry::EntityRegistry;

use crate::asset::AssetId;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by [`AssetEngine`](asset::AssetEngine) lookups.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset {id} is not registered")]
    NotFound { id: AssetId },

    #[error("asset {id} is not a {expected}")]
    WrongType { id: AssetId, expected: &'static str },
}

/// Errors produced while building or editing a state machine.
#[derive(Debug, thiserror::Error)]
pub enum FsmError {
    /// A machine needs at least one state.
    #[error("state machine has no states")]
    Empty,

    #[error("unknown state '{name}'")]
    UnknownState { name: String },

    #[error("unknown variable '{name}'")]
    UnknownVariable { name: String },

    #[error("state '{name}' is declared twice")]
    DuplicateState { name: String },

    /// Evaluation reached the same state twice.
    #[error("transition loop through state '{state}'")]
    Loop { state: String },

    #[error("cannot parse condition '{text}' (expected 'variable op value')")]
    BadCondition { text: String },
}

/// Errors produced by scenes and the scene manager.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error(transparent)]
    Parse(#[from] minty_serialize::ParseError),

    #[error(transparent)]
    Ecs(#[from] minty_ecs::EcsError),

    #[error("unknown system '{name}'. Known systems: [{available}]")]
    UnknownSystem { name: String, available: String },

    #[error("system '{name}' is already registered")]
    DuplicateSystem { name: String },

    #[error("no scene with id {id}")]
    UnknownScene { id: usize },

    #[error("document has no 'Scene' node")]
    MissingSceneNode,

    #[error("invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("cannot read configuration: {0}")]
    Config(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Component registration
// ---------------------------------------------------------------------------

/// Register the engine's components under their persisted names:
/// `Animator`, `AudioSource` and `Camera`.
///
/// Every [`Scene`](scene::Scene) does this on creation.
pub fn register_components(entities: &mut EntityRegistry) {
    entities.register_component::<animation::AnimatorComponent>("Animator");
    entities.register_component::<audio::AudioSourceComponent>("AudioSource");
    entities.register_component::<camera::CameraComponent>("Camera");
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use minty_ecs::prelude::*;
    pub use minty_serialize::prelude::*;

    pub use crate::animation::{AnimationSystem, Animator, AnimatorComponent};
    pub use crate::asset::{Animation, Asset, AssetEngine, AssetId, AudioClip};
    pub use crate::audio::{Attenuation, AudioHandle, AudioSourceComponent};
    pub use crate::camera::{CameraComponent, Projection};
    pub use crate::config::{EngineConfig, SceneConfig, SystemConfig};
    pub use crate::fsm::{Comparison, Condition, Fsm, FsmBuilder, Scope};
    pub use crate::manager::{SceneId, SceneManager};
    pub use crate::scene::{Scene, SceneObject, SceneRef, SerializationData, SCENE_NODE};
    pub use crate::system::{
        FrameTime, System, SystemContext, SystemFactory, SystemRegistry, SystemState,
    };
    pub use crate::{register_components, AssetError, FsmError, SceneError};
}

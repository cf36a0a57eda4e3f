//! Animator assets, the [`AnimatorComponent`] and the [`AnimationSystem`]
//! that drives it.
//!
//! An [`Animator`] is a shared template: a state machine whose state values
//! are animation ids. Each entity's component holds its own copy of the
//! template, so machines advance independently per entity.

use std::any::Any;
use std::sync::Arc;

use minty_serialize::prelude::*;

use crate::asset::{Animation, Asset, AssetEngine, AssetId};
use crate::fsm::Fsm;
use crate::scene::SerializationData;
use crate::system::{System, SystemContext};
use crate::FsmError;

// ---------------------------------------------------------------------------
// Animator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Animator {
    id: AssetId,
    fsm: Fsm<AssetId>,
}

impl Animator {
    pub fn new(id: AssetId, fsm: Fsm<AssetId>) -> Self {
        Self { id, fsm }
    }

    pub fn fsm(&self) -> &Fsm<AssetId> {
        &self.fsm
    }

    pub fn fsm_mut(&mut self) -> &mut Fsm<AssetId> {
        &mut self.fsm
    }

    /// The animation the current state plays.
    pub fn current_animation(&self) -> AssetId {
        *self.fsm.current_value()
    }

    pub fn set_variable(&mut self, name: &str, value: i32) -> Result<(), FsmError> {
        self.fsm.set_variable(name, value)
    }

    /// Evaluate the machine. Returns whether the state changed.
    pub fn update(&mut self) -> Result<bool, FsmError> {
        self.fsm.evaluate()
    }

    pub fn from_reader(reader: &Reader<'_>) -> Result<Self, DeserializeError> {
        let id: AssetId = reader.read("id").unwrap_or_default();
        let fsm = match reader.child("fsm") {
            Some(fsm) => Fsm::from_reader(&fsm)?,
            None => {
                return Err(DeserializeError::Invalid {
                    field: "fsm".to_owned(),
                    details: format!("animator {id} has no state machine"),
                })
            }
        };
        Ok(Self { id, fsm })
    }
}

impl Asset for Animator {
    const KIND: &'static str = "animator";

    fn id(&self) -> AssetId {
        self.id
    }
}

impl Serializable for Animator {
    fn serialize(&self, writer: &mut Writer<'_>) {
        writer.write("id", &self.id);
        writer.write_object("fsm", &self.fsm);
    }

    fn deserialize(&mut self, reader: &Reader<'_>) -> Result<(), DeserializeError> {
        *self = Self::from_reader(reader)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AnimatorComponent
// ---------------------------------------------------------------------------

/// Per-entity playback state.
///
/// The default component plays nothing. A negative `time` means the current
/// animation finished and did not loop.
#[derive(Debug, Clone, Default)]
pub struct AnimatorComponent {
    pub animator: Option<Animator>,
    pub animation: Option<Arc<Animation>>,
    /// Current frame of `animation`.
    pub index: usize,
    /// Seconds into `animation`.
    pub time: f32,
}

impl AnimatorComponent {
    /// A component playing a copy of `animator`, starting on whatever
    /// animation `assets` holds for its current state.
    pub fn new(animator: &Animator, assets: &AssetEngine) -> Self {
        let animation = assets.get::<Animation>(animator.current_animation());
        Self {
            animator: Some(animator.clone()),
            animation,
            index: 0,
            time: 0.0,
        }
    }

    /// Rewind to the first frame.
    pub fn reset(&mut self) {
        self.index = 0;
        self.time = 0.0;
    }

    pub fn is_playing(&self) -> bool {
        self.animation.is_some() && self.time >= 0.0
    }

    /// Evaluate the animator, switch animations if its state asks for a
    /// different one, then advance playback by `delta` seconds.
    pub fn advance(&mut self, assets: &AssetEngine, delta: f32) {
        let Some(animator) = self.animator.as_mut() else {
            return;
        };

        let transitioned = animator.update().unwrap_or_else(|err| {
            tracing::warn!(animator = %animator.id(), error = %err, "animator evaluation failed");
            false
        });
        let wanted = animator.current_animation();
        let playing = self.animation.as_ref().map(|a| a.id());

        if transitioned || playing != Some(wanted) {
            self.animation = assets.get::<Animation>(wanted);
            if self.animation.is_none() && !wanted.is_none() {
                tracing::trace!(animation = %wanted, "animation not registered");
            }
            self.reset();
        }

        if self.time < 0.0 {
            return;
        }
        let Some(animation) = self.animation.clone() else {
            return;
        };
        if animation.animate(&mut self.time, delta, &mut self.index) {
            if animation.loops {
                self.reset();
            } else {
                self.time = -1.0;
            }
        }
    }
}

fn unresolved(kind: &'static str, id: AssetId, error: impl ToString) -> DeserializeError {
    DeserializeError::Unresolved {
        kind,
        id: id.to_string(),
        details: error.to_string(),
    }
}

impl Serializable for AnimatorComponent {
    fn serialize(&self, writer: &mut Writer<'_>) {
        if let Some(animator) = &self.animator {
            writer.write("animator", &animator.id());
        }
    }

    /// Resolves the animator and its current animation through the
    /// [`SerializationData`] payload. Without a readable `animator` id nothing
    /// is looked up. If either asset is missing the component is left
    /// untouched.
    fn deserialize(&mut self, reader: &Reader<'_>) -> Result<(), DeserializeError> {
        let Some(id) = reader.read::<AssetId>("animator") else {
            return Ok(());
        };

        let data = reader.require_data::<SerializationData>()?;
        let template = data
            .assets
            .at::<Animator>(id)
            .map_err(|e| unresolved(Animator::KIND, id, e))?;
        let animator = Animator::clone(&template);

        let current = animator.current_animation();
        let animation = data
            .assets
            .at::<Animation>(current)
            .map_err(|e| unresolved(Animation::KIND, current, e))?;

        *self = Self {
            animator: Some(animator),
            animation: Some(animation),
            index: 0,
            time: 0.0,
        };
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AnimationSystem
// ---------------------------------------------------------------------------

/// Advances every [`AnimatorComponent`] by the frame delta.
#[derive(Debug, Default)]
pub struct AnimationSystem {
    frames: u64,
}

impl AnimationSystem {
    pub const NAME: &'static str = "Animation";

    pub fn new() -> Self {
        Self::default()
    }

    /// Frames processed since the last reset.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl System for AnimationSystem {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) {
        let delta = ctx.time.delta;
        let assets: &AssetEngine = ctx.assets;
        for (_, component) in ctx.entities.view_mut::<AnimatorComponent>() {
            component.advance(assets, delta);
        }
        self.frames += 1;
    }

    fn reset(&mut self) {
        self.frames = 0;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use minty_ecs::prelude::*;

    use super::*;
    use crate::fsm::{Comparison, Condition};
    use crate::system::FrameTime;

    const IDLE: AssetId = AssetId::new(0x10);
    const WALK: AssetId = AssetId::new(0x20);
    const ANIMATOR: AssetId = AssetId::new(0x99);

    fn assets() -> Arc<AssetEngine> {
        let assets = Arc::new(AssetEngine::new());
        assets.register(Animation::new(IDLE, 2, 0.5, true));
        assets.register(Animation::new(WALK, 4, 0.25, false));
        let fsm = Fsm::builder()
            .variable("speed", 0)
            .state("Idle", IDLE)
            .state("Walk", WALK)
            .transition("Idle", "Walk", vec![Condition::new("speed", Comparison::Greater, 0)])
            .transition("Walk", "Idle", vec![Condition::new("speed", Comparison::Equal, 0)])
            .build()
            .unwrap();
        assets.register(Animator::new(ANIMATOR, fsm));
        assets
    }

    fn component(assets: &AssetEngine) -> AnimatorComponent {
        let template = assets.get::<Animator>(ANIMATOR).unwrap();
        AnimatorComponent::new(&template, assets)
    }

    #[test]
    fn looping_animation_wraps() {
        let assets = assets();
        let mut c = component(&assets);
        assert_eq!(c.animation.as_ref().map(|a| a.id()), Some(IDLE));

        c.advance(&assets, 0.6);
        assert_eq!(c.index, 1);
        c.advance(&assets, 0.5);
        assert_eq!((c.index, c.time), (0, 0.0));
        assert!(c.is_playing());
    }

    #[test]
    fn transition_switches_animation_and_rewinds() {
        let assets = assets();
        let mut c = component(&assets);
        c.advance(&assets, 0.6);

        c.animator.as_mut().unwrap().set_variable("speed", 3).unwrap();
        c.advance(&assets, 0.3);
        assert_eq!(c.animation.as_ref().map(|a| a.id()), Some(WALK));
        assert_eq!(c.index, 1);
    }

    #[test]
    fn finished_animation_stops() {
        let assets = assets();
        let mut c = component(&assets);
        c.animator.as_mut().unwrap().set_variable("speed", 1).unwrap();

        c.advance(&assets, 0.0);
        c.advance(&assets, 1.5);
        assert_eq!(c.time, -1.0);
        assert!(!c.is_playing());

        c.advance(&assets, 0.1);
        assert_eq!(c.time, -1.0);
    }

    #[test]
    fn entities_play_independently() {
        let assets = assets();
        let mut a = component(&assets);
        let mut b = component(&assets);
        a.animator.as_mut().unwrap().set_variable("speed", 1).unwrap();
        a.advance(&assets, 0.1);
        b.advance(&assets, 0.1);
        assert_eq!(a.animator.as_ref().unwrap().fsm().current_state(), "Walk");
        assert_eq!(b.animator.as_ref().unwrap().fsm().current_state(), "Idle");

        let template = assets.get::<Animator>(ANIMATOR).unwrap();
        assert_eq!(template.fsm().current_state(), "Idle");
    }

    #[test]
    fn deserialize_without_payload_fails_when_animator_named() {
        let mut node = Node::new("Animator");
        node.add_child(Node::leaf("animator", ANIMATOR.to_string()));
        let mut c = AnimatorComponent::default();
        assert!(matches!(
            c.deserialize(&Reader::new(&node)),
            Err(DeserializeError::MissingPayload { .. })
        ));
        assert!(c.animator.is_none());
    }

    #[test]
    fn deserialize_reports_missing_animation() {
        let assets = assets();
        let fsm = Fsm::builder().state("Only", AssetId::new(0x77)).build().unwrap();
        assets.register(Animator::new(AssetId::new(0x55), fsm));

        let mut node = Node::new("Animator");
        node.add_child(Node::leaf("animator", AssetId::new(0x55).to_string()));
        let data = SerializationData::new(Arc::clone(&assets));
        let mut c = AnimatorComponent::default();
        let err = c.deserialize(&Reader::with_data(&node, &data)).unwrap_err();
        assert!(matches!(err, DeserializeError::Unresolved { kind: "animation", .. }));
        assert!(c.animator.is_none());
    }

    #[test]
    fn system_drives_every_component() {
        let assets = assets();
        let mut entities = EntityRegistry::new();
        entities.register_component::<AnimatorComponent>("Animator");
        let e = entities.create();
        entities.add(e, component(&assets)).unwrap();

        let mut system = AnimationSystem::new();
        let time = FrameTime {
            delta: 0.6,
            ..FrameTime::default()
        };
        system.update(&mut SystemContext::new(&mut entities, &assets, time));

        assert_eq!(entities.get::<AnimatorComponent>(e).map(|c| c.index), Some(1));
        assert_eq!(system.frames(), 1);
    }

    #[test]
    fn animator_text_round_trip() {
        let assets = assets();
        let template = assets.get::<Animator>(ANIMATOR).unwrap();
        let text = to_node("Animator", &*template).to_text();
        let restored = Animator::from_reader(&Reader::new(&Node::parse_text(&text).unwrap())).unwrap();
        assert_eq!(restored, *template);
    }
}

//! Build a small animated scene, run it, save it as text and load it back.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example scene_roundtrip -p minty-engine

use std::sync::Arc;

use anyhow::Context;
use minty_engine::prelude::*;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

fn register_assets(assets: &AssetEngine) -> anyhow::Result<AssetId> {
    let idle = AssetId::from_name("hero/idle.anim");
    let walk = AssetId::from_name("hero/walk.anim");
    assets.register(Animation::new(idle, 4, 0.2, true));
    assets.register(Animation::new(walk, 6, 0.1, true));
    assets.register(AudioClip::new(AssetId::from_name("sfx/step.wav"), "step", 0.3));

    let fsm = Fsm::builder()
        .variable("speed", 0)
        .state("Idle", idle)
        .state("Walk", walk)
        .transition("Idle", "Walk", vec!["speed > 0".parse()?])
        .transition("Walk", "Idle", vec!["speed == 0".parse()?])
        .build()?;
    let animator = AssetId::from_name("hero.animator");
    assets.register(Animator::new(animator, fsm));
    Ok(animator)
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let assets = Arc::new(AssetEngine::new());
    let animator_id = register_assets(&assets)?;

    let mut manager = SceneManager::new(EngineConfig::default(), Arc::clone(&assets))?;
    let config = SceneConfig::new("Demo").with_system("Animation");
    let id = manager.create_scene(&config)?;
    manager.activate(id)?;

    {
        let scene = manager.active_mut().context("no active scene")?;
        let entities = scene.entity_registry_mut();

        let hero = entities.create_named("Hero");
        let template = assets.at::<Animator>(animator_id)?;
        let mut animator = AnimatorComponent::new(&template, &assets);
        if let Some(machine) = animator.animator.as_mut() {
            machine.set_variable("speed", 2)?;
        }
        entities.add(hero, animator)?;
        let step = assets.at::<AudioClip>(AssetId::from_name("sfx/step.wav"))?;
        entities.add(hero, AudioSourceComponent::new(step))?;

        let camera = entities.create_named("Main Camera");
        entities.add(camera, CameraComponent::orthographic(10.0))?;
    }

    let steps = manager.update(0.5);
    tracing::info!(steps, "simulated half a second");

    let text = manager.active().context("no active scene")?.to_text();
    println!("{text}");

    let (restored, report) = manager.load_text(&text, &config)?;
    for issue in &report.issues {
        tracing::warn!("{issue}");
    }
    let scene = manager.scene(restored).context("restored scene missing")?;
    let hero = scene
        .entity_registry()
        .find_by_name("Hero")
        .context("hero did not survive the round trip")?;
    let state = scene
        .entity_registry()
        .get::<AnimatorComponent>(hero)
        .and_then(|c| c.animator.as_ref())
        .map(|a| a.fsm().current_state().to_owned());
    tracing::info!(entities = scene.entity_registry().len(), ?state, "restored scene");
    Ok(())
}

use std::sync::Arc;

use crate::{AnimationEngine, AssetStore, EffectRegistry};

/// The two animated pictures of the scene: the beacon on top and the box
/// (windows) below. Each track's effect picks an animation for either.
#[derive(Debug)]
pub struct VisualCoordinator {
    beacon: AnimationEngine,
    box_engine: AnimationEngine,
    registry: Arc<EffectRegistry>,
    assets: AssetStore,
}

impl VisualCoordinator {
    pub fn new(
        beacon: AnimationEngine,
        box_engine: AnimationEngine,
        registry: Arc<EffectRegistry>,
        assets: AssetStore,
    ) -> Self {
        Self {
            beacon,
            box_engine,
            registry,
            assets,
        }
    }

    /// Loads and starts the animations of `effect_id`. Missing parts, missing
    /// assets and unknown effects are skipped; visuals never block audio.
    pub fn start(&mut self, effect_id: &str) {
        let resolved = self.registry.resolve(effect_id);
        if resolved.is_empty() {
            tracing::debug!(effect_id, "no visuals for effect");
        }

        if let Some(speed) = resolved.beacon {
            let path = self.assets.animation_path(speed.asset_name());
            launch(&mut self.beacon, &path);
        }

        if let Some(name) = resolved.box_asset {
            let path = self.assets.animation_path(name);
            launch(&mut self.box_engine, &path);
        }
    }

    pub fn tick(&mut self) {
        self.beacon.tick();
        self.box_engine.tick();
    }

    pub fn stop(&mut self) {
        self.beacon.stop();
        self.box_engine.stop();
    }

    pub fn is_animating(&self) -> bool {
        self.beacon.is_running() || self.box_engine.is_running()
    }

    pub fn beacon(&self) -> &AnimationEngine {
        &self.beacon
    }

    pub fn box_engine(&self) -> &AnimationEngine {
        &self.box_engine
    }
}

fn launch(engine: &mut AnimationEngine, path: &std::path::Path) {
    match engine.load(path) {
        Ok(_) => engine.start(),
        Err(err) => tracing::warn!(engine = engine.label(), %err, "animation skipped"),
    }
}

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{EffectRegistry, Result};

/// Top-level configuration structure for the application.
///
/// Every field has a default, so a configuration file only needs to name what
/// it changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub images: ImageConfig,
    pub host: HostConfig,
    /// Replaces the built-in effect table when present.
    pub effects: Option<EffectRegistry>,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn effect_registry(&self) -> EffectRegistry {
        self.effects.clone().unwrap_or_else(EffectRegistry::builtin)
    }
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub folder: PathBuf,
    pub initial_volume: u8,
    pub max_volume: u8,
    /// Upper bound on waiting for the backend to start playing.
    pub start_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Track length used by the simulated backend.
    pub simulated_track_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("audio"),
            initial_volume: 8,
            max_volume: 11,
            start_timeout_ms: 2_000,
            poll_interval_ms: 2,
            simulated_track_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub folder: PathBuf,
    /// Log frame throughput whenever an animation stops.
    pub stats: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("images"),
            stats: false,
        }
    }
}

/// Settings of the host poll loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub tick_interval_ms: u64,
    /// Capacity of the completion event channel.
    pub event_capacity: usize,
    pub demo_mode: bool,
    /// Longest the exit animation may run.
    pub finale_limit_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 10,
            event_capacity: 8,
            demo_mode: false,
            finale_limit_ms: 5_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BeaconSpeed;

    #[test]
    fn partial_files_fall_back_to_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "audio": { "initial_volume": 3 }, "host": { "demo_mode": true } }"#)
                .unwrap();

        assert_eq!(config.audio.initial_volume, 3);
        assert_eq!(config.audio.max_volume, 11);
        assert_eq!(config.host.tick_interval_ms, 10);
        assert!(config.host.demo_mode);
        assert_eq!(config.images.folder, PathBuf::from("images"));
        assert_eq!(config.effect_registry(), EffectRegistry::builtin());
    }

    #[test]
    fn loads_effect_overrides_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tardis.json");
        std::fs::write(
            &path,
            r#"{ "effects": { "pulse": { "box_asset": "palette", "beacon": "slow" } } }"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        let registry = config.effect_registry();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve("pulse").beacon, Some(BeaconSpeed::Slow));
        assert!(registry.resolve("heartBeatEffect").is_empty());
    }

    #[test]
    fn reports_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(AppConfig::load(&path).is_err());
        assert!(AppConfig::load(&dir.path().join("absent.json")).is_err());
    }
}

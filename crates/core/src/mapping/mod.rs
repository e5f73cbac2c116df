use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Beacon cycle speeds, each backed by its own animation asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeaconSpeed {
    Normal,
    Fast,
    Slow,
}

impl BeaconSpeed {
    /// Asset name (without extension) of the beacon animation.
    pub fn asset_name(self) -> &'static str {
        match self {
            BeaconSpeed::Normal => "beacon",
            BeaconSpeed::Fast => "beacon_fast",
            BeaconSpeed::Slow => "beacon_slow",
        }
    }
}

/// Describes which box (window) and beacon animations an effect shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectDescriptor {
    #[serde(default)]
    pub box_asset: Option<String>,
    #[serde(default)]
    pub beacon: Option<BeaconSpeed>,
}

/// What an effect id resolved to. Both parts are optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedEffect<'a> {
    pub box_asset: Option<&'a str>,
    pub beacon: Option<BeaconSpeed>,
}

impl ResolvedEffect<'_> {
    pub fn is_empty(&self) -> bool {
        self.box_asset.is_none() && self.beacon.is_none()
    }
}

/// Immutable lookup table from effect ids to their visuals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectRegistry {
    effects: HashMap<String, EffectDescriptor>,
}

const BUILTIN_EFFECTS: &[(&str, &str, BeaconSpeed)] = &[
    ("solidGreenEffect", "box_green", BeaconSpeed::Slow),
    ("solidOrangeEffect", "box_orange", BeaconSpeed::Slow),
    ("redGreenEffect", "red_green", BeaconSpeed::Normal),
    ("redBlueEffect", "red_blue", BeaconSpeed::Normal),
    ("riversEffect", "box_pink", BeaconSpeed::Slow),
    ("flickerEfffect", "flicker", BeaconSpeed::Fast),
    ("heartBeatEffect", "orange_beat", BeaconSpeed::Normal),
    ("tardisTakeoff", "blue_roll", BeaconSpeed::Normal),
    ("beat8Effect", "blue_fade_up", BeaconSpeed::Fast),
    ("basicPalEffect", "palette", BeaconSpeed::Normal),
];

impl EffectRegistry {
    pub fn new(effects: HashMap<String, EffectDescriptor>) -> Self {
        Self { effects }
    }

    pub fn builtin() -> Self {
        let effects = BUILTIN_EFFECTS
            .iter()
            .map(|(id, box_asset, beacon)| {
                (
                    id.to_string(),
                    EffectDescriptor {
                        box_asset: Some(box_asset.to_string()),
                        beacon: Some(*beacon),
                    },
                )
            })
            .collect();
        Self { effects }
    }

    /// Unknown ids resolve to no visual change.
    pub fn resolve(&self, effect_id: &str) -> ResolvedEffect<'_> {
        match self.effects.get(effect_id) {
            Some(descriptor) => ResolvedEffect {
                box_asset: descriptor.box_asset.as_deref(),
                beacon: descriptor.beacon,
            },
            None => {
                tracing::trace!(effect_id, "unregistered effect");
                ResolvedEffect::default()
            }
        }
    }

    /// Effect ids in sorted order.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.effects.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

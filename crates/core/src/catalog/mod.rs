use std::{fmt, path::Path};

use serde::{Deserialize, Serialize};

use crate::{Result, TardisError};

/// Associates an audio track number with a title and the effect shown while
/// it plays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Audio file prefix (`1` -> `001_*.*`).
    pub number: u32,
    pub title: String,
    pub effect: String,
}

impl Track {
    pub fn new(number: u32, title: impl Into<String>, effect: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            effect: effect.into(),
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}: \"{}\"", self.number, self.title)
    }
}

/// Ordered, immutable track list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Track>", into = "Vec<Track>")]
pub struct TrackCatalog {
    tracks: Vec<Track>,
}

impl TryFrom<Vec<Track>> for TrackCatalog {
    type Error = TardisError;

    fn try_from(tracks: Vec<Track>) -> Result<Self> {
        Self::new(tracks)
    }
}

impl From<TrackCatalog> for Vec<Track> {
    fn from(catalog: TrackCatalog) -> Self {
        catalog.tracks
    }
}

const BUILTIN_TRACKS: &[(u32, &str, &str)] = &[
    (17, "It's called the TARDIS", "beat8Effect"),
    (2, "Doctor Who theme excerpt", "heartBeatEffect"),
    (1, "TARDIS", "tardisTakeoff"),
    (9, "Hello, sweetie!", "riversEffect"),
    (3, "Don't blink", "beat8Effect"),
    (6, "Exterminate", "flickerEfffect"),
    (19, "Bigger on the inside", "riversEffect"),
    (5, "Strax suggests", "heartBeatEffect"),
    (4, "Clever", "redGreenEffect"),
    (10, "Wibbly Wobbly", "beat8Effect"),
    (8, "TARDIS door opens", "basicPalEffect"),
    (12, "Spoilers", "riversEffect"),
    (15, "You shouldn't have let me", "redBlueEffect"),
    (11, "Doctor Who theme (long)", "heartBeatEffect"),
    (14, "It goes ding", "basicPalEffect"),
    (16, "Codename the Doctor", "redBlueEffect"),
    (13, "Strax is runover", "heartBeatEffect"),
    (21, "Smaller on the outside", "riversEffect"),
    (7, "TARDIS Takeoff", "tardisTakeoff"),
    (18, "That does very very complicated", "redGreenEffect"),
    (20, "Cloister bell", "flickerEfffect"),
];

impl TrackCatalog {
    pub fn new(tracks: Vec<Track>) -> Result<Self> {
        if tracks.is_empty() {
            return Err(TardisError::msg("track catalog is empty"));
        }
        Ok(Self { tracks })
    }

    pub fn builtin() -> Self {
        Self {
            tracks: BUILTIN_TRACKS
                .iter()
                .map(|(number, title, effect)| Track::new(*number, *title, *effect))
                .collect(),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let tracks: Vec<Track> = serde_json::from_str(&text)?;
        Self::new(tracks)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn titles(&self) -> Vec<&str> {
        self.tracks.iter().map(|track| track.title.as_str()).collect()
    }

    pub fn position(&self, title: &str) -> Result<usize> {
        self.tracks
            .iter()
            .position(|track| track.title == title)
            .ok_or_else(|| TardisError::SelectionNotFound(title.to_string()))
    }

    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.tracks.len()
    }

    pub fn prev_index(&self, index: usize) -> usize {
        (index + self.tracks.len() - 1) % self.tracks.len()
    }
}

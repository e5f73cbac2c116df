use std::path::PathBuf;

use crate::{AssetKind, Result, TardisError};

/// Locates animation and audio assets on disk.
///
/// Animations live in the image folder as `<name>.png`. Audio tracks live in
/// the audio folder and are found by a three digit track number prefix, e.g.
/// `007_takeoff.mp3` for track 7.
#[derive(Debug, Clone)]
pub struct AssetStore {
    images: PathBuf,
    audio: PathBuf,
}

impl AssetStore {
    pub fn new(images: impl Into<PathBuf>, audio: impl Into<PathBuf>) -> Self {
        Self {
            images: images.into(),
            audio: audio.into(),
        }
    }

    /// Path of a named animation. Existence is checked by the decoder.
    pub fn animation_path(&self, name: &str) -> PathBuf {
        self.images.join(format!("{name}.png"))
    }

    /// Finds the audio file for `track` by expanding `NNN*.*` in the audio
    /// folder. When several files share the prefix the first in name order
    /// wins.
    pub fn audio_track(&self, track: u32) -> Result<PathBuf> {
        let pattern = self.audio.join(format!("{track:03}*.*"));
        let not_found = || TardisError::not_found(AssetKind::Audio, &pattern);

        let folder = self.audio.to_str().ok_or_else(not_found)?;
        let expression = format!("{}/{track:03}*.*", glob::Pattern::escape(folder));
        let entries = match glob::glob(&expression) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(%expression, %err, "invalid audio pattern");
                return Err(not_found());
            }
        };

        let mut matches: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .collect();
        matches.sort();
        matches.into_iter().next().ok_or_else(not_found)
    }

    /// Checks that the audio folder exists at all.
    pub fn verify(&self) -> Result<()> {
        if self.audio.is_dir() {
            Ok(())
        } else {
            Err(TardisError::not_found(AssetKind::Audio, &self.audio))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(files: &[&str]) -> (tempfile::TempDir, AssetStore) {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            std::fs::write(dir.path().join(file), b"").unwrap();
        }
        let store = AssetStore::new(dir.path().join("images"), dir.path());
        (dir, store)
    }

    #[test]
    fn finds_tracks_by_number_prefix() {
        let (dir, store) = store_with(&["002_theme.mp3", "017_tardis.wav", "020_bell.mp3"]);

        assert_eq!(store.audio_track(2).unwrap(), dir.path().join("002_theme.mp3"));
        assert_eq!(store.audio_track(17).unwrap(), dir.path().join("017_tardis.wav"));
        assert!(store.verify().is_ok());
    }

    #[test]
    fn errors_on_missing_tracks() {
        let (_dir, store) = store_with(&["002_theme.mp3", "0031_noext"]);

        let err = store.audio_track(3).unwrap_err();
        assert!(err.is_not_found());
        assert!(format!("{err}").contains("003*.*"));
    }

    #[test]
    fn first_match_in_name_order_wins() {
        let (dir, store) = store_with(&["005_b.ogg", "005_a.mp3", "0050.wav"]);
        std::fs::create_dir(dir.path().join("005_dir.d")).unwrap();

        assert_eq!(store.audio_track(5).unwrap(), dir.path().join("0050.wav"));
        std::fs::remove_file(dir.path().join("0050.wav")).unwrap();
        assert_eq!(store.audio_track(5).unwrap(), dir.path().join("005_a.mp3"));
    }

    #[test]
    fn folder_names_are_not_treated_as_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("[audio]");
        std::fs::create_dir(&audio).unwrap();
        std::fs::write(audio.join("001_intro.mp3"), b"").unwrap();

        let store = AssetStore::new(dir.path(), &audio);
        assert_eq!(store.audio_track(1).unwrap(), audio.join("001_intro.mp3"));
    }

    #[test]
    fn missing_audio_folder_is_not_found() {
        let store = AssetStore::new("images", "/definitely/not/here");
        assert!(store.verify().unwrap_err().is_not_found());
        assert!(store.audio_track(1).unwrap_err().is_not_found());
    }

    #[test]
    fn animation_paths_use_png_extension() {
        let store = AssetStore::new("/assets/images", "/assets/audio");
        assert_eq!(
            store.animation_path("beacon_fast"),
            PathBuf::from("/assets/images/beacon_fast.png")
        );
    }
}

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{AnimationSequence, Clock, DisplaySurface, ImageDecoder, ImageHandle, Result};

/// Result of [`AnimationEngine::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A new sequence replaced the previous one.
    Loaded { frames: usize },
    /// The same asset was already loaded; frame state is untouched.
    Unchanged,
    /// Loaded, but the asset has a single frame and will never advance.
    Degenerate,
}

/// Throughput of one run, recorded on stop when statistics are enabled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationStats {
    pub frames: u64,
    pub elapsed_ms: u64,
    pub fps: f64,
}

/// Plays one [`AnimationSequence`] into one display slot, driven purely by
/// [`tick`](Self::tick) calls from the host loop.
///
/// The image shown on the surface when the engine is created is saved and put
/// back on every stop.
pub struct AnimationEngine {
    label: String,
    surface: Box<dyn DisplaySurface>,
    decoder: Arc<dyn ImageDecoder>,
    clock: Arc<dyn Clock>,
    sequence: Option<AnimationSequence>,
    loaded: Option<PathBuf>,
    saved_image: Option<ImageHandle>,
    current_frame: usize,
    current_loop: u32,
    last_advance: u64,
    running: bool,
    stats_enabled: bool,
    run_started: u64,
    frames_shown: u64,
    last_stats: Option<AnimationStats>,
}

impl AnimationEngine {
    pub fn new(
        label: impl Into<String>,
        surface: Box<dyn DisplaySurface>,
        decoder: Arc<dyn ImageDecoder>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let saved_image = surface.current_image();
        Self {
            label: label.into(),
            surface,
            decoder,
            clock,
            sequence: None,
            loaded: None,
            saved_image,
            current_frame: 0,
            current_loop: 0,
            last_advance: 0,
            running: false,
            stats_enabled: false,
            run_started: 0,
            frames_shown: 0,
            last_stats: None,
        }
    }

    /// Enables frame throughput statistics, logged on every stop.
    pub fn with_stats(mut self, enabled: bool) -> Self {
        self.stats_enabled = enabled;
        self
    }

    /// (Re-)loads an animation asset. A running animation is stopped first so
    /// the saved image is back on screen before the content changes.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<LoadOutcome> {
        let path = path.as_ref();
        self.stop();

        if self.loaded.as_deref() == Some(path) {
            return Ok(LoadOutcome::Unchanged);
        }

        let sequence = self.decoder.decode(path)?;
        let outcome = if sequence.is_degenerate() {
            tracing::warn!(engine = %self.label, path = %path.display(), "not an animated image");
            LoadOutcome::Degenerate
        } else {
            LoadOutcome::Loaded {
                frames: sequence.len(),
            }
        };
        tracing::debug!(
            engine = %self.label,
            path = %path.display(),
            frames = sequence.len(),
            loops = sequence.loop_count(),
            default_frame = sequence.has_default_frame(),
            "animation loaded"
        );

        self.sequence = Some(sequence);
        self.loaded = Some(path.to_path_buf());
        self.current_frame = 0;
        self.current_loop = 0;
        Ok(outcome)
    }

    /// Shows the first timed frame and starts the loop from the beginning.
    pub fn start(&mut self) {
        let Some(sequence) = self.sequence.as_ref() else {
            tracing::debug!(engine = %self.label, "start ignored, nothing loaded");
            return;
        };

        self.current_frame = sequence.first_index();
        self.current_loop = 0;
        self.surface.set_image(&sequence.frames()[self.current_frame].image);
        self.running = true;

        let now = self.clock.now_ms();
        self.last_advance = now;
        self.run_started = now;
        self.frames_shown = 0;
    }

    /// Advances at most one frame once the current frame's duration has
    /// elapsed. A late tick never skips frames to catch up.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }
        let Some(sequence) = self.sequence.as_ref() else {
            return;
        };

        let now = self.clock.now_ms();
        let due = u64::from(sequence.frames()[self.current_frame].duration_ms);
        if now.saturating_sub(self.last_advance) < due {
            return;
        }

        let mut next = self.current_frame + 1;
        if next >= sequence.len() {
            let loop_count = sequence.loop_count();
            if loop_count > 0 {
                self.current_loop += 1;
                if self.current_loop >= loop_count {
                    self.stop();
                    return;
                }
            }
            next = sequence.first_index();
        }

        self.surface.set_image(&sequence.frames()[next].image);
        self.current_frame = next;
        self.last_advance = now;
        self.frames_shown += 1;
    }

    /// Stops the animation and puts the saved image back.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }

        match &self.saved_image {
            Some(image) => self.surface.set_image(image),
            None => self.surface.clear(),
        }
        self.running = false;

        if self.stats_enabled {
            let elapsed_ms = self.clock.now_ms().saturating_sub(self.run_started);
            let fps = if elapsed_ms == 0 {
                0.0
            } else {
                self.frames_shown as f64 * 1000.0 / elapsed_ms as f64
            };
            tracing::info!(
                engine = %self.label,
                frames = self.frames_shown,
                elapsed_ms,
                fps = format_args!("{fps:.2}"),
                "animation stopped"
            );
            self.last_stats = Some(AnimationStats {
                frames: self.frames_shown,
                elapsed_ms,
                fps,
            });
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn current_loop(&self) -> u32 {
        self.current_loop
    }

    pub fn loaded_path(&self) -> Option<&Path> {
        self.loaded.as_deref()
    }

    pub fn last_stats(&self) -> Option<AnimationStats> {
        self.last_stats
    }
}

impl std::fmt::Debug for AnimationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationEngine")
            .field("label", &self.label)
            .field("loaded", &self.loaded)
            .field("current_frame", &self.current_frame)
            .field("current_loop", &self.current_loop)
            .field("running", &self.running)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{labelled_sequence, ManualClock, MemoryDecoder, SurfaceSlot};

    struct Rig {
        clock: ManualClock,
        slot: SurfaceSlot,
        engine: AnimationEngine,
    }

    fn rig(decoder: MemoryDecoder) -> Rig {
        let clock = ManualClock::new();
        let slot = SurfaceSlot::showing(ImageHandle::labelled("static"));
        let engine = AnimationEngine::new(
            "box",
            Box::new(slot.clone()),
            Arc::new(decoder),
            Arc::new(clock.clone()),
        );
        Rig {
            clock,
            slot,
            engine,
        }
    }

    fn decoder_with(path: &str, durations: &[u32], loops: u32) -> MemoryDecoder {
        MemoryDecoder::new().with(path, labelled_sequence("ani", durations, loops).unwrap())
    }

    fn step(rig: &mut Rig, ms: u64) {
        rig.clock.advance(ms);
        rig.engine.tick();
    }

    #[test]
    fn plays_poster_animation_once_then_restores() {
        let mut rig = rig(decoder_with("btn.png", &[0, 100, 150], 1));
        rig.engine.load("btn.png").unwrap();
        rig.engine.start();
        assert_eq!(rig.slot.current_label().as_deref(), Some("ani#1"));

        step(&mut rig, 100);
        assert_eq!(rig.slot.current_label().as_deref(), Some("ani#2"));

        step(&mut rig, 150);
        assert!(!rig.engine.is_running());
        assert_eq!(rig.slot.current_label().as_deref(), Some("static"));
    }

    #[test]
    fn stops_after_exactly_loop_count_passes() {
        let mut rig = rig(decoder_with("a.png", &[20, 20, 20], 2));
        rig.engine.load("a.png").unwrap();
        rig.engine.start();

        for _ in 0..(2 * 3 - 1) {
            step(&mut rig, 20);
        }
        assert!(rig.engine.is_running());
        assert_eq!(rig.engine.current_loop(), 1);

        step(&mut rig, 20);
        assert!(!rig.engine.is_running());
        assert_eq!(rig.slot.current_label().as_deref(), Some("static"));
    }

    #[test]
    fn infinite_loop_only_stops_on_request() {
        let mut rig = rig(decoder_with("a.png", &[10, 10], 0));
        rig.engine.load("a.png").unwrap();
        rig.engine.start();

        for _ in 0..500 {
            step(&mut rig, 10);
        }
        assert!(rig.engine.is_running());

        rig.engine.stop();
        assert!(!rig.engine.is_running());
        assert_eq!(rig.slot.current_label().as_deref(), Some("static"));
    }

    #[test]
    fn default_frame_is_never_shown_while_running() {
        let mut rig = rig(decoder_with("a.png", &[0, 30, 30, 30], 0));
        rig.engine.load("a.png").unwrap();
        rig.engine.start();

        for _ in 0..40 {
            assert_ne!(rig.engine.current_frame(), 0);
            assert_ne!(rig.slot.current_label().as_deref(), Some("ani#0"));
            step(&mut rig, 30);
        }
    }

    #[test]
    fn late_ticks_advance_a_single_frame() {
        let mut rig = rig(decoder_with("a.png", &[10, 10, 10, 10], 0));
        rig.engine.load("a.png").unwrap();
        rig.engine.start();

        step(&mut rig, 1_000);
        assert_eq!(rig.engine.current_frame(), 1);
        // nothing new is due until the current frame's own duration passes
        step(&mut rig, 5);
        assert_eq!(rig.engine.current_frame(), 1);
        step(&mut rig, 5);
        assert_eq!(rig.engine.current_frame(), 2);
    }

    #[test]
    fn reloading_the_same_asset_keeps_frame_state() {
        let mut rig = rig(decoder_with("a.png", &[10, 10, 10], 0));
        assert_eq!(
            rig.engine.load("a.png").unwrap(),
            LoadOutcome::Loaded { frames: 3 }
        );
        rig.engine.start();
        step(&mut rig, 10);
        assert_eq!(rig.engine.current_frame(), 1);

        assert_eq!(rig.engine.load("a.png").unwrap(), LoadOutcome::Unchanged);
        assert_eq!(rig.engine.current_frame(), 1);
        assert_eq!(rig.engine.current_loop(), 0);
        assert_eq!(rig.engine.load("a.png").unwrap(), LoadOutcome::Unchanged);
        assert_eq!(rig.engine.current_frame(), 1);
    }

    #[test]
    fn loading_while_running_restores_the_saved_image_first() {
        let decoder = decoder_with("a.png", &[10, 10], 0)
            .with("b.png", labelled_sequence("other", &[10, 10], 0).unwrap());
        let mut rig = rig(decoder);
        rig.engine.load("a.png").unwrap();
        rig.engine.start();
        assert_eq!(rig.slot.current_label().as_deref(), Some("ani#0"));

        rig.engine.load("b.png").unwrap();
        assert!(!rig.engine.is_running());
        assert_eq!(rig.slot.current_label().as_deref(), Some("static"));
        assert_eq!(rig.engine.loaded_path(), Some(Path::new("b.png")));
    }

    #[test]
    fn missing_asset_keeps_the_previous_sequence() {
        let mut rig = rig(decoder_with("a.png", &[10, 10], 0));
        rig.engine.load("a.png").unwrap();

        let err = rig.engine.load("missing.png").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(rig.engine.loaded_path(), Some(Path::new("a.png")));

        rig.engine.start();
        assert!(rig.engine.is_running());
    }

    #[test]
    fn single_frame_is_accepted_as_degenerate() {
        let mut rig = rig(decoder_with("still.png", &[100], 0));
        assert_eq!(rig.engine.load("still.png").unwrap(), LoadOutcome::Degenerate);

        rig.engine.start();
        for _ in 0..5 {
            step(&mut rig, 100);
        }
        assert!(rig.engine.is_running());
        assert_eq!(rig.engine.current_frame(), 0);
    }

    #[test]
    fn start_without_load_and_redundant_stop_are_no_ops() {
        let mut rig = rig(MemoryDecoder::new());
        rig.engine.start();
        rig.engine.tick();
        rig.engine.stop();
        assert!(!rig.engine.is_running());
        assert_eq!(rig.slot.updates(), 0);
    }

    #[test]
    fn restart_rewinds_to_the_first_timed_frame() {
        let mut rig = rig(decoder_with("a.png", &[0, 10, 10, 10], 3));
        rig.engine.load("a.png").unwrap();
        rig.engine.start();
        step(&mut rig, 10);
        step(&mut rig, 10);
        assert_eq!(rig.engine.current_frame(), 3);

        rig.engine.start();
        assert_eq!(rig.engine.current_frame(), 1);
        assert_eq!(rig.engine.current_loop(), 0);
    }

    #[test]
    fn records_throughput_on_stop() {
        let clock = ManualClock::new();
        let slot = SurfaceSlot::new();
        let mut engine = AnimationEngine::new(
            "beacon",
            Box::new(slot.clone()),
            Arc::new(decoder_with("a.png", &[50, 50], 0)),
            Arc::new(clock.clone()),
        )
        .with_stats(true);

        engine.load("a.png").unwrap();
        engine.start();
        for _ in 0..4 {
            clock.advance(50);
            engine.tick();
        }
        engine.stop();

        let stats = engine.last_stats().expect("stats are recorded");
        assert_eq!(stats.frames, 4);
        assert_eq!(stats.elapsed_ms, 200);
        assert!((stats.fps - 20.0).abs() < 1e-9);
        // without a static picture the slot is cleared
        assert!(slot.current_image().is_none());
    }
}

//! Fixtures shared by the coordinator tests.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use crate::{
    event_channel, labelled_sequence, AnimationEngine, AssetStore, AudioBackend, AudioConfig,
    AudioPlayer, AudioTrack, BackendState, EffectRegistry, EndHook, EventReceiver, ImageHandle,
    ManualClock, MemoryDecoder, PlaybackCoordinator, Result, SimulatedAudio, SurfaceSlot, Track,
    TrackCatalog, VisualCoordinator,
};

pub(crate) const TRACK_MS: u64 = 2_000;

pub(crate) struct Rig {
    pub clock: ManualClock,
    pub backend: SimulatedAudio,
    pub beacon: SurfaceSlot,
    pub window: SurfaceSlot,
    pub coordinator: PlaybackCoordinator,
    pub events: EventReceiver,
    pub catalog: Arc<TrackCatalog>,
    pub audio_dir: tempfile::TempDir,
}

/// Four tracks: 0 and 1 have audio and visuals, 2 has audio but an unknown
/// effect, 3 has no audio file.
pub(crate) fn catalog() -> TrackCatalog {
    TrackCatalog::new(vec![
        Track::new(2, "Doctor Who theme excerpt", "heartBeatEffect"),
        Track::new(17, "It's called the TARDIS", "beat8Effect"),
        Track::new(9, "Hello, sweetie!", "madeUpEffect"),
        Track::new(3, "Don't blink", "beat8Effect"),
    ])
    .unwrap()
}

pub(crate) fn rig() -> Rig {
    rig_with(|clock| SimulatedAudio::new(Arc::new(clock.clone()), TRACK_MS))
}

pub(crate) fn rig_with(backend: impl FnOnce(&ManualClock) -> SimulatedAudio) -> Rig {
    rig_wrapped(backend, |simulated| Box::new(simulated))
}

/// Like [`rig_with`], but the player talks to `wrap(backend)`.
pub(crate) fn rig_wrapped(
    backend: impl FnOnce(&ManualClock) -> SimulatedAudio,
    wrap: impl FnOnce(SimulatedAudio) -> Box<dyn AudioBackend>,
) -> Rig {
    let clock = ManualClock::new();
    let backend = backend(&clock);

    let audio_dir = tempfile::tempdir().unwrap();
    for file in ["002_theme.mp3", "017_tardis.mp3", "009_sweetie.mp3"] {
        std::fs::write(audio_dir.path().join(file), b"").unwrap();
    }
    let assets = AssetStore::new("img", audio_dir.path());

    let decoder = Arc::new(
        MemoryDecoder::new()
            .with("img/beacon.png", labelled_sequence("beacon", &[40, 40], 0).unwrap())
            .with("img/beacon_fast.png", labelled_sequence("fast", &[20, 20], 0).unwrap())
            .with("img/orange_beat.png", labelled_sequence("beat", &[0, 25, 25], 0).unwrap())
            .with("img/blue_fade_up.png", labelled_sequence("fade", &[30, 30, 30], 0).unwrap()),
    );
    let beacon = SurfaceSlot::showing(ImageHandle::labelled("static_beacon"));
    let window = SurfaceSlot::showing(ImageHandle::labelled("static_box"));
    let engine = |label: &str, slot: &SurfaceSlot| {
        AnimationEngine::new(
            label,
            Box::new(slot.clone()),
            decoder.clone(),
            Arc::new(clock.clone()),
        )
    };
    let visuals = VisualCoordinator::new(
        engine("beacon", &beacon),
        engine("box", &window),
        Arc::new(EffectRegistry::builtin()),
        assets.clone(),
    );

    let config = AudioConfig {
        start_timeout_ms: 10,
        poll_interval_ms: 1,
        ..AudioConfig::default()
    };
    let audio = AudioPlayer::new(wrap(backend.clone()), assets, &config);
    let catalog = Arc::new(catalog());
    let (sender, events) = event_channel(8);
    let coordinator = PlaybackCoordinator::new(audio, visuals, catalog.clone(), sender);

    Rig {
        clock,
        backend,
        beacon,
        window,
        coordinator,
        events,
        catalog,
        audio_dir,
    }
}

/// Collects end hooks instead of letting the simulated track fire them, so a
/// test can run them from a thread of its own the way a real device does.
#[derive(Clone, Default)]
pub(crate) struct HeldHooks {
    hooks: Arc<Mutex<Vec<EndHook>>>,
}

impl HeldHooks {
    pub fn wrapping(&self, inner: SimulatedAudio) -> HoldingBackend {
        HoldingBackend {
            inner,
            hooks: self.hooks.clone(),
        }
    }

    /// Oldest hook not yet taken.
    pub fn take(&self) -> Option<EndHook> {
        let mut hooks = self.hooks.lock().unwrap();
        if hooks.is_empty() {
            None
        } else {
            Some(hooks.remove(0))
        }
    }
}

pub(crate) struct HoldingBackend {
    inner: SimulatedAudio,
    hooks: Arc<Mutex<Vec<EndHook>>>,
}

impl AudioBackend for HoldingBackend {
    fn open(&mut self, path: &Path) -> Result<Box<dyn AudioTrack>> {
        Ok(Box::new(HoldingTrack {
            inner: self.inner.open(path)?,
            hooks: self.hooks.clone(),
        }))
    }
}

struct HoldingTrack {
    inner: Box<dyn AudioTrack>,
    hooks: Arc<Mutex<Vec<EndHook>>>,
}

impl AudioTrack for HoldingTrack {
    fn play(&mut self) -> Result<()> {
        self.inner.play()
    }

    fn state(&self) -> BackendState {
        self.inner.state()
    }

    fn duration_ms(&self) -> u64 {
        self.inner.duration_ms()
    }

    fn elapsed_ms(&self) -> u64 {
        self.inner.elapsed_ms()
    }

    fn stop(&mut self) {
        self.inner.stop()
    }

    fn set_volume(&mut self, percent: u8) {
        self.inner.set_volume(percent)
    }

    fn on_ended(&mut self, hook: EndHook) {
        self.hooks.lock().unwrap().push(hook);
    }
}

use std::{
    cell::{Cell, RefCell},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use crate::{AssetStore, AudioConfig, Clock, Result, TardisError};

/// Lifecycle of one track as reported by the audio backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    /// Opened but not asked to play yet.
    Idle,
    /// Asked to play, still loading.
    Starting,
    Playing,
    /// Stopped on request or ended naturally.
    Stopped,
}

/// Callback run once when a track reaches its natural end. Backends may call
/// it from their own thread.
pub type EndHook = Box<dyn FnOnce() + Send + 'static>;

/// One opened track, owned exclusively by whoever opened it.
pub trait AudioTrack: Send {
    fn play(&mut self) -> Result<()>;
    fn state(&self) -> BackendState;
    /// Length in milliseconds; 0 until the track is actually playing.
    fn duration_ms(&self) -> u64;
    fn elapsed_ms(&self) -> u64;
    fn stop(&mut self);
    fn set_volume(&mut self, percent: u8);
    fn on_ended(&mut self, hook: EndHook);
}

/// Opens playable tracks. Decoding and output are the backend's business.
pub trait AudioBackend {
    fn open(&mut self, path: &Path) -> Result<Box<dyn AudioTrack>>;
}

/// Plays catalog tracks one at a time through an [`AudioBackend`].
///
/// A new track is opened for every play; the previous one is always stopped
/// and released first.
pub struct AudioPlayer {
    backend: Box<dyn AudioBackend>,
    assets: AssetStore,
    volume: u8,
    max_volume: u8,
    start_polls: u64,
    poll_interval: Duration,
    track: Option<Box<dyn AudioTrack>>,
}

impl AudioPlayer {
    pub fn new(backend: Box<dyn AudioBackend>, assets: AssetStore, config: &AudioConfig) -> Self {
        let max_volume = config.max_volume.max(1);
        let poll_ms = config.poll_interval_ms.max(1);
        Self {
            backend,
            assets,
            volume: config.initial_volume.min(max_volume),
            max_volume,
            start_polls: (config.start_timeout_ms / poll_ms).max(1),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            track: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.track
            .as_ref()
            .map(|track| track.state() == BackendState::Playing)
            .unwrap_or(false)
    }

    /// Duration of the current track in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.track.as_ref().map(|track| track.duration_ms()).unwrap_or(0)
    }

    /// How long the current track has played, in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.track.as_ref().map(|track| track.elapsed_ms()).unwrap_or(0)
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Clamps and caches the volume, so it also applies to the next track.
    pub fn set_volume(&mut self, level: i32) {
        self.volume = level.clamp(0, i32::from(self.max_volume)) as u8;
        let percent = self.backend_percent();
        if let Some(track) = self.track.as_mut() {
            track.set_volume(percent);
        }
    }

    fn backend_percent(&self) -> u8 {
        ((100.0 * f64::from(self.volume) / f64::from(self.max_volume)).round()) as u8
    }

    /// Starts `track_number` and waits until the backend reports it playing.
    ///
    /// Returns the track duration, or 0 when no audio file exists for the
    /// number. Fails with `StartTimeout` if the backend never starts.
    pub fn play(&mut self, track_number: u32, on_ended: Option<EndHook>) -> Result<u64> {
        self.stop();

        let path = match self.assets.audio_track(track_number) {
            Ok(path) => path,
            Err(err) if err.is_not_found() => {
                tracing::warn!(track = track_number, %err, "audio track not found");
                return Ok(0);
            }
            Err(err) => return Err(err),
        };

        let mut track = match self.backend.open(&path) {
            Ok(track) => track,
            Err(err) if err.is_not_found() => {
                tracing::warn!(path = %path.display(), %err, "audio backend could not open track");
                return Ok(0);
            }
            Err(err) => return Err(err),
        };
        track.set_volume(self.backend_percent());
        if let Some(hook) = on_ended {
            track.on_ended(hook);
        }
        track.play()?;

        // the duration is only known once the backend is actually playing
        let mut polls = 0;
        while matches!(track.state(), BackendState::Idle | BackendState::Starting) {
            if polls >= self.start_polls {
                track.stop();
                return Err(TardisError::StartTimeout {
                    path,
                    waited_ms: polls * self.poll_interval.as_millis() as u64,
                });
            }
            std::thread::sleep(self.poll_interval);
            polls += 1;
        }

        let duration = track.duration_ms();
        tracing::debug!(path = %path.display(), duration_ms = duration, polls, "audio started");
        self.track = Some(track);
        Ok(duration)
    }

    /// Silence. Safe to call at any time.
    pub fn stop(&mut self) {
        let Some(mut track) = self.track.take() else {
            return;
        };
        track.stop();

        let mut polls = 0;
        while track.state() == BackendState::Playing && polls < self.start_polls {
            std::thread::sleep(self.poll_interval);
            polls += 1;
        }
    }
}

impl std::fmt::Debug for AudioPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioPlayer")
            .field("assets", &self.assets)
            .field("volume", &self.volume)
            .field("max_volume", &self.max_volume)
            .field("has_track", &self.track.is_some())
            .finish()
    }
}

/// Clock-driven stand-in for a real audio device.
///
/// Tracks "play" for a fixed length of time measured on the injected clock.
/// The end hook fires from whichever call first observes the end.
#[derive(Clone)]
pub struct SimulatedAudio {
    clock: Arc<dyn Clock>,
    length_ms: u64,
    reported_ms: Option<u64>,
    start_after_polls: u32,
    never_starts: bool,
    opened: Arc<Mutex<Vec<PathBuf>>>,
}

impl SimulatedAudio {
    pub fn new(clock: Arc<dyn Clock>, length_ms: u64) -> Self {
        Self {
            clock,
            length_ms,
            reported_ms: None,
            start_after_polls: 0,
            never_starts: false,
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Duration the backend claims, when it differs from the real length.
    pub fn with_reported_duration(mut self, ms: u64) -> Self {
        self.reported_ms = Some(ms);
        self
    }

    /// Tracks report `Starting` for this many state polls after `play`.
    pub fn with_start_delay(mut self, polls: u32) -> Self {
        self.start_after_polls = polls;
        self
    }

    /// Tracks never leave `Starting`.
    pub fn never_starting(mut self) -> Self {
        self.never_starts = true;
        self
    }

    /// Paths opened so far, oldest first.
    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AudioBackend for SimulatedAudio {
    fn open(&mut self, path: &Path) -> Result<Box<dyn AudioTrack>> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_path_buf());
        Ok(Box::new(SimulatedTrack {
            clock: self.clock.clone(),
            length_ms: self.length_ms,
            reported_ms: self.reported_ms.unwrap_or(self.length_ms),
            pending_polls: Cell::new(self.start_after_polls),
            never_starts: self.never_starts,
            started_at: None,
            stopped: false,
            hook: RefCell::new(None),
        }))
    }
}

struct SimulatedTrack {
    clock: Arc<dyn Clock>,
    length_ms: u64,
    reported_ms: u64,
    pending_polls: Cell<u32>,
    never_starts: bool,
    started_at: Option<u64>,
    stopped: bool,
    hook: RefCell<Option<EndHook>>,
}

impl AudioTrack for SimulatedTrack {
    fn play(&mut self) -> Result<()> {
        self.started_at = Some(self.clock.now_ms());
        Ok(())
    }

    fn state(&self) -> BackendState {
        if self.stopped {
            return BackendState::Stopped;
        }
        let Some(started_at) = self.started_at else {
            return BackendState::Idle;
        };
        if self.never_starts {
            return BackendState::Starting;
        }
        let pending = self.pending_polls.get();
        if pending > 0 {
            self.pending_polls.set(pending - 1);
            return BackendState::Starting;
        }
        if self.clock.now_ms().saturating_sub(started_at) >= self.length_ms {
            if let Some(hook) = self.hook.borrow_mut().take() {
                hook();
            }
            return BackendState::Stopped;
        }
        BackendState::Playing
    }

    fn duration_ms(&self) -> u64 {
        match self.state() {
            BackendState::Playing | BackendState::Stopped if self.started_at.is_some() => self.reported_ms,
            _ => 0,
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.started_at
            .map(|started_at| self.clock.now_ms().saturating_sub(started_at))
            .unwrap_or(0)
    }

    fn stop(&mut self) {
        self.stopped = true;
        self.hook.borrow_mut().take();
    }

    fn set_volume(&mut self, percent: u8) {
        tracing::trace!(percent, "simulated volume");
    }

    fn on_ended(&mut self, hook: EndHook) {
        *self.hook.borrow_mut() = Some(hook);
    }
}

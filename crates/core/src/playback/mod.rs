use std::sync::Arc;

use crate::{
    AudioPlayer, EndHook, EventSender, PlaybackEvent, Result, TardisError, TrackCatalog, TrackTag,
    VisualCoordinator,
};

/// Window title shown while nothing plays.
pub const IDLE_TITLE: &str = "..idle..";

/// Result of [`PlaybackCoordinator::play`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// No audio could be started; the display stays idle.
    Idle,
    Playing { tag: TrackTag, duration_ms: u64 },
}

/// Result of one [`PlaybackCoordinator::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Playing { progress: u8 },
    /// The audio ended since the last tick. The host decides what follows.
    Ended(TrackTag),
}

#[derive(Debug, Clone, Copy)]
struct ActiveTrack {
    tag: TrackTag,
    duration_ms: u64,
    end_reported: bool,
}

/// Keeps the audio track and the scene visuals in step.
///
/// All state changes happen on the host thread. The only thing that crosses
/// threads is the end-of-track notice, which goes through the event channel.
#[derive(Debug)]
pub struct PlaybackCoordinator {
    audio: AudioPlayer,
    visuals: VisualCoordinator,
    catalog: Arc<TrackCatalog>,
    events: EventSender,
    active: Option<ActiveTrack>,
    last_play_id: u64,
}

impl PlaybackCoordinator {
    pub fn new(
        audio: AudioPlayer,
        visuals: VisualCoordinator,
        catalog: Arc<TrackCatalog>,
        events: EventSender,
    ) -> Self {
        Self {
            audio,
            visuals,
            catalog,
            events,
            active: None,
            last_play_id: 0,
        }
    }

    /// Plays catalog entry `track_index`, tearing down whatever played before.
    pub fn play(&mut self, track_index: usize) -> Result<PlayOutcome> {
        self.stop();

        let catalog = self.catalog.clone();
        let track = catalog
            .get(track_index)
            .ok_or_else(|| TardisError::SelectionNotFound(format!("track #{track_index}")))?;

        self.last_play_id += 1;
        let tag = TrackTag {
            track_index,
            play_id: self.last_play_id,
        };
        let events = self.events.clone();
        let on_ended: EndHook = Box::new(move || {
            events.notify(PlaybackEvent::Finished(tag));
        });

        let duration_ms = self.audio.play(track.number, Some(on_ended))?;
        if duration_ms == 0 {
            self.audio.stop();
            tracing::info!(track = %track, "nothing to play");
            return Ok(PlayOutcome::Idle);
        }

        self.active = Some(ActiveTrack {
            tag,
            duration_ms,
            end_reported: false,
        });
        self.visuals.start(&track.effect);
        tracing::info!(track = %track, duration_ms, effect = %track.effect, "playing");
        Ok(PlayOutcome::Playing { tag, duration_ms })
    }

    /// Advances the visuals while the audio is alive and reports when it
    /// has ended. Never stops playback by itself.
    pub fn tick(&mut self) -> TickOutcome {
        let Some(active) = self.active.as_mut() else {
            return TickOutcome::Idle;
        };

        if self.audio.is_playing() {
            self.visuals.tick();
            return TickOutcome::Playing {
                progress: self.progress(),
            };
        }

        if !active.end_reported {
            active.end_reported = true;
            tracing::debug!(track_index = active.tag.track_index, "track ended");
            self.events.notify(PlaybackEvent::Finished(active.tag));
        }
        TickOutcome::Ended(active.tag)
    }

    /// Stops audio and visuals. Idempotent.
    pub fn stop(&mut self) {
        self.audio.stop();
        self.visuals.stop();
        if let Some(active) = self.active.take() {
            tracing::debug!(track_index = active.tag.track_index, "playback stopped");
        }
    }

    /// Percentage of the track played so far, 0 when not playing.
    pub fn progress(&self) -> u8 {
        match &self.active {
            Some(active) if self.audio.is_playing() => {
                percent(self.audio.elapsed_ms(), active.duration_ms)
            }
            _ => 0,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.active.is_some() && self.audio.is_playing()
    }

    /// Whether `tag` refers to the play that is currently active.
    pub fn is_current(&self, tag: TrackTag) -> bool {
        self.active.map(|active| active.tag == tag).unwrap_or(false)
    }

    pub fn current_tag(&self) -> Option<TrackTag> {
        self.active.map(|active| active.tag)
    }

    /// Duration of the active track; 0 exactly when nothing is playing.
    pub fn known_duration_ms(&self) -> u64 {
        self.active.map(|active| active.duration_ms).unwrap_or(0)
    }

    pub fn set_volume(&mut self, level: i32) {
        self.audio.set_volume(level);
    }

    pub fn volume(&self) -> u8 {
        self.audio.volume()
    }

    /// `"<title>: <seconds>"` for the active track, otherwise the idle title.
    pub fn headline(&self) -> String {
        let track = self
            .active
            .and_then(|active| self.catalog.get(active.tag.track_index));
        match (track, self.active) {
            (Some(track), Some(active)) => {
                format!("{}: {:.1}", track.title, active.duration_ms as f64 / 1000.0)
            }
            _ => IDLE_TITLE.to_string(),
        }
    }

    /// Sender for end-of-track notices, for backends wired up by the host.
    pub fn events(&self) -> &EventSender {
        &self.events
    }

    pub fn catalog(&self) -> &Arc<TrackCatalog> {
        &self.catalog
    }

    pub fn visuals(&self) -> &VisualCoordinator {
        &self.visuals
    }
}

fn percent(elapsed_ms: u64, duration_ms: u64) -> u8 {
    if duration_ms == 0 {
        return 0;
    }
    (elapsed_ms as f64 * 100.0 / duration_ms as f64).round().min(100.0) as u8
}

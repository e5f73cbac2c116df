use crate::{
    EventReceiver, PlayOutcome, PlaybackCoordinator, PlaybackEvent, Result, TickOutcome,
    IDLE_TITLE,
};

/// Discrete user requests delivered by the host UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Play the selected track, or stop the one playing.
    TogglePlay,
    SelectTitle(String),
    Next,
    Prev,
    SetVolume(i32),
    /// "Play all" mode: keep advancing to the next track.
    SetDemo(bool),
}

/// Host-side policy around a [`PlaybackCoordinator`]: track selection, what a
/// finished track leads to, and the values the UI displays.
#[derive(Debug)]
pub struct Session {
    coordinator: PlaybackCoordinator,
    events: EventReceiver,
    selected: usize,
    playing: bool,
    demo_mode: bool,
    progress: u8,
    title: String,
}

impl Session {
    pub fn new(coordinator: PlaybackCoordinator, events: EventReceiver) -> Self {
        Self {
            coordinator,
            events,
            selected: 0,
            playing: false,
            demo_mode: false,
            progress: 0,
            title: IDLE_TITLE.to_string(),
        }
    }

    pub fn handle(&mut self, action: Action) -> Result<()> {
        match action {
            Action::TogglePlay => {
                if self.playing {
                    self.stop_playback();
                    Ok(())
                } else {
                    self.start_playback()
                }
            }
            Action::SelectTitle(title) => {
                let index = match self.coordinator.catalog().position(&title) {
                    Ok(index) => index,
                    Err(err) => {
                        tracing::warn!(%err, "selection ignored");
                        return Err(err);
                    }
                };
                self.select(index)
            }
            Action::Next => {
                let index = self.coordinator.catalog().next_index(self.selected);
                self.select(index)
            }
            Action::Prev => {
                let index = self.coordinator.catalog().prev_index(self.selected);
                self.select(index)
            }
            Action::SetVolume(level) => {
                self.coordinator.set_volume(level);
                Ok(())
            }
            Action::SetDemo(enabled) => {
                self.demo_mode = enabled;
                if enabled && !self.playing {
                    self.start_playback()
                } else {
                    Ok(())
                }
            }
        }
    }

    /// One pass of the host loop. Returns `true` when the title or progress
    /// changed and the UI should refresh.
    pub fn tick(&mut self) -> bool {
        let before = (self.progress, self.title.clone());

        for event in self.events.drain_pending() {
            match event {
                PlaybackEvent::Finished(tag) if self.coordinator.is_current(tag) => {
                    tracing::debug!(track_index = tag.track_index, "track finished");
                    self.stop_playback();
                }
                PlaybackEvent::Finished(tag) => {
                    tracing::trace!(?tag, "stale completion discarded");
                }
            }
        }

        if self.playing {
            match self.coordinator.tick() {
                TickOutcome::Playing { progress } => self.progress = progress,
                // the end notice is already queued for the next drain
                TickOutcome::Ended(_) => {}
                TickOutcome::Idle => self.stop_playback(),
            }
        } else if self.demo_mode {
            let next = self.coordinator.catalog().next_index(self.selected);
            if let Err(err) = self.select(next) {
                tracing::warn!(%err, "demo mode could not start the next track");
            }
        }

        before != (self.progress, self.title.clone())
    }

    /// Stops everything; used when the host shuts down.
    pub fn shutdown(&mut self) {
        self.stop_playback();
        self.demo_mode = false;
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn demo_mode(&self) -> bool {
        self.demo_mode
    }

    pub fn coordinator(&self) -> &PlaybackCoordinator {
        &self.coordinator
    }

    fn select(&mut self, index: usize) -> Result<()> {
        self.coordinator.stop();
        self.selected = index;
        self.start_playback()
    }

    fn start_playback(&mut self) -> Result<()> {
        self.progress = 0;
        match self.coordinator.play(self.selected) {
            Ok(PlayOutcome::Playing { .. }) => {
                self.playing = true;
                self.title = self.coordinator.headline();
                Ok(())
            }
            Ok(PlayOutcome::Idle) => {
                self.playing = false;
                self.title = IDLE_TITLE.to_string();
                Ok(())
            }
            Err(err) => {
                self.playing = false;
                self.title = IDLE_TITLE.to_string();
                tracing::warn!(%err, "playback failed");
                Err(err)
            }
        }
    }

    fn stop_playback(&mut self) {
        self.coordinator.stop();
        self.playing = false;
        self.progress = 0;
        self.title = IDLE_TITLE.to_string();
    }
}

use crossbeam_channel::{Receiver, Sender, TrySendError};

/// Identifies one play of one track. `play_id` changes on every play, so a
/// notice from an earlier play of the same track is still recognised as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackTag {
    pub track_index: usize,
    pub play_id: u64,
}

/// Messages handed from backend threads to the host loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The tagged play reached its natural end.
    Finished(TrackTag),
}

/// Creates the bounded hand-off channel between the audio backend and the
/// host loop.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    (EventSender { tx }, EventReceiver { rx })
}

/// Producer side. Cheap to clone into backend callbacks; never blocks and
/// never touches coordinator state.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<PlaybackEvent>,
}

impl EventSender {
    /// Enqueues `event`. Returns `false` if it was dropped because the
    /// channel is full or the host has gone away.
    pub fn notify(&self, event: PlaybackEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::warn!(?event, "event channel full, dropping");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Consumer side, drained by the host loop only.
#[derive(Debug)]
pub struct EventReceiver {
    rx: Receiver<PlaybackEvent>,
}

impl EventReceiver {
    /// Takes the messages pending right now; anything arriving while the
    /// caller handles them waits for the next drain.
    pub fn drain_pending(&self) -> Vec<PlaybackEvent> {
        let pending = self.rx.len();
        let mut events = Vec::with_capacity(pending);
        for _ in 0..pending {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(_) => break,
            }
        }
        events
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

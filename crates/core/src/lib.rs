//! Core library for the TARDIS player.
//!
//! Two time-based media run side by side: frame animations on the scene's
//! beacon and box images, and an audio track played by an external backend.
//! Everything is driven by a single cooperative host loop that calls `tick`
//! every few milliseconds; no module here owns a timer thread. The only data
//! crossing threads is the backend's end-of-track notice, delivered through a
//! bounded channel and acted on by the host loop alone.

pub mod animation;
pub mod assets;
pub mod audio;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod finale;
pub mod mapping;
pub mod playback;
pub mod render;
pub mod scene;
pub mod session;
pub mod timeline;

#[cfg(test)]
mod testing;

pub use animation::engine::{AnimationEngine, AnimationStats, LoadOutcome};
pub use animation::{labelled_sequence, AnimationSequence, Frame, ImageDecoder, ImageHandle, MemoryDecoder};
pub use assets::AssetStore;
pub use audio::{AudioBackend, AudioPlayer, AudioTrack, BackendState, EndHook, SimulatedAudio};
pub use catalog::{Track, TrackCatalog};
pub use config::{AppConfig, AudioConfig, HostConfig, ImageConfig};
pub use error::{AssetKind, Result, TardisError};
pub use events::{event_channel, EventReceiver, EventSender, PlaybackEvent, TrackTag};
pub use finale::Finale;
pub use mapping::{BeaconSpeed, EffectDescriptor, EffectRegistry, ResolvedEffect};
pub use playback::{PlayOutcome, PlaybackCoordinator, TickOutcome, IDLE_TITLE};
pub use render::{DisplaySurface, SurfaceSlot};
pub use scene::VisualCoordinator;
pub use session::{Action, Session};
pub use timeline::{Clock, ManualClock, SystemClock, TickScheduler};

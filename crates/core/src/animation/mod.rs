//! Decoded frame animations and the engine that plays them.

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use crate::{AssetKind, Result, TardisError};

pub mod engine;

/// Opaque, cheaply clonable handle to one decoded still image.
#[derive(Clone)]
pub struct ImageHandle(Arc<ImageData>);

#[derive(Debug, PartialEq, Eq)]
struct ImageData {
    label: String,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl ImageHandle {
    /// Handle carrying only a label, for placeholder and static images.
    pub fn labelled(label: impl Into<String>) -> Self {
        Self::with_pixels(label, 0, 0, Vec::new())
    }

    pub fn with_pixels(label: impl Into<String>, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self(Arc::new(ImageData {
            label: label.into(),
            width,
            height,
            pixels,
        }))
    }

    pub fn label(&self) -> &str {
        &self.0.label
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.0.width, self.0.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.0.pixels
    }
}

impl PartialEq for ImageHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for ImageHandle {}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("label", &self.0.label)
            .field("width", &self.0.width)
            .field("height", &self.0.height)
            .finish()
    }
}

/// One still image plus how long it stays on screen. A duration of zero marks
/// a default (poster) frame that is not part of the timed loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub image: ImageHandle,
    pub duration_ms: u32,
}

impl Frame {
    pub fn new(image: ImageHandle, duration_ms: u32) -> Self {
        Self { image, duration_ms }
    }
}

/// Ordered, immutable list of frames with a loop count (0 loops forever).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationSequence {
    frames: Vec<Frame>,
    loop_count: u32,
    has_default_frame: bool,
}

impl AnimationSequence {
    pub fn new(frames: Vec<Frame>, loop_count: u32) -> Result<Self> {
        if frames.is_empty() {
            return Err(TardisError::msg("an animation needs at least one frame"));
        }
        let has_default_frame = frames.len() > 1 && frames[0].duration_ms == 0;
        Ok(Self {
            frames,
            loop_count,
            has_default_frame,
        })
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    pub fn has_default_frame(&self) -> bool {
        self.has_default_frame
    }

    /// Index playback starts from (and wraps back to).
    pub fn first_index(&self) -> usize {
        usize::from(self.has_default_frame)
    }

    /// A single frame never animates.
    pub fn is_degenerate(&self) -> bool {
        self.frames.len() == 1
    }

    /// Length of one pass through the timed frames.
    pub fn cycle_ms(&self) -> u64 {
        self.frames[self.first_index()..]
            .iter()
            .map(|frame| u64::from(frame.duration_ms))
            .sum()
    }
}

/// Turns an animation asset into frames. Fails with `NotFound` when the
/// path does not resolve.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<AnimationSequence>;
}

/// Decoder over sequences registered in memory.
#[derive(Debug, Default)]
pub struct MemoryDecoder {
    sequences: HashMap<PathBuf, AnimationSequence>,
    decodes: AtomicUsize,
}

impl MemoryDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, sequence: AnimationSequence) {
        self.sequences.insert(path.into(), sequence);
    }

    pub fn with(mut self, path: impl Into<PathBuf>, sequence: AnimationSequence) -> Self {
        self.insert(path, sequence);
        self
    }

    /// Number of successful decodes served so far.
    pub fn decodes(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }
}

impl ImageDecoder for MemoryDecoder {
    fn decode(&self, path: &Path) -> Result<AnimationSequence> {
        let sequence = self
            .sequences
            .get(path)
            .cloned()
            .ok_or_else(|| TardisError::not_found(AssetKind::Animation, path))?;
        self.decodes.fetch_add(1, Ordering::SeqCst);
        Ok(sequence)
    }
}

/// Builds a sequence of labelled placeholder frames, `label#index`.
pub fn labelled_sequence(label: &str, durations: &[u32], loop_count: u32) -> Result<AnimationSequence> {
    let frames = durations
        .iter()
        .enumerate()
        .map(|(index, duration)| Frame::new(ImageHandle::labelled(format!("{label}#{index}")), *duration))
        .collect();
    AnimationSequence::new(frames, loop_count)
}

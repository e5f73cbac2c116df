use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::ImageHandle;

/// Display surface abstraction: the single image slot of a widget. Updates are
/// synchronous and never fail from the core's point of view.
pub trait DisplaySurface: Send {
    /// Image currently shown, if any.
    fn current_image(&self) -> Option<ImageHandle>;

    fn set_image(&self, image: &ImageHandle);

    fn clear(&self);
}

/// In-memory image slot. Clones share the slot, so the host (or a test) can
/// keep a handle while an engine owns another.
#[derive(Debug, Clone, Default)]
pub struct SurfaceSlot {
    inner: Arc<Mutex<SlotState>>,
}

#[derive(Debug, Default)]
struct SlotState {
    image: Option<ImageHandle>,
    updates: u64,
}

impl SurfaceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot that starts out showing `image` (the static widget picture).
    pub fn showing(image: ImageHandle) -> Self {
        let slot = Self::new();
        slot.lock().image = Some(image);
        slot
    }

    /// Label of the image currently shown.
    pub fn current_label(&self) -> Option<String> {
        self.lock().image.as_ref().map(|image| image.label().to_string())
    }

    /// Number of `set_image`/`clear` calls received so far.
    pub fn updates(&self) -> u64 {
        self.lock().updates
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DisplaySurface for SurfaceSlot {
    fn current_image(&self) -> Option<ImageHandle> {
        self.lock().image.clone()
    }

    fn set_image(&self, image: &ImageHandle) {
        let mut state = self.lock();
        state.image = Some(image.clone());
        state.updates += 1;
    }

    fn clear(&self) {
        let mut state = self.lock();
        state.image = None;
        state.updates += 1;
    }
}

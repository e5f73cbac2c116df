use tardis_core::{DisplaySurface, ImageHandle, SurfaceSlot};

/// Headless stand-in for an image widget: keeps the shown image in a slot
/// and traces every change.
#[derive(Debug, Clone)]
pub struct ConsoleSurface {
    widget: &'static str,
    slot: SurfaceSlot,
}

impl ConsoleSurface {
    pub fn new(widget: &'static str, initial: Option<ImageHandle>) -> Self {
        let slot = match initial {
            Some(image) => SurfaceSlot::showing(image),
            None => SurfaceSlot::new(),
        };
        Self { widget, slot }
    }

    /// Number of image updates the widget received.
    pub fn updates(&self) -> u64 {
        self.slot.updates()
    }
}

impl DisplaySurface for ConsoleSurface {
    fn current_image(&self) -> Option<ImageHandle> {
        self.slot.current_image()
    }

    fn set_image(&self, image: &ImageHandle) {
        tracing::trace!(widget = self.widget, image = image.label(), "show");
        self.slot.set_image(image);
    }

    fn clear(&self) {
        tracing::trace!(widget = self.widget, "clear");
        self.slot.clear();
    }
}

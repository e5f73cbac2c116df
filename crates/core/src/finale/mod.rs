use std::sync::Arc;

use crate::{AnimationEngine, Clock};

/// Exit-time flourish: a group of finite animations started together and
/// ticked until every one has run out.
///
/// The run is capped at `limit_ms` so an asset that loops forever cannot keep
/// the process alive.
pub struct Finale {
    engines: Vec<AnimationEngine>,
    clock: Arc<dyn Clock>,
    limit_ms: u64,
    started_at: Option<u64>,
}

impl std::fmt::Debug for Finale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Finale")
            .field("engines", &self.engines)
            .field("limit_ms", &self.limit_ms)
            .field("started_at", &self.started_at)
            .finish()
    }
}

impl Finale {
    pub fn new(engines: Vec<AnimationEngine>, clock: Arc<dyn Clock>, limit_ms: u64) -> Self {
        Self {
            engines,
            clock,
            limit_ms,
            started_at: None,
        }
    }

    pub fn start(&mut self) {
        for engine in &mut self.engines {
            engine.start();
        }
        self.started_at = Some(self.clock.now_ms());
    }

    /// Ticks every engine once. Returns `true` once the finale is over.
    pub fn tick(&mut self) -> bool {
        let Some(started_at) = self.started_at else {
            return true;
        };

        for engine in &mut self.engines {
            engine.tick();
        }

        if self.clock.now_ms().saturating_sub(started_at) >= self.limit_ms {
            tracing::debug!(limit_ms = self.limit_ms, "finale cut short");
            for engine in &mut self.engines {
                engine.stop();
            }
        }

        !self.is_running()
    }

    pub fn is_running(&self) -> bool {
        self.engines.iter().any(AnimationEngine::is_running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{labelled_sequence, ImageHandle, ManualClock, MemoryDecoder, SurfaceSlot};

    fn engine(
        decoder: &Arc<MemoryDecoder>,
        clock: &ManualClock,
        slot: &SurfaceSlot,
        path: &str,
    ) -> AnimationEngine {
        let mut engine = AnimationEngine::new(
            path,
            Box::new(slot.clone()),
            decoder.clone(),
            Arc::new(clock.clone()),
        );
        engine.load(path).unwrap();
        engine
    }

    #[test]
    fn runs_until_every_button_is_done() {
        let decoder = Arc::new(
            MemoryDecoder::new()
                .with("next.png", labelled_sequence("next", &[0, 50, 50], 1).unwrap())
                .with("exit.png", labelled_sequence("exit", &[0, 100, 100], 1).unwrap()),
        );
        let clock = ManualClock::new();
        let next = SurfaceSlot::showing(ImageHandle::labelled("next_static"));
        let exit = SurfaceSlot::showing(ImageHandle::labelled("exit_static"));
        let mut finale = Finale::new(
            vec![
                engine(&decoder, &clock, &next, "next.png"),
                engine(&decoder, &clock, &exit, "exit.png"),
            ],
            Arc::new(clock.clone()),
            5_000,
        );

        finale.start();
        let mut ticks = 0;
        while !finale.tick() {
            clock.advance(10);
            ticks += 1;
            assert!(ticks < 100, "finale did not finish");
        }

        assert_eq!(clock.now_ms(), 200);
        assert_eq!(next.current_label().as_deref(), Some("next_static"));
        assert_eq!(exit.current_label().as_deref(), Some("exit_static"));
    }

    #[test]
    fn endless_animation_is_cut_at_the_limit() {
        let decoder = Arc::new(
            MemoryDecoder::new().with("spin.png", labelled_sequence("spin", &[20, 20], 0).unwrap()),
        );
        let clock = ManualClock::new();
        let slot = SurfaceSlot::new();
        let mut finale = Finale::new(
            vec![engine(&decoder, &clock, &slot, "spin.png")],
            Arc::new(clock.clone()),
            300,
        );

        finale.start();
        clock.advance(299);
        assert!(!finale.tick());
        clock.advance(1);
        assert!(finale.tick());
        assert!(!finale.is_running());
    }

    #[test]
    fn unstarted_finale_is_already_over() {
        let clock = ManualClock::new();
        let mut finale = Finale::new(Vec::new(), Arc::new(clock), 100);
        assert!(finale.tick());
    }
}

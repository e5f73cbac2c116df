use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

/// Monotonic millisecond time source used for every timing decision.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall clock backed by [`Instant`], counting from its own creation.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock. Clones share the same time, so a test can keep one copy
/// and advance it while the engines under test read another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Fixed-cadence host scheduler. The host loop asks it whether a tick is due
/// and how long it may sleep before the next one; nothing suspends inside a
/// tick itself.
#[derive(Debug, Clone)]
pub struct TickScheduler {
    interval_ms: u64,
    next_due: Option<u64>,
    ticks: u64,
}

impl TickScheduler {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            next_due: None,
            ticks: 0,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Returns `true` (and books the following deadline) when a tick is due.
    /// A late host does not get a burst of make-up ticks.
    pub fn poll(&mut self, now: u64) -> bool {
        match self.next_due {
            Some(due) if now < due => false,
            _ => {
                self.next_due = Some(now + self.interval_ms);
                self.ticks += 1;
                true
            }
        }
    }

    /// Time left until the next tick is due.
    pub fn until_next(&self, now: u64) -> Duration {
        let due = self.next_due.unwrap_or(now);
        Duration::from_millis(due.saturating_sub(now))
    }
}

use std::time::{Duration, Instant};

/// Delay standing in for "next display refresh".
pub const NEXT_PAINT: Duration = Duration::from_millis(16);
/// Fixed sampling cadence (0.5 fps).
pub const CADENCE: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickTrigger {
    /// First tick after a source became wanted.
    NextPaint,
    /// Every later tick.
    Cadence,
}

impl TickTrigger {
    pub fn delay(self) -> Duration {
        match self {
            TickTrigger::NextPaint => NEXT_PAINT,
            TickTrigger::Cadence => CADENCE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingTick {
    due: Instant,
    trigger: TickTrigger,
}

/// Holds at most one pending sampler tick. Arming replaces whatever was
/// pending; revoking guarantees the old deadline is never reported as due.
#[derive(Debug, Default)]
pub struct TickSchedule {
    pending: Option<PendingTick>,
}

impl TickSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, trigger: TickTrigger, now: Instant) {
        self.pending = Some(PendingTick {
            due: now + trigger.delay(),
            trigger,
        });
    }

    /// Drop the pending tick. Returns whether one was pending.
    pub fn revoke(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|tick| tick.due)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Consume the pending tick if its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<TickTrigger> {
        match self.pending {
            Some(tick) if tick.due <= now => {
                self.pending = None;
                Some(tick.trigger)
            }
            _ => None,
        }
    }
}

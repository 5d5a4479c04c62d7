use std::{cell::Cell, rc::Rc, time::Instant};

/// Monotonic time source measured in seconds.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Wall clock backed by [`Instant`], counting from construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::start()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Manually driven clock. Clones share the same reading, so a test or a
/// scripted rehearsal can hold one copy and hand another to the metronome.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    seconds: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(seconds: f64) -> Self {
        Self {
            seconds: Rc::new(Cell::new(seconds)),
        }
    }

    pub fn set(&self, seconds: f64) {
        self.seconds.set(seconds);
    }

    pub fn advance(&self, delta: f64) {
        self.seconds.set(self.seconds.get() + delta.max(0.0));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.seconds.get()
    }
}

/// Identifier of one arming of a [`TimerSlot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// A single cancellable one-shot timer.
///
/// Every `arm` hands out a fresh [`TimerId`]; cancelling or re-arming
/// invalidates the previous id, so a host callback that fires late for an
/// old id is ignored instead of running stale work.
#[derive(Debug, Default)]
pub struct TimerSlot {
    generation: u64,
    armed: Option<(TimerId, f64)>,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the timer for `deadline`, replacing any pending arming.
    pub fn arm(&mut self, deadline: f64) -> TimerId {
        self.generation += 1;
        let id = TimerId(self.generation);
        self.armed = Some((id, deadline));
        id
    }

    pub fn cancel(&mut self) {
        self.armed = None;
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn deadline(&self) -> Option<f64> {
        self.armed.map(|(_, deadline)| deadline)
    }

    pub fn is_current(&self, id: TimerId) -> bool {
        self.armed.map(|(armed, _)| armed == id).unwrap_or(false)
    }

    /// Disarms and returns the pending id if its deadline has been reached.
    pub fn take_due(&mut self, now: f64) -> Option<TimerId> {
        match self.armed {
            Some((id, deadline)) if now >= deadline => {
                self.armed = None;
                Some(id)
            }
            _ => None,
        }
    }
}

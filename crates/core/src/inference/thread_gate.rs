use std::sync::{Condvar, Mutex, PoisonError};

/// Counting semaphore bounding simultaneous native inference calls.
///
/// A gate without a limit never blocks but still tracks how many calls are
/// in flight.
pub struct ThreadGate {
    limit: Option<usize>,
    active: Mutex<usize>,
    released: Condvar,
}

/// Slot held for the duration of one inference call. Dropping it frees the
/// slot, including during unwinding.
pub struct GatePermit<'a> {
    gate: &'a ThreadGate,
}

impl ThreadGate {
    /// `limit` of `None` leaves the gate unbounded. A limit of zero is
    /// treated as one so callers cannot deadlock themselves.
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            limit: limit.map(|n| n.max(1)),
            active: Mutex::new(0),
            released: Condvar::new(),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Block until a slot is free, then take it.
    pub fn acquire(&self) -> GatePermit<'_> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(limit) = self.limit {
            while *active >= limit {
                active = self
                    .released
                    .wait(active)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
        *active += 1;
        GatePermit { gate: self }
    }

    /// Number of permits currently held.
    pub fn in_flight(&self) -> usize {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        let mut active = self
            .gate
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *active -= 1;
        self.gate.released.notify_one();
    }
}

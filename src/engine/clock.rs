//! Logical simulation clock.
//!
//! The clock never ticks on its own. It jumps to the timestamp of each
//! processed event, or is forced to a ceiling at the end of a
//! time-bounded run.

use serde::{Deserialize, Serialize};

use crate::engine::time::Timestamp;

/// Simulation clock.
///
/// Tracks the current logical time plus counters over the scheduler's
/// lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimClock<T = f64> {
    /// Current simulation time.
    current: T,
    /// Number of events processed.
    step_count: u64,
    /// Number of processed events that were inactive.
    fizzle_count: u64,
}

impl<T: Timestamp> SimClock<T> {
    /// Create a clock at time zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: T::ZERO,
            step_count: 0,
            fizzle_count: 0,
        }
    }

    /// Get current simulation time.
    #[must_use]
    pub fn current_time(&self) -> T {
        self.current
    }

    /// Get number of events processed.
    #[must_use]
    pub const fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Get number of processed events that fizzled.
    #[must_use]
    pub const fn fizzle_count(&self) -> u64 {
        self.fizzle_count
    }

    /// Jump to the time of the event being processed.
    ///
    /// No monotonicity check: a caller may have scheduled into the past
    /// relative to the cursor, and the clock follows the queue.
    pub fn advance_to(&mut self, time: T, fizzled: bool) {
        self.current = time;
        self.step_count += 1;
        if fizzled {
            self.fizzle_count += 1;
        }
    }

    /// Set the time without counting a step (end of a bounded run).
    pub fn force(&mut self, time: T) {
        self.current = time;
    }

    /// Reset clock to initial state.
    pub fn reset(&mut self) {
        self.current = T::ZERO;
        self.step_count = 0;
        self.fizzle_count = 0;
    }
}

impl<T: Timestamp> Default for SimClock<T> {
    fn default() -> Self {
        Self::new()
    }
}

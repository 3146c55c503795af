//! Logging policy for processed events.
//!
//! Decides which processed events are retained in the scheduler's event
//! log. The run loop dispatches on the policy once and then runs a loop
//! specialised for it, so `Never` and `Always` pay no per-event predicate
//! call.

use std::fmt;

use crate::engine::event::ScheduledEvent;

/// Filter deciding whether a processed event is retained.
pub type LogFilter<'a, T, R> = Box<dyn FnMut(&ScheduledEvent<T, R>) -> bool + 'a>;

/// Which processed events are appended to the event log.
pub enum Logging<'a, T = f64, R = ()> {
    /// Discard every processed event.
    Never,
    /// Retain events for which the filter returns `true`.
    Filter(LogFilter<'a, T, R>),
    /// Retain every processed event.
    Always,
}

impl<'a, T, R> Logging<'a, T, R> {
    /// Build a filtered policy from a closure.
    #[must_use]
    pub fn filter<F>(f: F) -> Self
    where
        F: FnMut(&ScheduledEvent<T, R>) -> bool + 'a,
    {
        Self::Filter(Box::new(f))
    }

    /// Whether the policy may retain anything.
    #[must_use]
    pub const fn may_log(&self) -> bool {
        !matches!(self, Self::Never)
    }
}

impl<T, R> Default for Logging<'_, T, R> {
    fn default() -> Self {
        Self::Always
    }
}

impl<T, R> From<bool> for Logging<'_, T, R> {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::Always
        } else {
            Self::Never
        }
    }
}

impl<T, R> fmt::Debug for Logging<'_, T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => f.write_str("Never"),
            Self::Filter(_) => f.write_str("Filter(..)"),
            Self::Always => f.write_str("Always"),
        }
    }
}

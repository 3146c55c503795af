//! Core discrete-event engine.
//!
//! Implements the central scheduling loop with:
//! - Events carrying a time, an optional action, a context and a status
//! - A scheduler ordering pending events by time, ties by insertion order
//! - Run loops with never/filtered/always logging of processed events
//! - Handles for scheduling follow-up events from inside actions

pub mod clock;
pub mod event;
pub mod handle;
pub mod logging;
pub mod scheduler;
pub mod time;

pub use clock::SimClock;
pub use event::{Action, Context, Event, EventId, EventStatus, ScheduledEvent};
pub use handle::SchedulerHandle;
pub use logging::{LogFilter, Logging};
pub use scheduler::{EventScheduler, SchedulerStatus};
pub use time::Timestamp;

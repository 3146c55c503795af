//! # eventide
//!
//! Single-threaded discrete-event simulation kernel.
//!
//! Pending events are kept in time order with insertion order breaking
//! ties. Running the scheduler pops events one by one, moves the logical
//! clock to each event's time and executes its action unless the event
//! was deactivated, in which case it fizzles.
//!
//! ## Example
//!
//! ```rust
//! use eventide::prelude::*;
//!
//! let mut scheduler = EventScheduler::<f64, &'static str>::new();
//! scheduler.timeout(2.0, || "second").unwrap();
//! scheduler.timeout(1.0, || "first").unwrap();
//!
//! let log = scheduler.run_until_max_time(10.0, true);
//! let results: Vec<_> = log.iter().filter_map(|e| e.result().copied()).collect();
//! assert_eq!(results, vec!["first", "second"]);
//! assert!((scheduler.current_time() - 10.0).abs() < f64::EPSILON);
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_const_for_fn,  // Many functions can't be const in stable Rust
    clippy::must_use_candidate,
    clippy::float_cmp,             // Exact comparisons against stored times
)]

pub mod config;
pub mod engine;
pub mod error;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{SchedulerConfig, SchedulerConfigBuilder};
    pub use crate::engine::{
        Action, Context, Event, EventId, EventScheduler, EventStatus, LogFilter, Logging,
        ScheduledEvent, SchedulerHandle, SchedulerStatus, SimClock, Timestamp,
    };
    pub use crate::error::{SimError, SimResult};
}

/// Re-export for public API
pub use error::{SimError, SimResult};

//! Event scheduler with deterministic ordering.
//!
//! Implements a priority queue plus run loop that ensures:
//! - Events are processed in time order
//! - Ties are broken by insertion order (event id)
//! - The clock only moves to the time of the event being processed, or to
//!   the ceiling of a time-bounded run
//!
//! The condition-based selectors (`next_event_by_condition`,
//! `cancel_next_event_by_condition`, ...) scan the queue in its internal
//! heap order, **not** in time order. When several pending events match,
//! which one is "first" is unspecified; make the predicate select a unique
//! event if that matters.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::config::SchedulerConfig;
use crate::engine::clock::SimClock;
use crate::engine::event::{Action, Context, Event, EventId, ScheduledEvent};
use crate::engine::handle::{SchedulerHandle, SharedState};
use crate::engine::logging::Logging;
use crate::engine::time::Timestamp;
use crate::error::{SimError, SimResult};

/// Whether a `run*` call is currently executing its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulerStatus {
    /// A run loop is executing.
    Active,
    /// Idle.
    #[default]
    Inactive,
}

/// Discrete-event scheduler.
///
/// Owns the pending events, the clock and the cumulative log of processed
/// events. Single-threaded: actions run to completion on the caller's
/// thread. Re-entrant runs are impossible by construction, since `run*`
/// takes `&mut self` and actions can only reach back in through a
/// [`SchedulerHandle`], which cannot run anything.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use eventide::prelude::*;
///
/// let output = Rc::new(RefCell::new(Vec::new()));
/// let mut scheduler = EventScheduler::<f64, ()>::new();
///
/// for t in [3.0, 1.0, 2.0] {
///     let out = Rc::clone(&output);
///     let event = Event::new(t).unwrap().with_action(move || out.borrow_mut().push(t));
///     scheduler.schedule(event).unwrap();
/// }
///
/// let log = scheduler.run(|s| s.is_empty(), true);
/// assert_eq!(log.len(), 3);
/// assert_eq!(*output.borrow(), vec![1.0, 2.0, 3.0]);
/// ```
pub struct EventScheduler<T = f64, R = ()> {
    /// Min-heap ordered by (time, id).
    queue: BinaryHeap<Reverse<ScheduledEvent<T, R>>>,
    /// Logical clock and step counters.
    clock: SimClock<T>,
    /// Processed events retained by the logging policy, across all runs.
    event_log: Vec<ScheduledEvent<T, R>>,
    status: SchedulerStatus,
    /// Id counter, activation flag and handle inbox.
    shared: Rc<SharedState<T, R>>,
    name: String,
}

impl<T: Timestamp, R: 'static> EventScheduler<T, R> {
    /// Create an empty scheduler at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&SchedulerConfig::default())
    }

    /// Create a scheduler with preallocated storage.
    #[must_use]
    pub fn with_config(config: &SchedulerConfig) -> Self {
        Self {
            queue: BinaryHeap::with_capacity(config.queue_capacity),
            clock: SimClock::new(),
            event_log: Vec::with_capacity(config.log_capacity),
            status: SchedulerStatus::Inactive,
            shared: Rc::new(SharedState::new()),
            name: config.name.clone(),
        }
    }

    /// Handle for scheduling from inside actions.
    #[must_use]
    pub fn handle(&self) -> SchedulerHandle<T, R> {
        SchedulerHandle::new(&self.shared)
    }

    // ===== Scheduling =====

    /// Insert an event into the pending collection.
    ///
    /// Only the sign of the time is checked: scheduling before
    /// `current_time()` is allowed, scheduling below zero is not once any
    /// `run*` call has started.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NegativeTime`] if `event.time() < 0` and the
    /// scheduler has been active. The queue is left untouched.
    pub fn schedule(&mut self, event: Event<T, R>) -> SimResult<EventId> {
        let scheduled = self.shared.admit(event)?;
        self.absorb_handle_events();
        let id = scheduled.id;
        self.queue.push(Reverse(scheduled));
        Ok(id)
    }

    /// Schedule `action` at `current_time() + delay` with an empty context.
    ///
    /// `delay` may be negative; the result then goes through the same
    /// sign check as [`EventScheduler::schedule`].
    ///
    /// # Errors
    ///
    /// See [`EventScheduler::schedule`] and [`Event::new`].
    pub fn timeout<F>(&mut self, delay: T, action: F) -> SimResult<EventId>
    where
        F: FnMut() -> R + 'static,
    {
        let action: Action<R> = Box::new(action);
        self.timeout_with(delay, Some(action), None)
    }

    /// Schedule an event at `current_time() + delay` from optional parts.
    ///
    /// # Errors
    ///
    /// See [`EventScheduler::timeout`]. Returns [`SimError::InvalidTime`]
    /// if `current_time() + delay` overflows `T`.
    pub fn timeout_with(
        &mut self,
        delay: T,
        action: Option<Action<R>>,
        context: Option<Context>,
    ) -> SimResult<EventId> {
        let now = self.clock.current_time();
        let time = now
            .checked_add(delay)
            .ok_or_else(|| SimError::invalid_time(format_args!("{now:?} + {delay:?}")))?;
        let event = Event::from_parts(time, action, context)?;
        self.schedule(event)
    }

    // ===== Queries =====

    /// Earliest pending event, without removing it.
    ///
    /// Active and inactive events are treated alike.
    #[must_use]
    pub fn next_event(&self) -> Option<&ScheduledEvent<T, R>> {
        self.queue.peek().map(|Reverse(e)| e)
    }

    /// First pending event, in internal heap order, that satisfies
    /// `predicate`.
    pub fn next_event_by_condition<P>(&self, mut predicate: P) -> Option<&ScheduledEvent<T, R>>
    where
        P: FnMut(&Self, &ScheduledEvent<T, R>) -> bool,
    {
        self.queue
            .iter()
            .map(|Reverse(e)| e)
            .find(|e| predicate(self, *e))
    }

    /// Time of the earliest pending event, or [`Timestamp::INFINITY`].
    ///
    /// For integer times `INFINITY` is `MAX`, so an event scheduled at
    /// exactly `MAX` is indistinguishable from an empty queue here. Use
    /// [`EventScheduler::next_event`] when times can reach `MAX`.
    #[must_use]
    pub fn peek(&self) -> T {
        self.next_event().map_or(T::INFINITY, |e| e.time())
    }

    /// Pending event with the given id.
    #[must_use]
    pub fn event(&self, id: EventId) -> Option<&ScheduledEvent<T, R>> {
        self.queue.iter().map(|Reverse(e)| e).find(|e| e.id == id)
    }

    /// Pending events in internal heap order.
    pub fn pending(&self) -> impl Iterator<Item = &ScheduledEvent<T, R>> + '_ {
        self.queue.iter().map(|Reverse(e)| e)
    }

    /// Number of pending events.
    ///
    /// Events scheduled through a handle are counted once the scheduler
    /// has merged them (on its next step or mutating call).
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether no events are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Current logical time.
    #[must_use]
    pub fn current_time(&self) -> T {
        self.clock.current_time()
    }

    /// Number of events processed over the scheduler's lifetime.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.clock.step_count()
    }

    /// Number of processed events that were inactive.
    #[must_use]
    pub const fn fizzles(&self) -> u64 {
        self.clock.fizzle_count()
    }

    /// Whether a `run*` loop is executing.
    #[must_use]
    pub const fn status(&self) -> SchedulerStatus {
        self.status
    }

    /// Whether any `run*` call has ever started.
    #[must_use]
    pub fn has_been_active(&self) -> bool {
        self.shared.has_been_active()
    }

    /// Name from the configuration.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    // ===== Event log =====

    /// Processed events retained so far, in processing order.
    #[must_use]
    pub fn event_log(&self) -> &[ScheduledEvent<T, R>] {
        &self.event_log
    }

    /// Move the log out, leaving it empty.
    pub fn take_event_log(&mut self) -> Vec<ScheduledEvent<T, R>> {
        std::mem::take(&mut self.event_log)
    }

    /// Discard the log.
    pub fn clear_event_log(&mut self) {
        self.event_log.clear();
    }

    // ===== Traversal =====

    /// Apply `f` to every pending event.
    pub fn apply_to_all_events<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut Event<T, R>),
    {
        self.absorb_handle_events();
        self.modify_pending(|e| f(&mut e.event));
    }

    /// Apply `f` to every pending event matching `predicate`.
    ///
    /// Matches are collected before `f` runs.
    pub fn apply_to_events_by_condition<F, P>(&mut self, mut f: F, predicate: P)
    where
        F: FnMut(&mut Event<T, R>),
        P: FnMut(&Self, &ScheduledEvent<T, R>) -> bool,
    {
        self.absorb_handle_events();
        let ids = self.matching_ids(predicate);
        if ids.is_empty() {
            return;
        }
        self.modify_pending(|e| {
            if ids.contains(&e.id) {
                f(&mut e.event);
            }
        });
    }

    /// Apply `f` to the pending event with the given id.
    ///
    /// Returns whether a pending event matched.
    pub fn apply_to_event<F>(&mut self, id: EventId, f: F) -> bool
    where
        F: FnOnce(&mut Event<T, R>),
    {
        self.absorb_handle_events();
        if self.event(id).is_none() {
            return false;
        }
        let mut f = Some(f);
        self.modify_pending(|e| {
            if e.id == id {
                if let Some(f) = f.take() {
                    f(&mut e.event);
                }
            }
        });
        true
    }

    // ===== Activation =====

    /// Activate the earliest pending event, if any.
    pub fn activate_next_event(&mut self) {
        self.absorb_handle_events();
        if let Some(mut next) = self.queue.peek_mut() {
            next.0.activate();
        }
    }

    /// Activate the first pending event matching `predicate`.
    pub fn activate_next_event_by_condition<P>(&mut self, predicate: P)
    where
        P: FnMut(&Self, &ScheduledEvent<T, R>) -> bool,
    {
        self.absorb_handle_events();
        if let Some(id) = self.next_event_by_condition(predicate).map(|e| e.id) {
            self.apply_to_event(id, Event::activate);
        }
    }

    /// Activate every pending event.
    pub fn activate_all_events(&mut self) {
        self.apply_to_all_events(Event::activate);
    }

    /// Activate every pending event matching `predicate`.
    pub fn activate_all_events_by_condition<P>(&mut self, predicate: P)
    where
        P: FnMut(&Self, &ScheduledEvent<T, R>) -> bool,
    {
        self.apply_to_events_by_condition(Event::activate, predicate);
    }

    /// Activate the pending event with the given id.
    ///
    /// Returns whether a pending event matched.
    pub fn activate_event(&mut self, id: EventId) -> bool {
        self.apply_to_event(id, Event::activate)
    }

    /// Deactivate the earliest pending event, if any.
    pub fn deactivate_next_event(&mut self) {
        self.absorb_handle_events();
        if let Some(mut next) = self.queue.peek_mut() {
            next.0.deactivate();
        }
    }

    /// Deactivate the first pending event matching `predicate`.
    pub fn deactivate_next_event_by_condition<P>(&mut self, predicate: P)
    where
        P: FnMut(&Self, &ScheduledEvent<T, R>) -> bool,
    {
        self.absorb_handle_events();
        if let Some(id) = self.next_event_by_condition(predicate).map(|e| e.id) {
            self.apply_to_event(id, Event::deactivate);
        }
    }

    /// Deactivate every pending event.
    pub fn deactivate_all_events(&mut self) {
        self.apply_to_all_events(Event::deactivate);
    }

    /// Deactivate every pending event matching `predicate`.
    pub fn deactivate_all_events_by_condition<P>(&mut self, predicate: P)
    where
        P: FnMut(&Self, &ScheduledEvent<T, R>) -> bool,
    {
        self.apply_to_events_by_condition(Event::deactivate, predicate);
    }

    /// Deactivate the pending event with the given id.
    ///
    /// Returns whether a pending event matched.
    pub fn deactivate_event(&mut self, id: EventId) -> bool {
        self.apply_to_event(id, Event::deactivate)
    }

    // ===== Cancellation =====

    /// Remove (without running) the earliest pending event.
    pub fn cancel_next_event(&mut self) -> Option<ScheduledEvent<T, R>> {
        self.absorb_handle_events();
        self.queue.pop().map(|Reverse(e)| e)
    }

    /// Remove the first pending event, in internal heap order, matching
    /// `predicate`.
    pub fn cancel_next_event_by_condition<P>(
        &mut self,
        mut predicate: P,
    ) -> Option<ScheduledEvent<T, R>>
    where
        P: FnMut(&Self, &ScheduledEvent<T, R>) -> bool,
    {
        self.absorb_handle_events();
        let position = self
            .queue
            .iter()
            .position(|Reverse(e)| predicate(self, e))?;

        let mut entries = std::mem::take(&mut self.queue).into_vec();
        let Reverse(removed) = entries.swap_remove(position);
        self.queue = BinaryHeap::from(entries);
        Some(removed)
    }

    /// Remove every pending event. The log is untouched.
    pub fn cancel_all_events(&mut self) -> Vec<ScheduledEvent<T, R>> {
        self.absorb_handle_events();
        self.queue.drain().map(|Reverse(e)| e).collect()
    }

    /// Remove every pending event matching `predicate`.
    ///
    /// The predicate is evaluated against the pending set as it was before
    /// the call; removing one match never hides another.
    pub fn cancel_all_events_by_condition<P>(&mut self, predicate: P) -> Vec<ScheduledEvent<T, R>>
    where
        P: FnMut(&Self, &ScheduledEvent<T, R>) -> bool,
    {
        self.absorb_handle_events();
        let ids = self.matching_ids(predicate);
        if ids.is_empty() {
            return Vec::new();
        }

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.queue)
            .into_vec()
            .into_iter()
            .partition(|Reverse(e)| ids.contains(&e.id));
        self.queue = BinaryHeap::from(kept);
        removed.into_iter().map(|Reverse(e)| e).collect()
    }

    /// Remove the pending event with the given id.
    pub fn cancel_event(&mut self, id: EventId) -> Option<ScheduledEvent<T, R>> {
        self.cancel_next_event_by_condition(|_, e| e.id == id)
    }

    // ===== Execution =====

    /// Pop the earliest pending event, move the clock to its time and run
    /// it. Inactive events fizzle but still advance the clock.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::EmptyQueue`] if nothing is pending.
    pub fn step(&mut self) -> SimResult<ScheduledEvent<T, R>> {
        self.process_next().ok_or(SimError::EmptyQueue)
    }

    /// Run until `stop` holds or the queue empties.
    ///
    /// The stop predicate is checked before every step; an empty queue ends
    /// the run regardless of it. Returns the cumulative event log, which
    /// includes events retained by earlier runs.
    #[instrument(skip_all, fields(scheduler = %self.name))]
    pub fn run<'l, S>(
        &mut self,
        mut stop: S,
        logging: impl Into<Logging<'l, T, R>>,
    ) -> &[ScheduledEvent<T, R>]
    where
        S: FnMut(&Self) -> bool,
    {
        self.begin_run();
        let steps_before = self.clock.step_count();

        // One loop per policy keeps the predicate call out of the
        // never/always paths.
        match logging.into() {
            Logging::Never => {
                while !stop(self) {
                    if self.process_next().is_none() {
                        break;
                    }
                }
            }
            Logging::Filter(mut retain) => {
                while !stop(self) {
                    let Some(event) = self.process_next() else {
                        break;
                    };
                    if retain(&event) {
                        self.event_log.push(event);
                    }
                }
            }
            Logging::Always => {
                while !stop(self) {
                    let Some(event) = self.process_next() else {
                        break;
                    };
                    self.event_log.push(event);
                }
            }
        }

        self.end_run(steps_before);
        &self.event_log
    }

    /// Run every event strictly before `max_time`, then set the clock to
    /// exactly `max_time`.
    ///
    /// Events at `max_time` itself stay pending. Repeated calls with
    /// non-decreasing ceilings advance the clock in fixed increments
    /// whatever the event density.
    pub fn run_until_max_time<'l>(
        &mut self,
        max_time: T,
        logging: impl Into<Logging<'l, T, R>>,
    ) -> &[ScheduledEvent<T, R>] {
        let reached = |t: T| t.total_order(&max_time) != Ordering::Less;
        self.run(
            |s| s.is_empty() || reached(s.current_time()) || reached(s.peek()),
            logging,
        );
        self.force_time(max_time);
        &self.event_log
    }

    /// Run until the event with `id` appears in the event log.
    ///
    /// The stop condition is log membership, so it only fires if the
    /// logging policy retains that event. With a policy that drops it
    /// (e.g. `false`), the run continues until the queue empties.
    pub fn run_until_given_event<'l>(
        &mut self,
        id: EventId,
        logging: impl Into<Logging<'l, T, R>>,
    ) -> &[ScheduledEvent<T, R>] {
        // The log only grows during a run; rescan just the new tail.
        let mut scanned = 0;
        self.run(
            move |s| {
                let found = s.event_log[scanned.min(s.event_log.len())..]
                    .iter()
                    .any(|e| e.id == id);
                scanned = s.event_log.len();
                found
            },
            logging,
        )
    }

    // ===== Internals =====

    fn begin_run(&mut self) {
        self.status = SchedulerStatus::Active;
        self.shared.mark_active();
        self.absorb_handle_events();
        debug!(
            time = ?self.clock.current_time(),
            pending = self.queue.len(),
            "run started"
        );
    }

    fn end_run(&mut self, steps_before: u64) {
        self.status = SchedulerStatus::Inactive;
        debug!(
            time = ?self.clock.current_time(),
            processed = self.clock.step_count() - steps_before,
            pending = self.queue.len(),
            logged = self.event_log.len(),
            "run finished"
        );
    }

    fn process_next(&mut self) -> Option<ScheduledEvent<T, R>> {
        self.absorb_handle_events();
        let Reverse(mut next) = self.queue.pop()?;

        let time = next.time();
        let fizzled = !next.is_active();
        self.clock.advance_to(time, fizzled);
        self.shared.set_now(time);

        next.run();
        trace!(id = %next.id, ?time, fizzled, "processed event");

        self.absorb_handle_events();
        Some(next)
    }

    fn force_time(&mut self, time: T) {
        self.clock.force(time);
        self.shared.set_now(time);
    }

    fn absorb_handle_events(&mut self) {
        let incoming = self.shared.drain_inbox();
        if !incoming.is_empty() {
            self.queue.extend(incoming.into_iter().map(Reverse));
        }
    }

    fn matching_ids<P>(&self, mut predicate: P) -> HashSet<EventId>
    where
        P: FnMut(&Self, &ScheduledEvent<T, R>) -> bool,
    {
        self.queue
            .iter()
            .filter(|Reverse(e)| predicate(self, e))
            .map(|Reverse(e)| e.id)
            .collect()
    }

    /// Mutate pending events in place. `f` must not change ordering keys;
    /// it only ever receives events whose time is read-only.
    fn modify_pending<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut ScheduledEvent<T, R>),
    {
        let mut entries = std::mem::take(&mut self.queue).into_vec();
        for Reverse(entry) in &mut entries {
            f(entry);
        }
        // Keys are unchanged, so rebuilding keeps the array order.
        self.queue = BinaryHeap::from(entries);
    }
}

impl<T: Timestamp, R: 'static> Default for EventScheduler<T, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Timestamp, R> fmt::Debug for EventScheduler<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventScheduler")
            .field("name", &self.name)
            .field("clock", &self.clock)
            .field("pending", &self.queue.len())
            .field("handle_inbox", &self.shared.inbox_len())
            .field("logged", &self.event_log.len())
            .field("status", &self.status)
            .finish()
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Logged events never exceed the ceiling and come out in time order.
        #[test]
        fn prop_bounded_run_is_ordered(
            times in prop::collection::vec(0i64..1000, 0..100),
            ceiling in 0i64..1000,
        ) {
            let mut scheduler = EventScheduler::<i64, ()>::new();
            for &t in &times {
                scheduler.schedule(Event::new(t).unwrap()).unwrap();
            }

            let log = scheduler.run_until_max_time(ceiling, true);
            prop_assert!(log.iter().all(|e| e.time() <= ceiling));
            prop_assert!(log.windows(2).all(|w| w[0].time() <= w[1].time()));

            let expected = times.iter().filter(|&&t| t < ceiling).count();
            prop_assert_eq!(log.len(), expected);
            prop_assert_eq!(scheduler.current_time(), ceiling);
        }

        /// Equal timestamps come out in scheduling order.
        #[test]
        fn prop_ties_are_fifo(times in prop::collection::vec(0i64..5, 1..60)) {
            let mut scheduler = EventScheduler::<i64, ()>::new();
            for &t in &times {
                scheduler.schedule(Event::new(t).unwrap()).unwrap();
            }

            let log = scheduler.run(|s| s.is_empty(), true);
            let in_fifo_order = log
                .windows(2)
                .all(|w| (w[0].time(), w[0].id) < (w[1].time(), w[1].id));
            prop_assert!(in_fifo_order);
        }

        /// Cancel-by-condition removes exactly the matching set.
        #[test]
        fn prop_cancel_by_condition_exact(
            times in prop::collection::vec(0i64..100, 0..80),
            threshold in 0i64..100,
        ) {
            let mut scheduler = EventScheduler::<i64, ()>::new();
            for &t in &times {
                scheduler.schedule(Event::new(t).unwrap()).unwrap();
            }

            let removed = scheduler.cancel_all_events_by_condition(|_, e| e.time() < threshold);
            let expected = times.iter().filter(|&&t| t < threshold).count();

            prop_assert_eq!(removed.len(), expected);
            prop_assert_eq!(scheduler.len(), times.len() - expected);
            prop_assert!(scheduler.pending().all(|e| e.time() >= threshold));
        }

        /// Deactivated events never run; active ones always do.
        #[test]
        fn prop_only_active_events_run(flags in prop::collection::vec(any::<bool>(), 0..50)) {
            let ran = Rc::new(std::cell::RefCell::new(Vec::new()));
            let mut scheduler = EventScheduler::<i64, ()>::new();

            for (i, &active) in flags.iter().enumerate() {
                let r = Rc::clone(&ran);
                let id = scheduler.timeout(i as i64, move || r.borrow_mut().push(i)).unwrap();
                if !active {
                    scheduler.deactivate_event(id);
                }
            }

            scheduler.run(|s| s.is_empty(), false);
            let expected: Vec<usize> = flags
                .iter()
                .enumerate()
                .filter(|(_, active)| **active)
                .map(|(i, _)| i)
                .collect();
            prop_assert_eq!(&*ran.borrow(), &expected);
            prop_assert_eq!(scheduler.steps(), flags.len() as u64);
        }
    }
}

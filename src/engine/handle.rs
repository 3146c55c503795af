//! Scheduling from inside actions.
//!
//! Actions are zero-argument closures and cannot borrow the scheduler
//! that is running them. A [`SchedulerHandle`] gives them a side door:
//! events scheduled through it land in a shared inbox that the scheduler
//! merges into its pending collection right after the action returns.
//!
//! The handle holds a weak reference, so an action capturing a handle
//! does not keep the scheduler's shared state alive through its own
//! queue.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::engine::event::{Action, Context, Event, EventId, ScheduledEvent};
use crate::engine::time::Timestamp;
use crate::error::{SimError, SimResult};

/// State shared between a scheduler and its handles.
pub(crate) struct SharedState<T, R> {
    now: Cell<T>,
    has_been_active: Cell<bool>,
    next_sequence: Cell<u64>,
    inbox: RefCell<Vec<ScheduledEvent<T, R>>>,
}

impl<T: Timestamp, R> SharedState<T, R> {
    pub(crate) fn new() -> Self {
        Self {
            now: Cell::new(T::ZERO),
            has_been_active: Cell::new(false),
            next_sequence: Cell::new(0),
            inbox: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn now(&self) -> T {
        self.now.get()
    }

    pub(crate) fn set_now(&self, time: T) {
        self.now.set(time);
    }

    pub(crate) fn has_been_active(&self) -> bool {
        self.has_been_active.get()
    }

    pub(crate) fn mark_active(&self) {
        self.has_been_active.set(true);
    }

    /// Check the negative-time rule and assign the next id.
    ///
    /// Nothing is allocated or consumed when the event is rejected.
    pub(crate) fn admit(&self, event: Event<T, R>) -> SimResult<ScheduledEvent<T, R>> {
        let time = event.time();
        if self.has_been_active.get() && time.is_negative() {
            tracing::warn!(?time, "rejected negative-time event after activation");
            return Err(SimError::negative_time(time));
        }

        let sequence = self.next_sequence.get();
        self.next_sequence.set(sequence + 1);
        Ok(ScheduledEvent::new(EventId::new(sequence), event))
    }

    /// Take everything scheduled through handles since the last drain.
    pub(crate) fn drain_inbox(&self) -> Vec<ScheduledEvent<T, R>> {
        self.inbox.take()
    }

    pub(crate) fn inbox_len(&self) -> usize {
        self.inbox.borrow().len()
    }

    fn enqueue(&self, scheduled: ScheduledEvent<T, R>) {
        self.inbox.borrow_mut().push(scheduled);
    }
}

/// Cloneable handle for scheduling into an [`EventScheduler`] from
/// inside an action.
///
/// Events scheduled through a handle get their [`EventId`] immediately
/// and become visible to the scheduler's queries once it next steps or
/// performs any mutating call.
///
/// [`EventScheduler`]: crate::engine::scheduler::EventScheduler
///
/// # Example
///
/// ```rust
/// use eventide::prelude::*;
///
/// let mut scheduler = EventScheduler::<f64, ()>::new();
/// let handle = scheduler.handle();
///
/// scheduler
///     .timeout(1.0, move || {
///         // Follow-up one time unit after the current event.
///         let _ = handle.timeout(1.0, || ());
///     })
///     .unwrap();
///
/// scheduler.run(|s| s.is_empty(), true);
/// assert_eq!(scheduler.event_log().len(), 2);
/// assert!((scheduler.current_time() - 2.0).abs() < f64::EPSILON);
/// ```
pub struct SchedulerHandle<T = f64, R = ()> {
    state: Weak<SharedState<T, R>>,
}

impl<T: Timestamp, R: 'static> SchedulerHandle<T, R> {
    pub(crate) fn new(state: &Rc<SharedState<T, R>>) -> Self {
        Self {
            state: Rc::downgrade(state),
        }
    }

    fn upgrade(&self) -> SimResult<Rc<SharedState<T, R>>> {
        self.state.upgrade().ok_or(SimError::SchedulerDropped)
    }

    /// Current time of the scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::SchedulerDropped`] if the scheduler is gone.
    pub fn now(&self) -> SimResult<T> {
        Ok(self.upgrade()?.now())
    }

    /// Schedule an event.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NegativeTime`] if the event time is negative and
    /// the scheduler has been active, or [`SimError::SchedulerDropped`].
    pub fn schedule(&self, event: Event<T, R>) -> SimResult<EventId> {
        let state = self.upgrade()?;
        let scheduled = state.admit(event)?;
        let id = scheduled.id;
        state.enqueue(scheduled);
        Ok(id)
    }

    /// Schedule `action` at `now + delay` with an empty context.
    ///
    /// # Errors
    ///
    /// See [`SchedulerHandle::schedule`]; also fails if the resulting
    /// time is invalid.
    pub fn timeout<F>(&self, delay: T, action: F) -> SimResult<EventId>
    where
        F: FnMut() -> R + 'static,
    {
        let action: Action<R> = Box::new(action);
        self.timeout_with(delay, Some(action), None)
    }

    /// Schedule an event at `now + delay` from optional parts.
    ///
    /// # Errors
    ///
    /// See [`SchedulerHandle::timeout`]. Returns [`SimError::InvalidTime`]
    /// if `now + delay` overflows `T`.
    pub fn timeout_with(
        &self,
        delay: T,
        action: Option<Action<R>>,
        context: Option<Context>,
    ) -> SimResult<EventId> {
        let now = self.now()?;
        let time = now
            .checked_add(delay)
            .ok_or_else(|| SimError::invalid_time(format_args!("{now:?} + {delay:?}")))?;
        self.schedule(Event::from_parts(time, action, context)?)
    }

    /// Whether the scheduler is still alive.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.state.strong_count() > 0
    }
}

impl<T, R> Clone for SchedulerHandle<T, R> {
    fn clone(&self) -> Self {
        Self {
            state: Weak::clone(&self.state),
        }
    }
}

impl<T, R> fmt::Debug for SchedulerHandle<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("attached", &(self.state.strong_count() > 0))
            .finish()
    }
}

//! Events: timestamped units of work with an activation flag.
//!
//! An event is created `Active`. External code may flip it to `Inactive`
//! (and back) any number of times while it is pending. When the scheduler
//! pops an inactive event it "fizzles": the clock still advances and the
//! event may still be logged, but its action is not invoked.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::time::Timestamp;
use crate::error::{SimError, SimResult};

/// Open key-value bag attached to an event. Opaque to the engine.
pub type Context = serde_json::Map<String, Value>;

/// Zero-argument callable run when an active event is processed.
pub type Action<R> = Box<dyn FnMut() -> R>;

/// Activation state of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventStatus {
    /// The action runs when the event is processed.
    #[default]
    Active,
    /// The event fizzles when processed.
    Inactive,
}

/// Identity assigned to an event when it is scheduled.
///
/// Ids are handed out in insertion order and break ties between events
/// with equal timestamps (FIFO).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EventId(u64);

impl EventId {
    pub(crate) const fn new(sequence: u64) -> Self {
        Self(sequence)
    }

    /// Insertion sequence number.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A scheduled unit of work.
///
/// `T` is the timestamp type and `R` the action's return type.
///
/// # Example
///
/// ```rust
/// use eventide::engine::event::{Event, EventStatus};
///
/// let mut event = Event::<f64, u32>::new(2.5)
///     .unwrap()
///     .with_action(|| 7)
///     .with_entry("kind", "arrival");
///
/// assert_eq!(event.status(), EventStatus::Active);
/// assert_eq!(event.run(), Some(&7));
/// ```
pub struct Event<T = f64, R = ()> {
    time: T,
    action: Option<Action<R>>,
    /// Caller metadata, typically set at schedule time and read back from
    /// the event log.
    pub context: Context,
    status: EventStatus,
    result: Option<R>,
}

impl<T: Timestamp, R> Event<T, R> {
    /// Create an active event at `time` with a no-op action and an empty
    /// context.
    ///
    /// # Errors
    ///
    /// With the `validation` feature enabled, returns
    /// [`SimError::InvalidTime`] if `time` is not finite.
    pub fn new(time: T) -> SimResult<Self> {
        if cfg!(feature = "validation") && !time.is_valid() {
            return Err(SimError::invalid_time(time));
        }

        Ok(Self {
            time,
            action: None,
            context: Context::new(),
            status: EventStatus::Active,
            result: None,
        })
    }

    /// Create an event from optional parts.
    ///
    /// # Errors
    ///
    /// See [`Event::new`].
    pub fn from_parts(
        time: T,
        action: Option<Action<R>>,
        context: Option<Context>,
    ) -> SimResult<Self> {
        let mut event = Self::new(time)?;
        event.action = action;
        event.context = context.unwrap_or_default();
        Ok(event)
    }

    /// Set the action.
    #[must_use]
    pub fn with_action<F>(mut self, action: F) -> Self
    where
        F: FnMut() -> R + 'static,
    {
        self.action = Some(Box::new(action));
        self
    }

    /// Replace the context.
    #[must_use]
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Insert one context entry.
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Scheduled time.
    #[must_use]
    pub fn time(&self) -> T {
        self.time
    }

    /// Compare two events by time only. Equal times compare `Equal`.
    #[must_use]
    pub fn cmp_time(&self, other: &Self) -> Ordering {
        self.time.total_order(&other.time)
    }

    /// Whether an action is attached.
    #[must_use]
    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    /// Mutable access to the context.
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Look up a context entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    /// Run the action if the event is active and capture its result.
    ///
    /// An inactive event does nothing and keeps whatever result it had.
    /// Returns the current result.
    pub fn run(&mut self) -> Option<&R> {
        if self.status == EventStatus::Active {
            if let Some(action) = self.action.as_mut() {
                self.result = Some(action());
            }
        }
        self.result.as_ref()
    }
}

impl<T, R> Event<T, R> {
    /// Current activation state.
    #[must_use]
    pub const fn status(&self) -> EventStatus {
        self.status
    }

    /// Shorthand for `status() == EventStatus::Active`.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == EventStatus::Active
    }

    /// Mark the event active. Idempotent.
    pub fn activate(&mut self) {
        self.status = EventStatus::Active;
    }

    /// Mark the event inactive. Idempotent.
    pub fn deactivate(&mut self) {
        self.status = EventStatus::Inactive;
    }

    /// Result of the most recent active run, if any.
    #[must_use]
    pub const fn result(&self) -> Option<&R> {
        self.result.as_ref()
    }

    /// Move the result out, leaving `None`.
    pub fn take_result(&mut self) -> Option<R> {
        self.result.take()
    }
}

impl<T: fmt::Debug, R: fmt::Debug> fmt::Debug for Event<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("time", &self.time)
            .field("status", &self.status)
            .field("context", &self.context)
            .field("result", &self.result)
            .field("has_action", &self.action.is_some())
            .finish()
    }
}

/// An event together with the id it was scheduled under.
///
/// This is what sits in the pending collection, what `step()` returns and
/// what the event log stores. Dereferences to the inner [`Event`].
pub struct ScheduledEvent<T = f64, R = ()> {
    /// Id assigned at schedule time.
    pub id: EventId,
    /// The scheduled event.
    pub event: Event<T, R>,
}

impl<T, R> ScheduledEvent<T, R> {
    /// Pair an event with its id.
    #[must_use]
    pub const fn new(id: EventId, event: Event<T, R>) -> Self {
        Self { id, event }
    }

    /// Drop the id and return the event.
    #[must_use]
    pub fn into_event(self) -> Event<T, R> {
        self.event
    }
}

impl<T, R> Deref for ScheduledEvent<T, R> {
    type Target = Event<T, R>;

    fn deref(&self) -> &Self::Target {
        &self.event
    }
}

impl<T, R> DerefMut for ScheduledEvent<T, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.event
    }
}

impl<T: fmt::Debug, R: fmt::Debug> fmt::Debug for ScheduledEvent<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledEvent")
            .field("id", &self.id)
            .field("event", &self.event)
            .finish()
    }
}

// Queue key is (time, id): a total order with FIFO among equal times.
impl<T: Timestamp, R> PartialEq for ScheduledEvent<T, R> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.event.cmp_time(&other.event) == Ordering::Equal
    }
}

impl<T: Timestamp, R> Eq for ScheduledEvent<T, R> {}

impl<T: Timestamp, R> PartialOrd for ScheduledEvent<T, R> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Timestamp, R> Ord for ScheduledEvent<T, R> {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.event.cmp_time(&other.event) {
            Ordering::Equal => self.id.cmp(&other.id),
            ord => ord,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_new_event_is_active_without_result() {
        let event = Event::<f64>::new(3.0).unwrap();
        assert_eq!(event.status(), EventStatus::Active);
        assert!(event.result().is_none());
        assert!(event.context.is_empty());
        assert!(!event.has_action());
        assert!((event.time() - 3.0).abs() < f64::EPSILON);
    }

    #[cfg(feature = "validation")]
    #[test]
    fn test_new_rejects_non_finite_time() {
        let err = Event::<f64>::new(f64::NAN).unwrap_err();
        assert!(matches!(err, SimError::InvalidTime { .. }));
        assert!(Event::<f64>::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_negative_time_is_constructible() {
        let event = Event::<i64>::new(-5).unwrap();
        assert_eq!(event.time(), -5);
    }

    #[test]
    fn test_activate_deactivate_idempotent() {
        let mut event = Event::<f64>::new(0.0).unwrap();
        event.activate();
        event.activate();
        assert!(event.is_active());

        event.deactivate();
        event.deactivate();
        assert_eq!(event.status(), EventStatus::Inactive);
    }

    #[test]
    fn test_run_active_captures_result() {
        let mut event = Event::<f64, i32>::new(1.0).unwrap().with_action(|| 42);
        assert_eq!(event.run(), Some(&42));
        assert_eq!(event.result(), Some(&42));
    }

    #[test]
    fn test_run_inactive_fizzles() {
        let counter = Rc::new(Cell::new(0));
        let c = Rc::clone(&counter);
        let mut event = Event::<f64, ()>::new(1.0)
            .unwrap()
            .with_action(move || c.set(c.get() + 1));

        event.deactivate();
        assert!(event.run().is_none());
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_fizzle_keeps_previous_result() {
        let mut event = Event::<f64, &str>::new(1.0).unwrap().with_action(|| "done");
        event.run();
        event.deactivate();
        assert_eq!(event.run(), Some(&"done"));
    }

    #[test]
    fn test_noop_action_leaves_result_empty() {
        let mut event = Event::<f64, u8>::new(1.0).unwrap();
        assert!(event.run().is_none());
    }

    #[test]
    fn test_context_entries() {
        let event = Event::<f64>::new(1.0)
            .unwrap()
            .with_entry("kind", "A")
            .with_entry("priority", 3);
        assert_eq!(event.get("kind"), Some(&Value::from("A")));
        assert_eq!(event.context["priority"], 3);
        assert!(event.get("missing").is_none());
    }

    #[test]
    fn test_from_parts() {
        let mut context = Context::new();
        context.insert("kind".to_string(), Value::from("B"));
        let action: Action<u8> = Box::new(|| 1);
        let mut event = Event::from_parts(2.0, Some(action), Some(context)).unwrap();
        assert_eq!(event.context["kind"], "B");
        assert_eq!(event.run(), Some(&1));

        let bare = Event::<f64, u8>::from_parts(2.0, None, None).unwrap();
        assert!(bare.context.is_empty());
        assert!(!bare.has_action());
    }

    #[test]
    fn test_cmp_time_only() {
        let a = Event::<f64>::new(1.0).unwrap().with_entry("n", 1);
        let b = Event::<f64>::new(1.0).unwrap().with_entry("n", 2);
        let c = Event::<f64>::new(2.0).unwrap();
        assert_eq!(a.cmp_time(&b), Ordering::Equal);
        assert_eq!(a.cmp_time(&c), Ordering::Less);
        assert_eq!(c.cmp_time(&a), Ordering::Greater);
    }

    #[test]
    fn test_take_result() {
        let mut event = Event::<f64, String>::new(0.0)
            .unwrap()
            .with_action(|| "out".to_string());
        event.run();
        assert_eq!(event.take_result().as_deref(), Some("out"));
        assert!(event.result().is_none());
    }

    #[test]
    fn test_event_id_display() {
        let id = EventId::new(12);
        assert_eq!(id.to_string(), "#12");
        assert_eq!(id.as_u64(), 12);
        assert!(EventId::new(1) < EventId::new(2));
    }

    #[test]
    fn test_scheduled_event_ord() {
        let event_at = |t: f64, id: u64| {
            ScheduledEvent::new(EventId::new(id), Event::<f64>::new(t).unwrap())
        };

        assert!(event_at(1.0, 5) < event_at(2.0, 1));
        assert!(event_at(1.0, 1) < event_at(1.0, 2));
        assert_eq!(event_at(1.0, 3), event_at(1.0, 3));
        assert_ne!(event_at(1.0, 3), event_at(1.0, 4));
    }

    #[test]
    fn test_scheduled_event_deref() {
        let mut scheduled =
            ScheduledEvent::new(EventId::new(0), Event::<f64>::new(4.0).unwrap());
        scheduled.deactivate();
        assert!(!scheduled.is_active());
        assert!((scheduled.time() - 4.0).abs() < f64::EPSILON);
        assert!((scheduled.into_event().time() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_event_debug() {
        let event = Event::<f64>::new(1.0).unwrap();
        let debug = format!("{:?}", event);
        assert!(debug.contains("Event"));
        assert!(debug.contains("has_action"));
    }
}

//--------------------------------------------------------------------------------------------------
// STRUCTS & CONSTANTS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods       |
// |-------------------------|---------------------------------------------------|-------------------|
// | EventType               | Open-set routing tag for events                   | new, as_str       |
// | Event                   | Immutable (type, payload) value                   | with_data, data   |
// | TIMER_TRIGGERED         | Payload carried by every timer event              |                   |
//--------------------------------------------------------------------------------------------------

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Payload carried by the timer events produced by the engine.
pub const TIMER_TRIGGERED: &str = "TimerTriggered";

/// Payload carried by the [`EventType::ENGINE_STARTED`] event.
pub const ENGINE_START: &str = "Engine start.";

/// Payload carried by the [`EventType::ENGINE_STOPPED`] event.
pub const ENGINE_STOP: &str = "Engine stop.";

/// Tag used to route events to the handlers interested in them.
///
/// The set of tags is open: the embedding application defines its own with
/// [`EventType::new`] or a plain string conversion. Two tags are equal when
/// their names are equal.
///
/// # Examples
///
/// ```
/// use event_engine::EventType;
///
/// const TICK: EventType = EventType::new("Tick");
///
/// assert_eq!(TICK, EventType::from("Tick"));
/// assert_eq!(TICK, EventType::from(String::from("Tick")));
/// assert_ne!(TICK, EventType::TIMER);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(Cow<'static, str>);

impl EventType {
    /// Published once by `EventEngine::start`.
    pub const ENGINE_STARTED: EventType = EventType::new("EngineStarted");
    /// Published once by `EventEngine::stop`.
    pub const ENGINE_STOPPED: EventType = EventType::new("EngineStopped");
    /// Published by the timer thread on every tick.
    pub const TIMER: EventType = EventType::new("Timer");

    /// Creates an event type from a static name.
    pub const fn new(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Returns the name of this event type.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the types the engine publishes itself.
    pub fn is_builtin(&self) -> bool {
        *self == Self::ENGINE_STARTED || *self == Self::ENGINE_STOPPED || *self == Self::TIMER
    }
}

impl From<&'static str> for EventType {
    fn from(name: &'static str) -> Self {
        Self::new(name)
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque payload shared by every clone of an [`Event`].
pub type Payload = Arc<dyn Any + Send + Sync>;

/// An immutable event: a type tag plus an optional, opaque payload.
///
/// Cloning an event is cheap because the payload is reference counted. The
/// engine never inspects the payload; handlers recover it with [`Event::data`].
#[derive(Clone)]
pub struct Event {
    event_type: EventType,
    data: Option<Payload>,
}

impl Event {
    /// Creates an event without a payload.
    pub fn new(event_type: impl Into<EventType>) -> Self {
        Self {
            event_type: event_type.into(),
            data: None,
        }
    }

    /// Creates an event carrying `data`.
    ///
    /// # Arguments
    /// * `event_type` - The tag used to route the event
    /// * `data` - Any thread-safe value; handlers downcast it with [`Event::data`]
    pub fn with_data<T>(event_type: impl Into<EventType>, data: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            event_type: event_type.into(),
            data: Some(Arc::new(data)),
        }
    }

    /// Creates an event from an already shared payload.
    pub fn with_payload(event_type: impl Into<EventType>, data: Payload) -> Self {
        Self {
            event_type: event_type.into(),
            data: Some(data),
        }
    }

    /// Returns the type tag of this event.
    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    /// Returns the payload if present and of type `T`.
    ///
    /// # Examples
    ///
    /// ```
    /// use event_engine::Event;
    ///
    /// let event = Event::with_data("Log", "payload");
    /// assert_eq!(event.data::<&str>(), Some(&"payload"));
    /// assert_eq!(event.data::<String>(), None);
    /// ```
    pub fn data<T: Any>(&self) -> Option<&T> {
        self.data.as_deref()?.downcast_ref::<T>()
    }

    /// Returns the raw shared payload.
    pub fn payload(&self) -> Option<&Payload> {
        self.data.as_ref()
    }

    /// Returns true if the event carries a payload.
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub(crate) fn timer() -> Self {
        Self::with_data(EventType::TIMER, TIMER_TRIGGERED)
    }

    pub(crate) fn engine_started() -> Self {
        Self::with_data(EventType::ENGINE_STARTED, ENGINE_START)
    }

    pub(crate) fn engine_stopped() -> Self {
        Self::with_data(EventType::ENGINE_STOPPED, ENGINE_STOP)
    }
}

// Payloads are opaque, so only their presence is shown
impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("event_type", &self.event_type)
            .field("data", &self.data.as_ref().map(|_| ".."))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Quote {
        symbol: String,
        price: i64,
    }

    #[test]
    fn test_event_type_equality() {
        let owned = EventType::from(String::from("Timer"));
        assert_eq!(owned, EventType::TIMER);
        assert_eq!(EventType::from("Tick").as_str(), "Tick");
        assert!(EventType::ENGINE_STOPPED.is_builtin());
        assert!(!EventType::new("Order").is_builtin());
    }

    #[test]
    fn test_event_payload_downcast() {
        let event = Event::with_data(
            "Quote",
            Quote {
                symbol: "ETH".to_string(),
                price: 3_000,
            },
        );

        let quote = event.data::<Quote>().expect("payload should downcast");
        assert_eq!(quote.symbol, "ETH");
        assert_eq!(quote.price, 3_000);
        assert!(event.data::<String>().is_none());
    }

    #[test]
    fn test_event_without_payload() {
        let event = Event::new("Heartbeat");
        assert!(!event.has_data());
        assert!(event.data::<&str>().is_none());
        assert_eq!(event.event_type().as_str(), "Heartbeat");
    }

    #[test]
    fn test_clones_share_payload() {
        let event = Event::with_data("Log", vec![1u8, 2, 3]);
        let copy = event.clone();

        let (a, b) = (event.payload().unwrap(), copy.payload().unwrap());
        assert!(Arc::ptr_eq(a, b));
    }

    #[test]
    fn test_builtin_events() {
        assert_eq!(Event::timer().data::<&str>(), Some(&TIMER_TRIGGERED));
        assert_eq!(Event::engine_started().event_type(), &EventType::ENGINE_STARTED);
        assert_eq!(Event::engine_stopped().data::<&str>(), Some(&ENGINE_STOP));
    }

    #[test]
    fn test_event_type_serde() {
        let json = serde_json::to_string(&EventType::TIMER).unwrap();
        assert_eq!(json, "\"Timer\"");

        let parsed: EventType = serde_json::from_str("\"Order\"").unwrap();
        assert_eq!(parsed, EventType::new("Order"));
    }
}

//--------------------------------------------------------------------------------------------------
// ENUMS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Variants          |
// |-------------------------|---------------------------------------------------|-------------------|
// | EventError              | Registry and handler failures                     | UnknownEventType  |
// |                         |                                                   | HandlerNotRegist. |
// |                         |                                                   | HandlerFailed     |
// | EngineError             | Lifecycle and configuration failures              | AlreadyRunning    |
// |                         |                                                   | Spawn             |
// |                         |                                                   | WorkerPanicked    |
// |                         |                                                   | Config            |
//--------------------------------------------------------------------------------------------------

use thiserror::Error;

use super::types::EventType;

/// Errors that can occur in the event system
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// `unregister` was called for a type that never had a handler
    #[error("No handler registered for event type: {0}")]
    UnknownEventType(EventType),

    /// The type is known but the handler is not in its sequence
    #[error("Handler not registered for event type: {event_type}")]
    HandlerNotRegistered { event_type: EventType },

    /// A handler failed to process an event
    #[error("Failed to process event: {0}")]
    HandlerFailed(String),
}

/// Type alias for Result with EventError
pub type EventResult<T> = Result<T, EventError>;

/// Errors raised by the engine lifecycle
#[derive(Error, Debug)]
pub enum EngineError {
    /// `start` was called on a running engine
    #[error("Event engine is already running")]
    AlreadyRunning,

    /// The OS refused to spawn a worker thread
    #[error("Failed to spawn {name}: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// A worker thread panicked outside handler isolation
    #[error("Worker thread panicked: {0}")]
    WorkerPanicked(&'static str),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Type alias for Result with EngineError
pub type EngineResult<T> = Result<T, EngineError>;

//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Building blocks of the event engine: the event value, the pending-event queue and the
// registry mapping event types to their handlers.
//
// | Component                | Description                                                |
// |--------------------------|------------------------------------------------------------|
// | Event / EventType        | Immutable (type, payload) value and its open-set tag       |
// | EventQueue               | Unbounded FIFO shared by producers and the dispatcher      |
// | HandlerRegistry          | Event type -> ordered handlers, behind a RwLock            |
// | EventHandler             | Trait for components that can handle events                |
// | EventRecorder            | Bounded history handler for debugging and tests            |
// | ChannelForwarder         | Bridges events into a tokio mpsc channel                   |
//--------------------------------------------------------------------------------------------------

mod error;
mod handlers;
mod queue;
mod registry;
mod types;

// Re-exports
pub use error::{EngineError, EngineResult, EventError, EventResult};
pub use handlers::{ChannelForwarder, EventRecorder};
pub use queue::{EventQueue, EventSender};
pub use registry::{EventHandler, HandlerId, HandlerRegistry};
pub use types::{Event, EventType, Payload, ENGINE_START, ENGINE_STOP, TIMER_TRIGGERED};

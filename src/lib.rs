//--------------------------------------------------------------------------------------------------
// CRATE OVERVIEW
//--------------------------------------------------------------------------------------------------
// In-process event distribution engine. Producers publish typed events through one queue,
// handlers registered per event type receive them on a single dispatch thread, and a timer
// thread publishes a heartbeat event on a fixed interval.
//
// | Module   | Description                                                          |
// |----------|----------------------------------------------------------------------|
// | events   | Event values, queue, handler registry, bundled handlers, errors      |
// | engine   | EventEngine lifecycle, timer and dispatch threads                    |
// | config   | EngineConfig and its environment loader                              |
//--------------------------------------------------------------------------------------------------

pub mod config;
pub mod engine;
pub mod events;

// Re-export key types for easier usage
pub use config::{EngineConfig, DEFAULT_TIMER_INTERVAL};
pub use engine::{EngineStats, EventEngine};
pub use events::{
    ChannelForwarder, EngineError, EngineResult, Event, EventError, EventHandler, EventQueue,
    EventRecorder, EventResult, EventSender, EventType, HandlerId, HandlerRegistry, Payload,
    ENGINE_START, ENGINE_STOP, TIMER_TRIGGERED,
};

//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods       |
// |-------------------------|---------------------------------------------------|-------------------|
// | EventRecorder           | Bounded in-memory history of received events      | history, wait_for |
// | ChannelForwarder        | Bridges dispatched events into a tokio channel    | new               |
//--------------------------------------------------------------------------------------------------

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::error::{EventError, EventResult};
use super::registry::EventHandler;
use super::types::Event;

/// A simple in-memory event recorder for debugging and tests
#[derive(Debug)]
pub struct EventRecorder {
    /// Maximum number of events to keep in history
    max_history: usize,
    /// Event history, oldest first
    history: Mutex<VecDeque<Event>>,
    /// Signalled whenever an event is recorded
    recorded: Condvar,
}

impl EventRecorder {
    /// Creates a new event recorder
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            history: Mutex::new(VecDeque::with_capacity(max_history)),
            recorded: Condvar::new(),
        }
    }

    /// Returns the event history
    pub fn history(&self) -> Vec<Event> {
        self.history.lock().iter().cloned().collect()
    }

    /// Returns the number of events currently held
    pub fn len(&self) -> usize {
        self.history.lock().len()
    }

    /// Returns true when nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.history.lock().is_empty()
    }

    /// Blocks until at least `count` events are held or `timeout` elapses.
    ///
    /// # Returns
    /// true if the history reached `count` in time.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut history = self.history.lock();
        while history.len() < count {
            if self.recorded.wait_until(&mut history, deadline).timed_out() {
                return history.len() >= count;
            }
        }
        true
    }
}

impl EventHandler for EventRecorder {
    fn handle_event(&self, event: &Event) -> EventResult<()> {
        let mut history = self.history.lock();

        // Remove oldest event if at capacity
        if history.len() >= self.max_history {
            history.pop_front();
        }
        history.push_back(event.clone());

        self.recorded.notify_all();
        Ok(())
    }
}

/// Forwards every event it receives into an unbounded tokio channel, so async
/// code can consume engine events with `recv().await`.
///
/// Once the receiver is dropped each forward fails with
/// [`EventError::HandlerFailed`]; unregister the forwarder to silence it.
#[derive(Debug, Clone)]
pub struct ChannelForwarder {
    sender: mpsc::UnboundedSender<Event>,
}

impl ChannelForwarder {
    /// Creates a forwarder and the receiver it feeds.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        debug!("Created channel forwarder");
        (Self { sender }, receiver)
    }
}

impl EventHandler for ChannelForwarder {
    fn handle_event(&self, event: &Event) -> EventResult<()> {
        self.sender.send(event.clone()).map_err(|e| {
            warn!("Forward target dropped, discarding event of type {}", e.0.event_type());
            EventError::HandlerFailed("forward receiver dropped".to_string())
        })
    }
}

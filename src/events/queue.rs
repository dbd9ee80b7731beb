//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods       |
// |-------------------------|---------------------------------------------------|-------------------|
// | EventQueue              | Unbounded FIFO of pending events                  | push, pop         |
// | EventSender             | Cloneable producer handle onto the queue          | send_event        |
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{error, trace};

use super::types::Event;

/// Producer side of an [`EventQueue`].
///
/// Cheap to clone and safe to move into other threads; every clone feeds the
/// same FIFO.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: Sender<Event>,
    pushed: Arc<AtomicU64>,
}

impl EventSender {
    /// Enqueues an event. Never blocks.
    pub fn send_event(&self, event: Event) {
        trace!("Enqueueing event of type {}", event.event_type());

        match self.sender.send(event) {
            Ok(()) => {
                self.pushed.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => error!(
                "Failed to enqueue event of type {}: receiver disconnected",
                e.0.event_type()
            ),
        }
    }
}

/// Thread-safe unbounded FIFO shared by producers, the timer thread and the
/// dispatch thread.
///
/// Events come out in exactly the order they went in, across all producers.
/// The queue owns its receiving end, so pushes cannot fail while it is alive.
#[derive(Debug, Clone)]
pub struct EventQueue {
    sender: EventSender,
    receiver: Receiver<Event>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender: EventSender {
                sender,
                pushed: Arc::new(AtomicU64::new(0)),
            },
            receiver,
        }
    }

    /// Appends an event to the back of the queue.
    pub fn push(&self, event: Event) {
        self.sender.send_event(event);
    }

    /// Takes the front event, waiting at most `timeout` for one to arrive.
    ///
    /// # Returns
    /// * `Some(event)` - The oldest pending event
    /// * `None` - Nothing arrived within `timeout`
    pub fn pop(&self, timeout: Duration) -> Option<Event> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Takes the front event without waiting.
    pub fn try_pop(&self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }

    /// Returns the number of pending events.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Returns true when no event is pending.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Returns the total number of events pushed since creation.
    pub fn pushed_count(&self) -> u64 {
        self.sender.pushed.load(Ordering::Relaxed)
    }

    /// Returns a producer handle onto this queue.
    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    pub(crate) fn receiver(&self) -> &Receiver<Event> {
        &self.receiver
    }
}

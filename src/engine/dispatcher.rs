//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Dispatch thread: sole consumer of the event queue. Every event is fanned out to the handlers
// registered for its type, in registration order, on this thread. A failing or panicking
// handler is logged and counted; the remaining handlers and events are still delivered.
//
// On shutdown the events already queued (the EngineStopped event among them) are delivered
// before the thread exits.
//--------------------------------------------------------------------------------------------------

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{select, Receiver, TryRecvError};
use tracing::{debug, error, info, trace};

use super::Shared;
use crate::events::{EngineError, EngineResult, Event};

pub(crate) const DISPATCH_THREAD: &str = "EventThread";

thread_local! {
    // Address of the engine state this thread dispatches for, 0 elsewhere
    static DISPATCHING_FOR: Cell<usize> = const { Cell::new(0) };
}

/// Returns true when called from a handler running on this engine's
/// dispatch thread.
pub(crate) fn is_dispatch_thread(shared: &Arc<Shared>) -> bool {
    DISPATCHING_FOR.with(|current| current.get() == Arc::as_ptr(shared) as usize)
}

/// Spawns the dispatch thread.
///
/// # Arguments
/// * `shared` - Engine state holding the queue and the registry
/// * `shutdown` - Disconnecting this channel drains the queue and ends the thread
pub(crate) fn spawn(shared: Arc<Shared>, shutdown: Receiver<()>) -> EngineResult<JoinHandle<()>> {
    thread::Builder::new()
        .name(DISPATCH_THREAD.to_string())
        .spawn(move || {
            DISPATCHING_FOR.with(|current| current.set(Arc::as_ptr(&shared) as usize));
            run(&shared, &shutdown);
        })
        .map_err(|source| EngineError::Spawn {
            name: DISPATCH_THREAD,
            source,
        })
}

fn run(shared: &Shared, shutdown: &Receiver<()>) {
    info!("[{}] Event dispatcher started", shared.name);
    let events = shared.queue.receiver();

    loop {
        // A handler may have signalled shutdown while more events were queued
        if matches!(shutdown.try_recv(), Err(TryRecvError::Disconnected)) {
            drain(shared);
            break;
        }

        let next = select! {
            recv(events) -> event => event.ok(),
            recv(shutdown) -> _ => None,
        };

        match next {
            Some(event) => dispatch(shared, &event),
            None => {
                drain(shared);
                break;
            }
        }
    }

    info!("[{}] Event dispatcher stopped", shared.name);
}

/// Delivers what is queued at this instant; later arrivals wait for the next start.
fn drain(shared: &Shared) {
    let pending = shared.queue.len();
    debug!("[{}] Draining {} pending events", shared.name, pending);

    for _ in 0..pending {
        match shared.queue.try_pop() {
            Some(event) => dispatch(shared, &event),
            None => break,
        }
    }
}

/// Invokes every handler registered for the event's type, in order.
pub(crate) fn dispatch(shared: &Shared, event: &Event) {
    let event_type = event.event_type();
    let handlers = shared.registry.lookup(event_type);

    if handlers.is_empty() {
        trace!("No handlers registered for event type: {}", event_type);
    }

    for (index, handler) in handlers.iter().enumerate() {
        match panic::catch_unwind(AssertUnwindSafe(|| handler.handle_event(event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                shared.counters.record_failure();
                error!(
                    "[{}] Handler #{} failed to process {} event: {}",
                    shared.name, index, event_type, e
                );
            }
            Err(panic) => {
                shared.counters.record_failure();
                error!(
                    "[{}] Handler #{} panicked on {} event: {}",
                    shared.name,
                    index,
                    event_type,
                    panic_message(panic.as_ref())
                );
            }
        }
    }

    shared.counters.record_dispatch();
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

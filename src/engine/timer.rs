//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Timer thread: while the engine is active, pushes a timer event and then sleeps for the
// configured interval. The sleep is a receive on the stop channel, so `stop` wakes it at once
// instead of waiting out the interval.
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, info};

use super::Shared;
use crate::events::{EngineError, EngineResult, Event};

pub(crate) const TIMER_THREAD: &str = "TimerThread";

/// Spawns the timer thread.
///
/// # Arguments
/// * `shared` - Engine state; the thread runs while `shared.active` is set
/// * `interval` - Time between two timer events
/// * `stop` - Disconnecting (or sending on) this channel ends the thread
pub(crate) fn spawn(
    shared: Arc<Shared>,
    interval: Duration,
    stop: Receiver<()>,
) -> EngineResult<JoinHandle<()>> {
    thread::Builder::new()
        .name(TIMER_THREAD.to_string())
        .spawn(move || run(&shared, interval, &stop))
        .map_err(|source| EngineError::Spawn {
            name: TIMER_THREAD,
            source,
        })
}

fn run(shared: &Shared, interval: Duration, stop: &Receiver<()>) {
    info!("[{}] Timer started with interval {:?}", shared.name, interval);

    while shared.active.load(Ordering::SeqCst) {
        shared.queue.push(Event::timer());
        shared.counters.record_tick();

        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                debug!("[{}] Timer received stop signal", shared.name);
                break;
            }
        }
    }

    info!("[{}] Timer stopped", shared.name);
}

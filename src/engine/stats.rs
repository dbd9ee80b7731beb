use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Point-in-time counters of an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Events pushed onto the queue, including lifecycle and timer events
    pub published: u64,
    /// Events taken off the queue and fanned out
    pub dispatched: u64,
    /// Timer events produced
    pub timer_ticks: u64,
    /// Handler invocations that returned an error or panicked
    pub handler_failures: u64,
    /// Events waiting in the queue
    pub pending: usize,
}

#[derive(Debug, Default)]
pub(crate) struct EngineCounters {
    dispatched: AtomicU64,
    timer_ticks: AtomicU64,
    handler_failures: AtomicU64,
}

impl EngineCounters {
    pub(crate) fn record_dispatch(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_tick(&self) {
        self.timer_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, published: u64, pending: usize) -> EngineStats {
        EngineStats {
            published,
            dispatched: self.dispatched.load(Ordering::Relaxed),
            timer_ticks: self.timer_ticks.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            pending,
        }
    }
}

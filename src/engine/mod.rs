//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// The event engine: a single point through which producers publish events and registered
// handlers receive them, plus a heartbeat timer event on a fixed interval.
//
// | Component      | Description                                                          |
// |----------------|----------------------------------------------------------------------|
// | EventEngine    | Owns the queue, the registry and the two worker threads              |
// | timer          | TimerThread: pushes a Timer event every interval while active        |
// | dispatcher     | EventThread: pops events and fans them out to handlers               |
// | EngineStats    | Counters snapshot                                                    |
//
// Lifecycle: Stopped -> Running -> Stopped, restartable. `stop` is a blocking shutdown: it
// returns once both threads have exited and every event queued before it was delivered.
//--------------------------------------------------------------------------------------------------

mod dispatcher;
mod stats;
mod timer;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::events::{
    EngineError, EngineResult, Event, EventHandler, EventQueue, EventResult, EventSender, EventType,
    HandlerId, HandlerRegistry,
};

pub use stats::EngineStats;

use dispatcher::DISPATCH_THREAD;
use stats::EngineCounters;
use timer::TIMER_THREAD;

/// How long a handler calling `stop` waits for the lifecycle lock before
/// checking whether another thread is already stopping.
const LOCK_RETRY: Duration = Duration::from_millis(1);

/// State shared between the engine handle and its worker threads.
#[derive(Debug)]
pub(crate) struct Shared {
    name: String,
    queue: EventQueue,
    registry: HandlerRegistry,
    active: AtomicBool,
    /// Set by the thread that took the running session down, until the next start
    stopping: AtomicBool,
    counters: EngineCounters,
}

/// Handles of a running session.
struct Workers {
    timer: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
    timer_stop: Sender<()>,
    dispatch_stop: Sender<()>,
}

#[derive(Default)]
struct Lifecycle {
    running: Option<Workers>,
    /// Dispatcher of a session stopped from one of its own handlers; it exits
    /// after draining and is joined by the next `start`.
    detached: Option<JoinHandle<()>>,
}

/// In-process event distribution engine.
///
/// Producers call [`EventEngine::send_event`]; handlers registered with
/// [`EventEngine::register`] are invoked for every event of their type, in
/// registration order, on the engine's dispatch thread. While running, the
/// engine also publishes an [`EventType::TIMER`] event every
/// `timer_interval`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use event_engine::{Event, EventEngine, EventRecorder};
///
/// let engine = EventEngine::with_timer_interval_secs(1);
/// let recorder = Arc::new(EventRecorder::new(16));
/// engine.register_handler("Log", recorder.clone());
///
/// engine.send_event(Event::with_data("Log", "payload"));
/// engine.start().unwrap();
/// assert!(recorder.wait_for(1, Duration::from_secs(5)));
/// engine.stop().unwrap();
///
/// assert_eq!(recorder.history()[0].data::<&str>(), Some(&"payload"));
/// ```
pub struct EventEngine {
    config: EngineConfig,
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
}

impl std::fmt::Debug for EventEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEngine")
            .field("config", &self.config)
            .field("active", &self.is_active())
            .field("registry", &self.shared.registry)
            .field("pending", &self.shared.queue.len())
            .finish()
    }
}

impl Default for EventEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl EventEngine {
    /// Creates a stopped engine.
    ///
    /// # Arguments
    /// * `config` - Engine configuration; a zero interval is replaced by the default
    pub fn new(config: EngineConfig) -> Self {
        let config = config.normalized();
        debug!(
            "[{}] Created event engine with timer interval {:?}",
            config.name, config.timer_interval
        );

        Self {
            shared: Arc::new(Shared {
                name: config.name.clone(),
                queue: EventQueue::new(),
                registry: HandlerRegistry::new(),
                active: AtomicBool::new(false),
                stopping: AtomicBool::new(false),
                counters: EngineCounters::default(),
            }),
            config,
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    /// Creates a stopped engine ticking every `secs` seconds; non-positive
    /// values fall back to one second.
    pub fn with_timer_interval_secs(secs: i64) -> Self {
        Self::new(EngineConfig::default().with_timer_interval_secs(secs))
    }

    /// Starts the timer and dispatch threads and publishes the
    /// [`EventType::ENGINE_STARTED`] event.
    ///
    /// Events sent before `start` are delivered first, then the started event,
    /// then everything else; no timer event of this session precedes it.
    ///
    /// # Returns
    /// * `Ok(())` - Both threads are running
    /// * `Err(EngineError::AlreadyRunning)` - The engine was already started
    /// * `Err(EngineError::Spawn)` - A thread could not be created
    pub fn start(&self) -> EngineResult<()> {
        let mut lifecycle = if dispatcher::is_dispatch_thread(&self.shared) {
            // A stop may be waiting on this very thread
            self.lifecycle.try_lock().ok_or(EngineError::AlreadyRunning)?
        } else {
            self.lifecycle.lock()
        };

        if lifecycle.running.is_some() {
            return Err(EngineError::AlreadyRunning);
        }
        if let Some(previous) = lifecycle.detached.take() {
            if previous.thread().id() == thread::current().id() {
                lifecycle.detached = Some(previous);
                return Err(EngineError::AlreadyRunning);
            }
            join(previous, DISPATCH_THREAD)?;
        }

        self.shared.stopping.store(false, Ordering::SeqCst);
        self.shared.active.store(true, Ordering::SeqCst);

        let (dispatch_stop, dispatch_rx) = bounded::<()>(0);
        let dispatcher = match dispatcher::spawn(Arc::clone(&self.shared), dispatch_rx) {
            Ok(handle) => handle,
            Err(e) => {
                self.shared.active.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        self.shared.queue.push(Event::engine_started());

        let (timer_stop, timer_rx) = bounded::<()>(0);
        let timer = match timer::spawn(
            Arc::clone(&self.shared),
            self.config.timer_interval,
            timer_rx,
        ) {
            Ok(handle) => handle,
            Err(e) => {
                self.abort_start(dispatcher, dispatch_stop);
                return Err(e);
            }
        };

        lifecycle.running = Some(Workers {
            timer,
            dispatcher,
            timer_stop,
            dispatch_stop,
        });

        info!("[{}] Event engine started", self.config.name);
        Ok(())
    }

    /// Closes a session whose timer could not be spawned. The started event is
    /// already queued, so the stopped event follows it before the dispatcher exits.
    fn abort_start(&self, dispatcher: JoinHandle<()>, dispatch_stop: Sender<()>) {
        self.shared.stopping.store(true, Ordering::SeqCst);
        self.shared.active.store(false, Ordering::SeqCst);
        self.shared.queue.push(Event::engine_stopped());
        drop(dispatch_stop);

        if let Err(e) = join(dispatcher, DISPATCH_THREAD) {
            error!("[{}] Failed to roll back engine start: {}", self.config.name, e);
        }
    }

    /// Stops the engine and waits for both threads to exit.
    ///
    /// The [`EventType::ENGINE_STOPPED`] event is delivered exactly once, after
    /// the last timer event of the session. Nothing is dispatched once this
    /// returns. Stopping a stopped engine does nothing.
    ///
    /// Called from a handler, the dispatch thread cannot wait for itself: the
    /// shutdown is signalled and the thread exits as soon as the handler
    /// returns and the queue is drained.
    ///
    /// # Returns
    /// * `Ok(())` - The engine is stopped
    /// * `Err(EngineError::WorkerPanicked)` - A worker thread panicked
    pub fn stop(&self) -> EngineResult<()> {
        let on_dispatch_thread = dispatcher::is_dispatch_thread(&self.shared);

        let mut lifecycle = if on_dispatch_thread {
            // The holder may be a stop waiting for this very thread to exit, or a
            // start that releases the lock shortly
            loop {
                if let Some(lifecycle) = self.lifecycle.try_lock_for(LOCK_RETRY) {
                    break lifecycle;
                }
                if self.shared.stopping.load(Ordering::SeqCst) {
                    debug!("[{}] Stop already in progress", self.config.name);
                    return Ok(());
                }
            }
        } else {
            self.lifecycle.lock()
        };

        let Some(workers) = lifecycle.running.take() else {
            debug!("[{}] Stop requested but engine is not running", self.config.name);
            return Ok(());
        };

        info!("[{}] Stopping event engine", self.config.name);
        self.shared.stopping.store(true, Ordering::SeqCst);
        self.shared.active.store(false, Ordering::SeqCst);

        let Workers {
            timer,
            dispatcher,
            timer_stop,
            dispatch_stop,
        } = workers;

        drop(timer_stop);
        let timer_result = join(timer, TIMER_THREAD);

        self.shared.queue.push(Event::engine_stopped());
        drop(dispatch_stop);

        let dispatch_result = if on_dispatch_thread {
            warn!(
                "[{}] Engine stopped from its own handler; dispatcher exits after draining",
                self.config.name
            );
            lifecycle.detached = Some(dispatcher);
            Ok(())
        } else {
            join(dispatcher, DISPATCH_THREAD)
        };

        info!("[{}] Event engine stopped", self.config.name);
        timer_result.and(dispatch_result)
    }

    /// Returns true between `start` and `stop`.
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Publishes an event. Never blocks; valid whether or not the engine runs.
    pub fn send_event(&self, event: Event) {
        self.shared.queue.push(event);
    }

    /// Returns a cloneable producer handle, usable from any thread and from
    /// inside handlers.
    pub fn sender(&self) -> EventSender {
        self.shared.queue.sender()
    }

    /// Registers a closure for `event_type`.
    ///
    /// The same logic may be registered several times; it then runs once per
    /// registration.
    ///
    /// # Returns
    /// The id to pass to [`EventEngine::unregister`].
    pub fn register<F>(&self, event_type: impl Into<EventType>, handler: F) -> HandlerId
    where
        F: Fn(&Event) -> EventResult<()> + Send + Sync + 'static,
    {
        self.shared.registry.register(event_type.into(), Arc::new(handler))
    }

    /// Registers a shared handler for `event_type`.
    pub fn register_handler(
        &self,
        event_type: impl Into<EventType>,
        handler: Arc<dyn EventHandler>,
    ) -> HandlerId {
        self.shared.registry.register(event_type.into(), handler)
    }

    /// Removes the registration `id` from `event_type`.
    ///
    /// # Returns
    /// * `Err(EventError::UnknownEventType)` - `event_type` never had a handler
    /// * `Err(EventError::HandlerNotRegistered)` - `id` is not registered for `event_type`
    pub fn unregister(&self, event_type: impl Into<EventType>, id: HandlerId) -> EventResult<()> {
        self.shared.registry.unregister(&event_type.into(), id)
    }

    /// Removes the first registration of `handler` from `event_type`.
    pub fn unregister_handler(
        &self,
        event_type: impl Into<EventType>,
        handler: &Arc<dyn EventHandler>,
    ) -> EventResult<()> {
        self.shared
            .registry
            .unregister_handler(&event_type.into(), handler)
    }

    /// Returns the number of handlers registered for `event_type`.
    pub fn handler_count(&self, event_type: impl Into<EventType>) -> usize {
        self.shared.registry.handler_count(&event_type.into())
    }

    /// Returns the effective timer interval.
    pub fn timer_interval(&self) -> Duration {
        self.config.timer_interval
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns a snapshot of the engine counters.
    pub fn stats(&self) -> EngineStats {
        self.shared
            .counters
            .snapshot(self.shared.queue.pushed_count(), self.shared.queue.len())
    }
}

impl Drop for EventEngine {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("[{}] Failed to stop event engine on drop: {}", self.config.name, e);
        }
    }
}

fn join(handle: JoinHandle<()>, name: &'static str) -> EngineResult<()> {
    handle.join().map_err(|_| {
        error!("{} panicked", name);
        EngineError::WorkerPanicked(name)
    })
}

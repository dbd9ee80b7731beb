//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Demo for the event engine. A fake producer thread publishes an event every few hundred
// milliseconds, a handler counts them, and the engine's own timer events are logged as they
// arrive. The demo stops the engine once the requested number of events has been handled.
//--------------------------------------------------------------------------------------------------
// cargo run --bin event-engine-demo
// cargo run --bin event-engine-demo -- --timer-interval 2 --send-interval-ms 250 --count 20
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, Level};

use event_engine::{EngineConfig, Event, EventEngine, EventSender, EventType};

const FAKE_EVENT: EventType = EventType::new("Uncategorized");
const FAKE_DATA: &str = "TestEvent";

#[derive(Parser, Debug)]
#[command(author, version, about = "Runs the event engine against a fake producer")]
struct Args {
    /// Timer interval in seconds; falls back to EVENT_ENGINE_TIMER_INTERVAL_SECS
    #[arg(short, long)]
    timer_interval: Option<i64>,

    /// Delay between two fake events, in milliseconds
    #[arg(short, long, default_value = "500")]
    send_interval_ms: u64,

    /// Number of fake events to handle before stopping
    #[arg(short, long, default_value = "10")]
    count: usize,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Publishes the same event on a fixed cadence until stopped.
struct FakeSender {
    active: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FakeSender {
    fn start(sender: EventSender, interval: Duration) -> anyhow::Result<Self> {
        let active = Arc::new(AtomicBool::new(true));
        let running = Arc::clone(&active);

        let handle = thread::Builder::new()
            .name("FakeSender".to_string())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    sender.send_event(Event::with_data(FAKE_EVENT, FAKE_DATA));
                    info!("[FakeSender] Fake event sent");
                    thread::sleep(interval);
                }
            })
            .context("failed to spawn fake sender")?;

        Ok(Self {
            active,
            handle: Some(handle),
        })
    }

    fn stop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let mut config = EngineConfig::try_from_env()?;
    if let Some(secs) = args.timer_interval {
        config = config.with_timer_interval_secs(secs);
    }
    let engine = EventEngine::new(config);

    engine.register(EventType::TIMER, |event: &Event| {
        info!("[TimerCallback] Timer event received: {:?}", event.data::<&str>());
        Ok(())
    });

    let received = Arc::new(AtomicUsize::new(0));
    let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);
    let target = args.count;
    let counter = Arc::clone(&received);
    engine.register(FAKE_EVENT, move |event: &Event| {
        let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            "[TestCallback] Test event received ({:?}). Count = {}",
            event.data::<&str>(),
            count
        );
        if count == target {
            let _ = done_tx.try_send(());
        }
        Ok(())
    });

    engine.start()?;
    let mut fake_sender =
        FakeSender::start(engine.sender(), Duration::from_millis(args.send_interval_ms))?;

    done_rx.recv().context("event handler went away")?;

    fake_sender.stop();
    engine.stop()?;

    let stats = engine.stats();
    info!(
        "Demo finished: {} events handled, {} dispatched, {} timer ticks, {} handler failures",
        received.load(Ordering::SeqCst),
        stats.dispatched,
        stats.timer_ticks,
        stats.handler_failures
    );
    Ok(())
}

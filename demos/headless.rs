use gosub_embedder::config::{EventLoopConfig, LogLevel};
use gosub_embedder::logging;
use gosub_embedder::{Embedder, EngineClock, EngineError, SystemEngineClock, TaskExecutor};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Pretend engine: prints every task it is asked to run.
struct PrintingEngine {
    started: Instant,
    ran: AtomicU32,
}

impl TaskExecutor<String> for PrintingEngine {
    fn run_task(&self, task: &String) -> Result<(), EngineError> {
        self.ran.fetch_add(1, Ordering::Relaxed);
        println!("[{:>6.1?}] platform thread runs: {}", self.started.elapsed(), task);
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    // Set up the config for the host loop. One host tick waits at most 16ms, roughly one frame.
    let config = EventLoopConfig::builder()
        .tick_max_wait(Duration::from_millis(16))
        .log_level(LogLevel::Debug)
        .thread_name("demo-main")
        .build()?;
    logging::init(config.log_level);

    let clock = SystemEngineClock::new();
    let engine = Arc::new(PrintingEngine {
        started: Instant::now(),
        ran: AtomicU32::new(0),
    });

    // The embedder must be created on the thread that will poll it
    let embedder = Embedder::new(Some(config), clock, engine.clone());

    // Engine worker threads posting work for the platform thread, each with its own cadence
    let workers: Vec<_> = ["raster", "io", "ui"]
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let poster = embedder.poster();
            thread::spawn(move || {
                for n in 0..5u64 {
                    let delay_ms = (i as u64 + 1) * 10 * (n + 1);
                    let target = clock.now_nanos() + delay_ms * 1_000_000;
                    poster.post_task(format!("{name} task {n} (+{delay_ms}ms)"), target);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().map_err(|_| anyhow::anyhow!("worker thread panicked"))?;
    }

    // Host main loop
    let until = Instant::now() + Duration::from_millis(250);
    let mut ticks = 0;
    while Instant::now() < until {
        embedder.poll_events();
        ticks += 1;
    }

    println!(
        "{} tasks run in {} host ticks, {} still pending",
        engine.ran.load(Ordering::Relaxed),
        ticks,
        embedder.event_loop().pending_tasks()
    );

    Ok(())
}

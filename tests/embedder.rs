use anyhow::Result;
use gosub_embedder::config::EventLoopConfig;
use gosub_embedder::{Embedder, EngineClock, EngineError, SystemEngineClock, TaskExecutor, TaskPoster};
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Job {
    Frame(u32),
    Decode(u32),
    Broken,
}

/// Stand-in for an engine: renders a few frames, each one scheduling the next.
struct FakeEngine {
    clock: SystemEngineClock,
    poster: OnceLock<TaskPoster<Job>>,
    log: Mutex<Vec<Job>>,
    last_frame: u32,
}

impl FakeEngine {
    fn new(clock: SystemEngineClock, last_frame: u32) -> Self {
        Self {
            clock,
            poster: OnceLock::new(),
            log: Mutex::new(Vec::new()),
            last_frame,
        }
    }
}

impl TaskExecutor<Job> for FakeEngine {
    fn run_task(&self, task: &Job) -> Result<(), EngineError> {
        self.log.lock().push(*task);

        match *task {
            Job::Frame(n) if n < self.last_frame => {
                let poster = self.poster.get().ok_or_else(|| EngineError::TaskExecution("no poster".into()))?;
                let next = self.clock.now_nanos() + 2_000_000;
                poster.post_task(Job::Frame(n + 1), next);
                Ok(())
            }
            Job::Broken => Err(EngineError::TaskExecution("broken job".into())),
            _ => Ok(()),
        }
    }
}

fn start(last_frame: u32) -> Result<(Embedder<Job>, Arc<FakeEngine>, SystemEngineClock)> {
    let clock = SystemEngineClock::new();
    let engine = Arc::new(FakeEngine::new(clock, last_frame));
    let config = EventLoopConfig::builder()
        .tick_max_wait(Duration::from_millis(1))
        .thread_name("test-host")
        .build()?;

    let embedder = Embedder::new(Some(config), clock, engine.clone());
    engine
        .poster
        .set(embedder.poster())
        .map_err(|_| anyhow::anyhow!("poster already set"))?;
    Ok((embedder, engine, clock))
}

fn poll_until(embedder: &Embedder<Job>, limit: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    while !done() {
        if Instant::now() > deadline {
            return false;
        }
        embedder.poll_events();
    }
    true
}

#[test]
fn self_rescheduling_frames_run_in_sequence() -> Result<()> {
    let (embedder, engine, clock) = start(5)?;

    embedder.post_task(Job::Frame(0), clock.now_nanos());
    let finished = poll_until(&embedder, Duration::from_secs(5), || {
        engine.log.lock().contains(&Job::Frame(5))
    });
    assert!(finished, "frames stalled: {:?}", engine.log.lock());

    let frames: Vec<Job> = (0..=5).map(Job::Frame).collect();
    assert_eq!(*engine.log.lock(), frames);
    assert_eq!(embedder.event_loop().pending_tasks(), 0);
    Ok(())
}

#[test]
fn worker_threads_feed_the_platform_thread() -> Result<()> {
    let (embedder, engine, clock) = start(0)?;
    let platform = embedder.event_loop();

    let workers: Vec<_> = (0..4u32)
        .map(|w| {
            let poster = embedder.poster();
            let platform = platform.clone();
            thread::spawn(move || {
                assert!(!platform.runs_tasks_on_current_thread());
                for i in 0..10 {
                    poster.post_task(Job::Decode(w * 100 + i), clock.now_nanos() + 1_000_000);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker panicked");
    }

    let finished = poll_until(&embedder, Duration::from_secs(5), || engine.log.lock().len() == 40);
    assert!(finished);

    // Per worker, decodes arrive in the order they were posted
    let log = engine.log.lock();
    for w in 0..4u32 {
        let mine: Vec<u32> = log
            .iter()
            .filter_map(|job| match job {
                Job::Decode(id) if id / 100 == w => Some(id % 100),
                _ => None,
            })
            .collect();
        assert_eq!(mine, (0..10).collect::<Vec<u32>>());
    }
    Ok(())
}

#[test]
fn rejected_task_does_not_block_the_rest() -> Result<()> {
    let (embedder, engine, clock) = start(0)?;

    // Fresh engine "now" per post keeps the converted fire times in post order
    embedder.post_task(Job::Decode(1), clock.now_nanos());
    embedder.post_task(Job::Broken, clock.now_nanos());
    embedder.post_task(Job::Decode(2), clock.now_nanos());

    let finished = poll_until(&embedder, Duration::from_secs(5), || engine.log.lock().len() == 3);
    assert!(finished);
    assert_eq!(*engine.log.lock(), vec![Job::Decode(1), Job::Broken, Job::Decode(2)]);
    Ok(())
}

#[test]
fn runners_share_one_platform_thread() -> Result<()> {
    let (embedder, engine, clock) = start(0)?;
    let runners = embedder.task_runners();
    assert!(runners.render_is_platform());

    runners.render.post_task(Job::Frame(7), clock.now_nanos());
    runners.platform.post_task(Job::Decode(7), clock.now_nanos());

    let finished = poll_until(&embedder, Duration::from_secs(5), || engine.log.lock().len() == 2);
    assert!(finished);
    assert_eq!(*engine.log.lock(), vec![Job::Frame(7), Job::Decode(7)]);
    Ok(())
}

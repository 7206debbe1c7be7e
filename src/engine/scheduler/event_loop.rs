use super::queue::TaskQueue;
use super::wake::{CondvarWake, WakeStrategy, Wakeup};
use crate::engine::clock::{host_time_from_engine_time, EngineClock};
use std::fmt;
use std::fmt::Display;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// A unique identifier for an event loop, represented as a UUID.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LoopId(Uuid);

impl LoopId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LoopId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for LoopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Called on the platform thread with the payload of every task whose fire time has passed.
pub type TaskExpiredCallback<T> = Box<dyn Fn(T) + Send + Sync>;

/// Everything a posting thread needs. Kept apart from the callback so that a callback can hold
/// a [`TaskPoster`] without keeping its own event loop alive.
struct Shared<T, W> {
    id: LoopId,
    queue: TaskQueue<T>,
    waker: W,
    clock: Arc<dyn EngineClock>,
}

impl<T, W: WakeStrategy> Shared<T, W> {
    fn post_task(&self, payload: T, target_time_nanos: u64) -> u64 {
        let fire_time = host_time_from_engine_time(target_time_nanos, self.clock.now_nanos(), Instant::now());
        self.post_task_at(payload, fire_time)
    }

    fn post_task_at(&self, payload: T, fire_time: Instant) -> u64 {
        let order = self.queue.schedule(fire_time, payload);
        // Always wake: the new task may be due before whatever the platform thread waits for
        self.waker.wake();
        log::trace!("EventLoop[{}]: posted task #{}", self.id, order);
        order
    }
}

/// Cloneable handle for posting into an [`EventLoop`] from anywhere, including from inside the
/// loop's own task-expired callback.
pub struct TaskPoster<T, W = CondvarWake> {
    shared: Arc<Shared<T, W>>,
}

impl<T, W> Clone for TaskPoster<T, W> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T, W> fmt::Debug for TaskPoster<T, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskPoster").field("loop_id", &self.shared.id).finish()
    }
}

impl<T, W: WakeStrategy> TaskPoster<T, W> {
    pub fn loop_id(&self) -> LoopId {
        self.shared.id
    }

    /// See [`EventLoop::post_task`].
    pub fn post_task(&self, payload: T, target_time_nanos: u64) -> u64 {
        self.shared.post_task(payload, target_time_nanos)
    }

    /// See [`EventLoop::post_task_at`].
    pub fn post_task_at(&self, payload: T, fire_time: Instant) -> u64 {
        self.shared.post_task_at(payload, fire_time)
    }
}

/// Drives engine tasks from the host's own loop.
///
/// Any thread may post tasks. Only the thread that created the loop (the platform thread) may
/// drain them through [`wait_for_events`](Self::wait_for_events); the task-expired callback
/// therefore always runs on that thread.
pub struct EventLoop<T, W = CondvarWake> {
    shared: Arc<Shared<T, W>>,
    /// Identity of the platform thread, fixed at construction
    platform_thread: ThreadId,
    on_task_expired: TaskExpiredCallback<T>,
}

impl<T, W> fmt::Debug for EventLoop<T, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("id", &self.shared.id)
            .field("platform_thread", &self.platform_thread)
            .finish_non_exhaustive()
    }
}

impl<T> EventLoop<T, CondvarWake> {
    /// Creates a headless event loop owned by the calling thread.
    pub fn new(
        clock: impl EngineClock + 'static,
        on_task_expired: impl Fn(T) + Send + Sync + 'static,
    ) -> Self {
        Self::with_strategy(CondvarWake::new(), clock, on_task_expired)
    }
}

impl<T, W: WakeStrategy> EventLoop<T, W> {
    /// Creates an event loop owned by the calling thread, waiting with `waker`.
    pub fn with_strategy(
        waker: W,
        clock: impl EngineClock + 'static,
        on_task_expired: impl Fn(T) + Send + Sync + 'static,
    ) -> Self {
        let id = LoopId::new();
        let platform_thread = thread::current().id();
        log::debug!("EventLoop[{}]: created on {:?}", id, platform_thread);

        Self {
            shared: Arc::new(Shared {
                id,
                queue: TaskQueue::new(),
                waker,
                clock: Arc::new(clock),
            }),
            platform_thread,
            on_task_expired: Box::new(on_task_expired),
        }
    }

    pub fn id(&self) -> LoopId {
        self.shared.id
    }

    /// True when called from the platform thread.
    pub fn runs_tasks_on_current_thread(&self) -> bool {
        thread::current().id() == self.platform_thread
    }

    /// Queues `payload` to fire at `target_time_nanos` on the engine clock. Returns the task
    /// order. Callable from any thread.
    pub fn post_task(&self, payload: T, target_time_nanos: u64) -> u64 {
        self.shared.post_task(payload, target_time_nanos)
    }

    /// Queues `payload` to fire at a host instant. Callable from any thread.
    pub fn post_task_at(&self, payload: T, fire_time: Instant) -> u64 {
        self.shared.post_task_at(payload, fire_time)
    }

    pub fn poster(&self) -> TaskPoster<T, W> {
        TaskPoster {
            shared: self.shared.clone(),
        }
    }

    pub fn pending_tasks(&self) -> usize {
        self.shared.queue.len()
    }

    /// Fire time of the earliest queued task. Hosts with their own run loop use this to arm
    /// their timer.
    pub fn next_fire_time(&self) -> Option<Instant> {
        self.shared.queue.peek_next_fire_time()
    }

    /// Runs one cycle: dispatches every expired task, then waits for at most `max_wait`
    /// (`None` waits until a task is due or a post arrives). Returns the number of tasks
    /// dispatched.
    ///
    /// Tasks posted while dispatching are never run in the same cycle. Pass
    /// `Some(Duration::ZERO)` to poll without blocking.
    ///
    /// # Panics
    ///
    /// Panics when called from any thread other than the platform thread.
    pub fn wait_for_events(&self, max_wait: Option<Duration>) -> usize {
        assert!(
            self.runs_tasks_on_current_thread(),
            "EventLoop[{}]: wait_for_events called off the platform thread",
            self.shared.id
        );

        let now = Instant::now();
        let expired = self.shared.queue.pop_expired(now);
        let dispatched = expired.len();

        // The queue lock is released at this point; callbacks are free to post
        for task in expired {
            log::trace!("EventLoop[{}]: running task #{}", self.shared.id, task.order());
            (self.on_task_expired)(task.into_payload());
        }

        let max_wake = max_wait.and_then(|wait| now.checked_add(wait));
        self.wait_until(max_wake);

        dispatched
    }

    /// Blocks until `max_wake`, the earliest queued fire time, or the next post, whichever
    /// comes first. The wake time is computed under the same lock hold that enters the wait,
    /// so a post can not slip in between unnoticed.
    fn wait_until(&self, max_wake: Option<Instant>) {
        let mut guard = self.shared.queue.lock();
        let generation = guard.generation();

        loop {
            let next_wake = earliest(max_wake, guard.next_fire_time());
            if next_wake.is_some_and(|deadline| deadline <= Instant::now()) {
                return;
            }

            match self.shared.waker.wait_until(&mut guard, next_wake) {
                Wakeup::Deferred => return,
                Wakeup::Signaled if guard.generation() != generation => return,
                // Spurious or early wakeup: re-evaluate the deadline and keep waiting
                Wakeup::Signaled | Wakeup::TimedOut => continue,
            }
        }
    }
}

/// Earliest of two optional instants, where `None` stands for "never".
fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

use super::task::Task;
use parking_lot::{Mutex, MutexGuard};
use std::collections::BinaryHeap;
use std::time::Instant;

/// Locked view of a [`TaskQueue`], handed to wake strategies so they can block on the same lock
/// that protects the queue.
pub type QueueGuard<'a, T> = MutexGuard<'a, QueueState<T>>;

/// State protected by the queue lock.
#[derive(Debug)]
pub struct QueueState<T> {
    /// Pending tasks, earliest `(fire_time, order)` on top
    heap: BinaryHeap<Task<T>>,
    /// Bumped on every push so a waiter can tell a real wakeup from a spurious one
    generation: u64,
}

impl<T> QueueState<T> {
    fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            generation: 0,
        }
    }

    fn push(&mut self, task: Task<T>) {
        self.heap.push(task);
        self.generation = self.generation.wrapping_add(1);
    }

    /// Fire time of the earliest pending task, `None` when nothing is queued.
    pub fn next_fire_time(&self) -> Option<Instant> {
        self.heap.peek().map(Task::fire_time)
    }

    /// Number of pushes seen so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// Thread-safe min-heap of pending tasks ordered by fire time, then by post order.
///
/// The queue never wakes anybody on its own; that is up to the event loop owning it.
#[derive(Debug)]
pub struct TaskQueue<T> {
    state: Mutex<QueueState<T>>,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::new()),
        }
    }

    /// Queues an already constructed task.
    pub fn push(&self, task: Task<T>) {
        self.state.lock().push(task);
    }

    /// Creates and queues a task, returning its order.
    ///
    /// The order is taken while holding the lock, so tasks sharing a fire time come out of this
    /// queue in exactly the order they went in, whichever thread pushed them.
    pub fn schedule(&self, fire_time: Instant, payload: T) -> u64 {
        let mut state = self.state.lock();
        let task = Task::new(fire_time, payload);
        let order = task.order();
        state.push(task);
        order
    }

    /// Removes and returns every task with `fire_time <= now`, earliest first.
    pub fn pop_expired(&self, now: Instant) -> Vec<Task<T>> {
        let mut state = self.state.lock();
        let mut expired = Vec::new();

        while state.heap.peek().is_some_and(|top| top.is_expired(now)) {
            if let Some(task) = state.heap.pop() {
                expired.push(task);
            }
        }

        expired
    }

    /// Earliest queued fire time, or `None` ("never") when the queue is empty.
    pub fn peek_next_fire_time(&self) -> Option<Instant> {
        self.state.lock().next_fire_time()
    }

    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().is_empty()
    }

    pub(crate) fn lock(&self) -> QueueGuard<'_, T> {
        self.state.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn payloads<T: Copy>(tasks: Vec<Task<T>>) -> Vec<T> {
        tasks.into_iter().map(Task::into_payload).collect()
    }

    #[test]
    fn pops_in_fire_time_then_post_order() {
        let queue = TaskQueue::new();
        let now = Instant::now();

        queue.schedule(now + Duration::from_millis(10), 'A');
        queue.schedule(now + Duration::from_millis(10), 'B');
        queue.schedule(now + Duration::from_millis(5), 'C');

        let drained = queue.pop_expired(now + Duration::from_millis(20));
        assert_eq!(payloads(drained), vec!['C', 'A', 'B']);
        assert!(queue.is_empty());
    }

    #[test]
    fn stops_at_first_future_task() {
        let queue = TaskQueue::new();
        let now = Instant::now();

        queue.schedule(now, 1);
        queue.schedule(now + Duration::from_millis(1), 2);
        queue.schedule(now + Duration::from_secs(60), 3);

        let drained = queue.pop_expired(now + Duration::from_millis(1));
        assert_eq!(payloads(drained), vec![1, 2]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.peek_next_fire_time(), Some(now + Duration::from_secs(60)));
    }

    #[test]
    fn empty_drain_leaves_queue_untouched() {
        let queue = TaskQueue::new();
        let now = Instant::now();
        let later = now + Duration::from_secs(1);

        assert!(queue.pop_expired(now).is_empty());

        queue.schedule(later, "x");
        assert!(queue.pop_expired(now).is_empty());
        assert!(queue.pop_expired(now).is_empty());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.peek_next_fire_time(), Some(later));
    }

    #[test]
    fn peek_on_empty_queue_is_never() {
        let queue: TaskQueue<()> = TaskQueue::new();
        assert_eq!(queue.peek_next_fire_time(), None);
    }

    #[test]
    fn push_bumps_generation() {
        let queue = TaskQueue::new();
        let before = queue.lock().generation();

        queue.push(Task::new(Instant::now(), ()));
        queue.schedule(Instant::now(), ());

        assert_eq!(queue.lock().generation(), before + 2);
    }

    #[test]
    fn concurrent_pushes_are_all_delivered_once() {
        let queue = Arc::new(TaskQueue::new());
        let at = Instant::now();

        let workers: Vec<_> = (0..4)
            .map(|w| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..250 {
                        queue.schedule(at, w * 1000 + i);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let drained = queue.pop_expired(at);
        assert_eq!(drained.len(), 1000);

        // Same fire time everywhere, so the drain must follow the order counter
        let orders: Vec<u64> = drained.iter().map(Task::order).collect();
        assert!(orders.windows(2).all(|w| w[0] < w[1]));

        // Per-thread FIFO is preserved as well
        let mut last_seen = [None; 4];
        for task in drained {
            let value = task.into_payload();
            let (w, i) = ((value / 1000) as usize, value % 1000);
            if let Some(prev) = last_seen[w] {
                assert!(prev < i);
            }
            last_seen[w] = Some(i);
        }
    }
}

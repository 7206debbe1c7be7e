use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::Instant;

/// Process-wide task sequence. Only the total order of the values matters, so relaxed is enough.
static TASK_ORDER: AtomicU64 = AtomicU64::new(0);

/// Returns the next task order. The first value handed out is 1.
pub(crate) fn next_task_order() -> u64 {
    TASK_ORDER.fetch_add(1, AtomicOrdering::Relaxed) + 1
}

/// A unit of deferred engine work waiting for its fire time.
///
/// The payload is opaque to the scheduler: it is handed back verbatim to the task-expired
/// callback once the task fires.
#[derive(Debug)]
pub struct Task<T> {
    /// Tie-break sequence number, unique per process
    order: u64,
    /// Host monotonic instant after which the task may run
    fire_time: Instant,
    /// Engine supplied token
    payload: T,
}

impl<T> Task<T> {
    /// Creates a task firing at `fire_time`, assigning it the next sequence number.
    pub fn new(fire_time: Instant, payload: T) -> Self {
        Self {
            order: next_task_order(),
            fire_time,
            payload,
        }
    }

    pub fn order(&self) -> u64 {
        self.order
    }

    pub fn fire_time(&self) -> Instant {
        self.fire_time
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn into_payload(self) -> T {
        self.payload
    }

    /// True when the task may be delivered at `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.fire_time <= now
    }
}

// BinaryHeap is a max-heap, so the comparison is reversed: the earliest fire time (and for
// equal fire times the lowest order) compares as the greatest element.
impl<T> Ord for Task<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fire_time
            .cmp(&self.fire_time)
            .then_with(|| other.order.cmp(&self.order))
    }
}

impl<T> PartialOrd for Task<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> PartialEq for Task<T> {
    fn eq(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time && self.order == other.order
    }
}

impl<T> Eq for Task<T> {}

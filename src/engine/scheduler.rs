// src/engine/scheduler.rs
//! Task scheduling: [`TaskQueue`], [`EventLoop`] and the wait/wake strategies.
//!
//! The engine posts tasks from any of its threads with an absolute deadline. The host drains
//! them from its own polling loop on the platform thread, in `(fire_time, order)` order.

mod event_loop;
mod queue;
mod task;
mod wake;

pub use event_loop::{EventLoop, LoopId, TaskExpiredCallback, TaskPoster};
pub use queue::{QueueGuard, QueueState, TaskQueue};
pub use task::Task;
pub use wake::{CondvarWake, HostWake, WakeStrategy, Wakeup};

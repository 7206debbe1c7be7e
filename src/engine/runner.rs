// src/engine/runner.rs
//! Task runners as the engine sees them.
//!
//! The engine does not know about [`EventLoop`]; it only gets a [`TaskRunner`] per role
//! (platform, render) through [`CustomTaskRunners`], and hands tasks back to the embedder
//! through those. Once a task expires, the embedder gives it back to the engine through its
//! [`TaskExecutor`].

use crate::engine::scheduler::{EventLoop, WakeStrategy};
use crate::EngineError;
use std::fmt;
use std::sync::Arc;

/// Engine entry point that executes a previously posted task.
pub trait TaskExecutor<T>: Send + Sync {
    fn run_task(&self, task: &T) -> Result<(), EngineError>;
}

/// The two callbacks an engine needs from a custom task runner.
pub trait TaskRunner<T>: Send + Sync {
    /// Whether the caller is on the thread this runner executes tasks on.
    fn runs_tasks_on_current_thread(&self) -> bool;

    /// Schedules `task` for `target_time_nanos` on the engine clock.
    fn post_task(&self, task: T, target_time_nanos: u64);
}

impl<T, W> TaskRunner<T> for EventLoop<T, W>
where
    T: Send,
    W: WakeStrategy,
{
    fn runs_tasks_on_current_thread(&self) -> bool {
        EventLoop::runs_tasks_on_current_thread(self)
    }

    fn post_task(&self, task: T, target_time_nanos: u64) {
        EventLoop::post_task(self, task, target_time_nanos);
    }
}

/// Task runners handed to the engine at startup.
pub struct CustomTaskRunners<T> {
    pub platform: Arc<dyn TaskRunner<T>>,
    pub render: Arc<dyn TaskRunner<T>>,
}

impl<T> CustomTaskRunners<T> {
    /// Uses one runner for both roles, so rendering happens on the platform thread too.
    pub fn shared(runner: Arc<dyn TaskRunner<T>>) -> Self {
        Self {
            platform: runner.clone(),
            render: runner,
        }
    }

    pub fn render_is_platform(&self) -> bool {
        Arc::ptr_eq(&self.platform, &self.render)
    }
}

impl<T> Clone for CustomTaskRunners<T> {
    fn clone(&self) -> Self {
        Self {
            platform: self.platform.clone(),
            render: self.render.clone(),
        }
    }
}

impl<T> fmt::Debug for CustomTaskRunners<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomTaskRunners")
            .field("render_is_platform", &self.render_is_platform())
            .finish()
    }
}

/// Task-expired callback that hands each task back to the engine.
///
/// A task the engine refuses to run is logged and dropped; the loop carries on with the next
/// one.
pub fn forward_to_executor<T, E>(executor: Arc<E>) -> impl Fn(T) + Send + Sync + 'static
where
    T: fmt::Debug,
    E: TaskExecutor<T> + ?Sized + 'static,
{
    move |task: T| {
        if let Err(e) = executor.run_task(&task) {
            log::error!("Could not run engine task {:?}: {}", task, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct RecordingExecutor {
        ran: Mutex<Vec<u32>>,
    }

    impl TaskExecutor<u32> for RecordingExecutor {
        fn run_task(&self, task: &u32) -> Result<(), EngineError> {
            if *task % 2 == 1 {
                return Err(EngineError::TaskExecution(format!("odd task {task}")));
            }
            self.ran.lock().push(*task);
            Ok(())
        }
    }

    #[test]
    fn failing_tasks_do_not_stop_the_drain() {
        let executor = Arc::new(RecordingExecutor::default());
        let event_loop = EventLoop::new(|| 0u64, forward_to_executor(executor.clone()));

        let at = Instant::now();
        for task in 0..6u32 {
            event_loop.post_task_at(task, at);
        }

        assert_eq!(event_loop.wait_for_events(Some(Duration::ZERO)), 6);
        assert_eq!(*executor.ran.lock(), vec![0, 2, 4]);
        assert_eq!(event_loop.pending_tasks(), 0);
    }

    #[test]
    fn shared_runners_point_to_the_same_loop() {
        let event_loop: Arc<EventLoop<u32>> = Arc::new(EventLoop::new(|| 0u64, |_| {}));
        let runners = CustomTaskRunners::shared(event_loop.clone() as Arc<dyn TaskRunner<u32>>);

        assert!(runners.render_is_platform());
        assert!(runners.platform.runs_tasks_on_current_thread());

        runners.render.post_task(1, 0);
        runners.platform.post_task(2, 0);
        assert_eq!(event_loop.pending_tasks(), 2);
    }

    #[test]
    fn runner_affinity_is_false_elsewhere() {
        let event_loop: Arc<EventLoop<u32>> = Arc::new(EventLoop::new(|| 0u64, |_| {}));
        let runners = CustomTaskRunners::shared(event_loop as Arc<dyn TaskRunner<u32>>);

        let platform = runners.platform.clone();
        let elsewhere = std::thread::spawn(move || platform.runs_tasks_on_current_thread())
            .join()
            .unwrap();
        assert!(!elsewhere);
    }
}

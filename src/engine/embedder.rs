use crate::config::EventLoopConfig;
use crate::engine::clock::EngineClock;
use crate::engine::runner::{forward_to_executor, CustomTaskRunners, TaskExecutor, TaskRunner};
use crate::engine::scheduler::{EventLoop, LoopId, TaskPoster};
use crate::EngineError;
use std::fmt;
use std::sync::Arc;

/// Host side of an embedded engine.
///
/// The embedder owns the platform event loop. It must be created on the thread the host will
/// poll from, since that thread becomes the platform thread. The host calls
/// [`poll_events`](Self::poll_events) once per iteration of its main loop; everything the
/// engine posted and that has come due runs inside that call.
pub struct Embedder<T> {
    /// Configuration this embedder was built with
    config: EventLoopConfig,
    /// Platform (and render) task runner
    event_loop: Arc<EventLoop<T>>,
}

impl<T> fmt::Debug for Embedder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Embedder")
            .field("config", &self.config)
            .field("event_loop", &self.event_loop)
            .finish()
    }
}

impl<T> Embedder<T>
where
    T: fmt::Debug + Send + 'static,
{
    /// Creates an embedder whose expired tasks are handed to `executor`.
    ///
    /// If `config` is `None`, [`EventLoopConfig::default`] is used.
    pub fn new<E>(
        config: Option<EventLoopConfig>,
        clock: impl EngineClock + 'static,
        executor: Arc<E>,
    ) -> Self
    where
        E: TaskExecutor<T> + ?Sized + 'static,
    {
        let config = config.unwrap_or_default();
        let event_loop = Arc::new(EventLoop::new(clock, forward_to_executor(executor)));

        log::debug!(
            "Embedder: event loop {} bound to platform thread '{}'",
            event_loop.id(),
            config.thread_name
        );

        Self { config, event_loop }
    }

    pub fn config(&self) -> &EventLoopConfig {
        &self.config
    }

    pub fn loop_id(&self) -> LoopId {
        self.event_loop.id()
    }

    pub fn event_loop(&self) -> Arc<EventLoop<T>> {
        self.event_loop.clone()
    }

    pub fn poster(&self) -> TaskPoster<T> {
        self.event_loop.poster()
    }

    /// Runners to hand to the engine. Platform and render tasks share the platform thread.
    pub fn task_runners(&self) -> CustomTaskRunners<T> {
        CustomTaskRunners::shared(self.event_loop.clone() as Arc<dyn TaskRunner<T>>)
    }

    pub fn runs_tasks_on_current_thread(&self) -> bool {
        self.event_loop.runs_tasks_on_current_thread()
    }

    /// Posts an engine task due at `target_time_nanos` on the engine clock. Any thread.
    pub fn post_task(&self, task: T, target_time_nanos: u64) -> u64 {
        self.event_loop.post_task(task, target_time_nanos)
    }

    /// One host tick: runs due engine tasks, then waits up to the configured `tick_max_wait`.
    /// Returns the number of tasks run.
    ///
    /// # Panics
    ///
    /// Panics when called off the platform thread; see [`try_poll_events`](Self::try_poll_events).
    pub fn poll_events(&self) -> usize {
        self.event_loop.wait_for_events(self.config.tick_max_wait)
    }

    /// Same as [`poll_events`](Self::poll_events), but reports a call from the wrong thread as
    /// an error instead of panicking.
    pub fn try_poll_events(&self) -> Result<usize, EngineError> {
        if !self.runs_tasks_on_current_thread() {
            log::error!(
                "Embedder[{}]: poll from outside platform thread '{}'",
                self.loop_id(),
                self.config.thread_name
            );
            return Err(EngineError::NotOnPlatformThread);
        }
        Ok(self.poll_events())
    }
}

//! Embedder configuration.
//!
//! `EventLoopConfig` controls how the host drives the engine's task runners: how long a single
//! host tick may block waiting for engine work, how chatty the logs are, and which label the
//! platform thread carries in diagnostics.
//!
//! # Examples
//!
//! ## Use defaults
//! ```rust
//! use gosub_embedder::config::EventLoopConfig;
//! use std::time::Duration;
//! let cfg = EventLoopConfig::default();
//! assert_eq!(cfg.tick_max_wait, Some(Duration::from_millis(1)));
//! ```
//!
//! ## Customize with the builder
//! ```rust
//! use gosub_embedder::config::{EventLoopConfig, LogLevel};
//! use std::time::Duration;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = EventLoopConfig::builder()
//!     .tick_max_wait(Duration::from_millis(16))
//!     .log_level(LogLevel::Debug)
//!     .thread_name("render-host")
//!     .build()?; // returns Result<EventLoopConfig, EventLoopConfigError>
//! # Ok(()) }
//! ```
//!
//! # Errors
//!
//! Builder validation returns [`EventLoopConfigError`] when a bounded `tick_max_wait` is longer
//! than [`MAX_TICK_WAIT`] or the thread name is empty.

use crate::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The host polls once per frame; a single tick should never stall it for longer than this.
pub const MAX_TICK_WAIT: Duration = Duration::from_secs(60);

const DEFAULT_TICK_MAX_WAIT: Duration = Duration::from_millis(1);
const DEFAULT_THREAD_NAME: &str = "platform";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventLoopConfig {
    /// Longest a host tick blocks waiting for engine tasks. `None` waits until a task is due or
    /// a new one is posted.
    pub tick_max_wait: Option<Duration>,
    /// Log level used when the embedder installs the logger
    pub log_level: LogLevel,
    /// Label of the platform thread in log output
    pub thread_name: String,
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            tick_max_wait: Some(DEFAULT_TICK_MAX_WAIT),
            log_level: LogLevel::default(),
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

impl EventLoopConfig {
    pub fn builder() -> EventLoopConfigBuilder {
        EventLoopConfigBuilder::default()
    }

    /// Parses and validates a JSON configuration. Missing fields take their default value.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let cfg: EventLoopConfig = serde_json::from_str(json)?;
        validate(&cfg)?;
        Ok(cfg)
    }
}

/// Builder for [`EventLoopConfig`].
#[derive(Debug, Clone, Default)]
pub struct EventLoopConfigBuilder {
    inner: EventLoopConfig,
}

impl EventLoopConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut EventLoopConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn tick_max_wait(self, wait: Duration) -> Self { self.map(|c| c.tick_max_wait = Some(wait)) }
    pub fn unbounded_tick(self) -> Self { self.map(|c| c.tick_max_wait = None) }
    pub fn non_blocking(self) -> Self { self.map(|c| c.tick_max_wait = Some(Duration::ZERO)) }
    pub fn log_level(self, level: LogLevel) -> Self { self.map(|c| c.log_level = level) }
    pub fn thread_name<S: Into<String>>(self, name: S) -> Self { self.map(|c| c.thread_name = name.into()) }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut EventLoopConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<EventLoopConfig, EventLoopConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq)]
pub enum EventLoopConfigError {
    TickTooLong(Duration),
    EmptyThreadName,
}

impl fmt::Display for EventLoopConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventLoopConfigError::TickTooLong(d) =>
                write!(f, "tick_max_wait {d:?} is too long (expected at most {MAX_TICK_WAIT:?})"),
            EventLoopConfigError::EmptyThreadName =>
                write!(f, "thread_name must not be empty"),
        }
    }
}
impl std::error::Error for EventLoopConfigError {}

fn validate(c: &EventLoopConfig) -> Result<(), EventLoopConfigError> {
    if let Some(wait) = c.tick_max_wait {
        if wait > MAX_TICK_WAIT {
            return Err(EventLoopConfigError::TickTooLong(wait));
        }
    }
    if c.thread_name.trim().is_empty() {
        return Err(EventLoopConfigError::EmptyThreadName);
    }
    Ok(())
}

// src/engine.rs
//! Embedding layer: the platform event loop that drives the engine's task runners from the
//! host's polling loop, plus the pieces around it (clocks, runners, configuration, logging).

pub mod clock;
pub mod config;
pub mod embedder;
pub mod errors;
pub mod logging;
pub mod runner;
pub mod scheduler;

pub use clock::{EngineClock, SystemEngineClock};
pub use config::EventLoopConfig;
pub use embedder::Embedder;
pub use errors::EngineError;
pub use runner::{CustomTaskRunners, TaskExecutor, TaskRunner};
pub use scheduler::{EventLoop, LoopId, TaskPoster};

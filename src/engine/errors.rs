use crate::engine::config::EventLoopConfigError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Engine failed to run task: {0}")]
    TaskExecution(String),

    #[error("Not on the platform thread")]
    NotOnPlatformThread,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] EventLoopConfigError),

    #[error("Cannot parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Configuration is not valid UTF-8: {0}")]
    ConfigEncoding(#[from] std::str::Utf8Error),

    #[error("Null embedder handle")]
    NullHandle,
}

use crate::config::LogLevel;

/// Installs `env_logger` as the log backend at the given level.
///
/// `RUST_LOG` still overrides the level per module. Installing twice is harmless: the host may
/// already have set up its own logger, in which case this does nothing.
pub fn init(level: LogLevel) {
    let res = env_logger::Builder::new()
        .filter_level(level.into())
        .parse_default_env()
        .try_init();

    if res.is_err() {
        log::debug!("Logger already installed, keeping the existing one");
    }
}

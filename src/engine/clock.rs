//! Engine and host clocks.
//!
//! The engine expresses task deadlines as nanoseconds on its own clock, while the scheduler runs
//! on the host's monotonic [`Instant`]. [`host_time_from_engine_time`] re-anchors an engine
//! deadline onto the host clock by keeping the distance between the engine's "now" and the
//! target.

use std::time::{Duration, Instant};

/// Upper bound for a deadline that does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Source of the engine's current time, in nanoseconds since an engine defined epoch.
///
/// Implemented for any `Fn() -> u64`, so an engine entry point such as `get_current_time` can
/// be passed directly.
pub trait EngineClock: Send + Sync {
    fn now_nanos(&self) -> u64;
}

impl<F> EngineClock for F
where
    F: Fn() -> u64 + Send + Sync,
{
    fn now_nanos(&self) -> u64 {
        self()
    }
}

/// Engine clock counting from the moment it was created. Handy when the engine lets the
/// embedder define the time source.
#[derive(Debug, Clone, Copy)]
pub struct SystemEngineClock {
    epoch: Instant,
}

impl Default for SystemEngineClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemEngineClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl EngineClock for SystemEngineClock {
    fn now_nanos(&self) -> u64 {
        // u64 nanoseconds cover more than 500 years
        u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

/// Converts an engine deadline into a host instant: `host_now + (target - engine_now)`.
///
/// Deadlines already in the engine's past land in the host's past and fire on the next drain.
pub fn host_time_from_engine_time(target_nanos: u64, engine_now_nanos: u64, host_now: Instant) -> Instant {
    if target_nanos >= engine_now_nanos {
        let ahead = Duration::from_nanos(target_nanos - engine_now_nanos);
        host_now
            .checked_add(ahead)
            .or_else(|| host_now.checked_add(FAR_FUTURE))
            .unwrap_or(host_now)
    } else {
        let behind = Duration::from_nanos(engine_now_nanos - target_nanos);
        host_now.checked_sub(behind).unwrap_or(host_now)
    }
}

use std::time::{
    Duration,
    Instant,
};

/// Source of time for rate limit bookkeeping
pub trait Clock {
    fn now(&self) -> Instant;

    /// Blocks the calling thread for `duration`
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant { Instant::now() }

    fn sleep(&self, duration: Duration) { std::thread::sleep(duration) }
}

use std::time::{
    Duration,
    Instant,
};

use reqwest::header::HeaderMap;

pub const HEADER_REMAINING: &str = "X-RateLimit-Remaining";
pub const HEADER_RESET_IN: &str = "X-RateLimit-Reset-In";


/// Rate limit information sent along with every response
///
/// Missing or unparsable headers count as `0`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Requests left in the current window
    pub remaining: u64,
    /// Seconds until the window resets
    pub reset_in: u64,
}

impl RateLimit {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0)
        };
        Self {
            remaining: read(HEADER_REMAINING),
            reset_in: read(HEADER_RESET_IN),
        }
    }
}


/// Earliest time the next request may be sent. Starts out unrestricted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitState {
    next_request: Option<Instant>,
}

impl RateLimitState {
    pub fn next_request(&self) -> Option<Instant> { self.next_request }

    /// How long to wait at `now` before sending, if at all
    pub fn delay(&self, now: Instant) -> Option<Duration> {
        self.next_request
            .and_then(|next| next.checked_duration_since(now))
            .filter(|d| !d.is_zero())
    }

    /// Records the rate limit reported by a response received at `now`
    ///
    /// Only an exhausted quota moves the next allowed request time; otherwise the state is left alone.
    /// A reset time too far out to represent is treated like a missing one.
    pub fn update(&mut self, headers: &HeaderMap, now: Instant) -> RateLimit {
        let limit = RateLimit::from_headers(headers);
        if limit.remaining == 0 {
            self.next_request = now.checked_add(Duration::from_secs(limit.reset_in));
        }
        limit
    }
}

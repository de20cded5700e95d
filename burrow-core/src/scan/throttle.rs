use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tracing::trace;

pub const THROTTLE_WINDOW: Duration = Duration::from_secs(1);

/// Per-worker fixed-window rate limiter: at most `limit` requests per
/// window. A limit of zero never waits.
#[derive(Debug)]
pub struct Throttle {
    limit: u32,
    window: Duration,
    window_start: Option<Instant>,
    used: u32,
}

impl Throttle {
    pub fn new(limit: u32) -> Self {
        Self::with_window(limit, THROTTLE_WINDOW)
    }

    pub fn with_window(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            window_start: None,
            used: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.limit > 0
    }

    /// Waits until the current window has room for one more request
    pub async fn acquire(&mut self) {
        if !self.is_enabled() {
            return;
        }

        let now = Instant::now();
        match self.window_start {
            Some(start) if now.duration_since(start) < self.window => {
                if self.used >= self.limit {
                    let reset = start + self.window;
                    trace!("Throttle window full, sleeping {:?}", reset - now);
                    sleep_until(reset).await;
                    self.window_start = Some(Instant::now());
                    self.used = 0;
                }
            }
            _ => {
                self.window_start = Some(now);
                self.used = 0;
            }
        }
        self.used += 1;
    }
}

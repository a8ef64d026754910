use log::debug;
use std::time::{Duration, Instant};

pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

/// Decides how long to wait around each generation request.
pub trait Pacer {
    /// Called right before a request is sent.
    fn before_request(&mut self) {}

    /// Called after every request, whether or not it produced usable velocities.
    fn after_request(&mut self, _succeeded: bool) {}
}

/// Never waits. Useful for local models and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Pacer for NoDelay {}

/// Sleeps a fixed amount after every request.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Pacer for FixedDelay {
    fn after_request(&mut self, _succeeded: bool) {
        if !self.delay.is_zero() {
            spin_sleep::sleep(self.delay);
        }
    }
}

/// Allows bursts of up to `capacity` requests, refilled continuously.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        let capacity = capacity.max(1) as f64;
        Self {
            capacity,
            refill_per_sec: refill_per_sec.max(f64::EPSILON),
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    /// Time until one whole token is available.
    fn wait_time(&self) -> Duration {
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / self.refill_per_sec)
        }
    }
}

impl Pacer for TokenBucket {
    fn before_request(&mut self) {
        self.refill();

        let wait = self.wait_time();
        if !wait.is_zero() {
            debug!("Rate limited, waiting {:.3}s for a token..!", wait.as_secs_f64());
            spin_sleep::sleep(wait);
            self.refill();
        }

        self.tokens = (self.tokens - 1.0).max(0.0);
    }
}

/// Waits `base` after a success and doubles the wait after each consecutive failure.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            current: base,
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    fn next_delay(&mut self, succeeded: bool) -> Duration {
        self.current = if succeeded {
            self.base
        } else {
            (self.current * 2).max(self.base).min(self.max)
        };
        self.current
    }
}

impl Pacer for Backoff {
    fn after_request(&mut self, succeeded: bool) {
        let delay = self.next_delay(succeeded);
        if !delay.is_zero() {
            debug!("Backing off for {:.3}s..!", delay.as_secs_f64());
            spin_sleep::sleep(delay);
        }
    }
}

//! Sliding-window request and token observation per provider.
//!
//! ```rust
//! use dprovider::{RateLimits, RateMonitor};
//!
//! let monitor = RateMonitor::new(RateLimits::new(15, 1_000_000));
//! monitor.record(120, 480);
//!
//! let stats = monitor.stats();
//! assert_eq!(stats.request_count, 1);
//! assert_eq!(stats.token_count, 600);
//! assert_eq!(stats.request_limit, 15);
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

pub const RATE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub requests_per_minute: u32,
    pub tokens_per_minute: u64,
}

impl RateLimits {
    pub fn new(requests_per_minute: u32, tokens_per_minute: u64) -> Self {
        Self {
            requests_per_minute,
            tokens_per_minute,
        }
    }
}

impl Default for RateLimits {
    fn default() -> Self {
        Self::new(15, 1_000_000)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateStats {
    pub request_count: u32,
    pub token_count: u64,
    pub request_limit: u32,
    pub token_limit: u64,
}

impl RateStats {
    pub fn request_ratio(&self) -> f64 {
        ratio(self.request_count as f64, self.request_limit as f64)
    }

    pub fn token_ratio(&self) -> f64 {
        ratio(self.token_count as f64, self.token_limit as f64)
    }
}

fn ratio(used: f64, limit: f64) -> f64 {
    if limit <= 0.0 { 0.0 } else { used / limit }
}

#[derive(Debug, Clone, Copy)]
struct RateSample {
    at: Instant,
    prompt_tokens: u32,
    output_tokens: u32,
}

impl RateSample {
    fn total(&self) -> u64 {
        self.prompt_tokens as u64 + self.output_tokens as u64
    }
}

/// Observational only: nothing here blocks or throttles callers.
#[derive(Debug)]
pub struct RateMonitor {
    limits: RateLimits,
    window: Duration,
    samples: Mutex<VecDeque<RateSample>>,
}

impl Default for RateMonitor {
    fn default() -> Self {
        Self::new(RateLimits::default())
    }
}

impl RateMonitor {
    pub fn new(limits: RateLimits) -> Self {
        Self {
            limits,
            window: RATE_WINDOW,
            samples: Mutex::new(VecDeque::new()),
        }
    }

    pub fn limits(&self) -> RateLimits {
        self.limits
    }

    pub fn record(&self, prompt_tokens: u32, output_tokens: u32) {
        self.record_at(Instant::now(), prompt_tokens, output_tokens);
    }

    /// Records a sample at an explicit instant. Instants must be
    /// non-decreasing across calls so the queue stays sorted.
    pub fn record_at(&self, at: Instant, prompt_tokens: u32, output_tokens: u32) {
        let mut samples = self.samples_guard();
        samples.push_back(RateSample {
            at,
            prompt_tokens,
            output_tokens,
        });
        evict(&mut samples, at, self.window);
    }

    pub fn stats(&self) -> RateStats {
        self.stats_at(Instant::now())
    }

    pub fn stats_at(&self, now: Instant) -> RateStats {
        let mut samples = self.samples_guard();
        evict(&mut samples, now, self.window);

        RateStats {
            request_count: samples.len() as u32,
            token_count: samples.iter().map(RateSample::total).sum(),
            request_limit: self.limits.requests_per_minute,
            token_limit: self.limits.tokens_per_minute,
        }
    }

    fn samples_guard(&self) -> MutexGuard<'_, VecDeque<RateSample>> {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn evict(samples: &mut VecDeque<RateSample>, now: Instant, window: Duration) {
    while let Some(front) = samples.front() {
        if now.saturating_duration_since(front.at) <= window {
            break;
        }
        samples.pop_front();
    }
}

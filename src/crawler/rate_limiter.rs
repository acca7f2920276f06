//! Call pacing for remote requests
//!
//! This module handles:
//! - Minimum spacing between consecutive calls
//! - A maximum number of calls inside a sliding time window
//!
//! One limiter is built per crawl task and every remote call of that task
//! goes through it, in call order.

use crate::config::RateLimitConfig;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Smallest sleep taken while waiting for the window to free up
const MIN_BACKOFF: Duration = Duration::from_millis(100);

/// Pacing limits; a zero value disables that limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Maximum calls in any window; 0 disables the count limit
    pub max_per_window: u32,

    /// Length of the sliding window
    pub window: Duration,

    /// Minimum time between consecutive calls; zero disables spacing
    pub min_interval: Duration,
}

impl RateLimitPolicy {
    /// A policy that never waits
    pub const DISABLED: Self = Self {
        max_per_window: 0,
        window: Duration::ZERO,
        min_interval: Duration::ZERO,
    };

    /// Builds a policy from the `[rate-limit]` section
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            max_per_window: config.max_per_window,
            window: Duration::from_secs(config.window_seconds),
            min_interval: Duration::try_from_secs_f64(config.min_interval)
                .unwrap_or(Duration::ZERO),
        }
    }

    /// Returns true if neither limit applies
    pub fn is_disabled(&self) -> bool {
        !self.counts_calls() && self.min_interval.is_zero()
    }

    fn counts_calls(&self) -> bool {
        self.max_per_window > 0 && !self.window.is_zero()
    }
}

/// Sliding-window and spacing limiter
///
/// `wait` suspends the caller until the next call is allowed and then records
/// it. After `wait` returns, the number of recorded calls inside
/// `[now - window, now]` is at most `max_per_window`, and no two calls are
/// closer than `min_interval`.
///
/// The limiter takes `&mut self`: it belongs to a single crawl task.
#[derive(Debug)]
pub struct RateLimiter {
    policy: RateLimitPolicy,

    /// Call timestamps inside the current window, oldest first
    calls: VecDeque<Instant>,

    last_call: Option<Instant>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            calls: VecDeque::new(),
            last_call: None,
        }
    }

    /// A limiter that returns immediately
    pub fn disabled() -> Self {
        Self::new(RateLimitPolicy::DISABLED)
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Waits until a call is allowed, records it and returns its timestamp
    ///
    /// # Algorithm
    ///
    /// 1. If spacing is enabled and a previous call exists, sleep out the rest
    ///    of `min_interval`
    /// 2. If the count limit is enabled, drop timestamps that left the window;
    ///    while the window is still full, sleep until the oldest one leaves
    ///    (at least `MIN_BACKOFF`) and trim again
    /// 3. Record `now` as the call time
    pub async fn wait(&mut self) -> Instant {
        if self.policy.is_disabled() {
            let now = Instant::now();
            self.last_call = Some(now);
            return now;
        }

        if !self.policy.min_interval.is_zero() {
            if let Some(last) = self.last_call {
                let elapsed = Instant::now().saturating_duration_since(last);
                if elapsed < self.policy.min_interval {
                    sleep(self.policy.min_interval - elapsed).await;
                }
            }
        }

        if self.policy.counts_calls() {
            let max = self.policy.max_per_window as usize;
            loop {
                let now = Instant::now();
                self.trim(now);
                if self.calls.len() < max {
                    break;
                }

                let Some(&oldest) = self.calls.front() else {
                    break;
                };
                let until_free = (oldest + self.policy.window).saturating_duration_since(now);
                let backoff = until_free.max(MIN_BACKOFF);
                tracing::debug!(
                    "Rate limit reached ({} calls in {:?}), waiting {:?}",
                    self.calls.len(),
                    self.policy.window,
                    backoff
                );
                sleep(backoff).await;
            }
        }

        let now = Instant::now();
        if self.policy.counts_calls() {
            self.calls.push_back(now);
        }
        self.last_call = Some(now);
        now
    }

    /// Drops timestamps that are at least one window old
    fn trim(&mut self, now: Instant) {
        while let Some(&oldest) = self.calls.front() {
            if now.saturating_duration_since(oldest) >= self.policy.window {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }

    /// Number of recorded calls still inside the window
    pub fn calls_in_window(&self) -> usize {
        self.calls.len()
    }
}

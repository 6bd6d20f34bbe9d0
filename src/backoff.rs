// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Bounded polling with exponential backoff.
//!
//! Debug pods are created asynchronously, by the cluster in direct mode and
//! by the squash agent in secure mode. squashctl has no event subscription,
//! so it waits a grace period and then polls, backing off between attempts,
//! until the condition holds or the deadline passes.

use crate::constants::{
    POD_POLL_INITIAL_INTERVAL_MILLIS, POD_POLL_MAX_INTERVAL_SECS, POD_POLL_MULTIPLIER,
    SECURE_MODE_GRACE_PERIOD_SECS,
};
use std::time::{Duration, Instant};

/// Exponential backoff without jitter; a single CLI process has no herd to spread.
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    current_interval: Duration,
    max_interval: Duration,
    multiplier: u32,
}

impl ExponentialBackoff {
    #[must_use]
    pub fn new(initial_interval: Duration, max_interval: Duration, multiplier: u32) -> Self {
        Self {
            current_interval: initial_interval,
            max_interval,
            multiplier,
        }
    }

    /// The next interval to sleep; grows by `multiplier` up to `max_interval`.
    pub fn next_backoff(&mut self) -> Duration {
        let interval = self.current_interval;
        self.current_interval = interval
            .saturating_mul(self.multiplier)
            .min(self.max_interval);
        interval
    }
}

/// How long to wait for an asynchronously created pod, and how often to look.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Sleep before the first look
    pub grace_period: Duration,
    /// First interval between looks
    pub initial_interval: Duration,
    /// Cap on the interval between looks
    pub max_interval: Duration,
    /// Total time allowed, grace period included
    pub timeout: Duration,
}

impl WaitPolicy {
    /// Default schedule with the given overall timeout.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            grace_period: Duration::from_secs(SECURE_MODE_GRACE_PERIOD_SECS),
            initial_interval: Duration::from_millis(POD_POLL_INITIAL_INTERVAL_MILLIS),
            max_interval: Duration::from_secs(POD_POLL_MAX_INTERVAL_SECS),
            timeout,
        }
    }

    /// A fresh backoff following this policy's intervals.
    #[must_use]
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(
            self.initial_interval,
            self.max_interval,
            POD_POLL_MULTIPLIER,
        )
    }

    /// Start a wait: sleeps the grace period and returns the deadline tracker.
    pub async fn start(&self) -> Deadline {
        let started = Instant::now();
        tokio::time::sleep(self.grace_period).await;
        Deadline {
            started,
            timeout: self.timeout,
            backoff: self.backoff(),
        }
    }
}

/// Tracks one wait started by [`WaitPolicy::start`].
#[derive(Debug)]
pub struct Deadline {
    started: Instant,
    timeout: Duration,
    backoff: ExponentialBackoff,
}

impl Deadline {
    /// Time spent since the wait started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Sleep until the next look. Returns `false` once the deadline has passed.
    pub async fn wait_next(&mut self) -> bool {
        let elapsed = self.elapsed();
        if elapsed >= self.timeout {
            return false;
        }
        let remaining = self.timeout - elapsed;
        tokio::time::sleep(self.backoff.next_backoff().min(remaining)).await;
        true
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod backoff_tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-request retry bookkeeping and the network backoff schedule.

use std::time::Duration;

/// Retry budget and backoff for connection failures and timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub max_network_retries: u32,
    pub base: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self { max_network_retries: 2, base: Duration::from_secs(1) }
    }
}

impl BackoffPolicy {
    /// Delay before network retry number `retry` (1-based): `base * 2^retry`.
    pub fn delay(&self, retry: u32) -> Duration {
        self.base.saturating_mul(2u32.saturating_pow(retry))
    }
}

/// Retry state carried by one original request across all its attempts.
///
/// Auth recovery and network retries are tracked independently: a request
/// may refresh once and still use its full network budget, in either order.
#[derive(Debug, Default)]
pub struct Attempt {
    refresh_attempted: bool,
    network_retries: u32,
    token: Option<String>,
}

impl Attempt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh_attempted(&self) -> bool {
        self.refresh_attempted
    }

    pub fn mark_refresh_attempted(&mut self) {
        self.refresh_attempted = true;
    }

    pub fn network_retries(&self) -> u32 {
        self.network_retries
    }

    /// Consume one network retry. Returns the delay to wait, or `None` once
    /// the budget is spent.
    pub fn next_network_retry(&mut self, policy: &BackoffPolicy) -> Option<Duration> {
        if self.network_retries >= policy.max_network_retries {
            return None;
        }
        self.network_retries += 1;
        Some(policy.delay(self.network_retries))
    }

    /// Pin the token handed back by a refresh; later attempts send it
    /// instead of re-reading the store.
    pub fn use_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;

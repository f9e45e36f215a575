// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sliding-window throttle per (admin identity, action kind).

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::auth::roles::Action;
use crate::config::{DEFAULT_RATE_LIMIT_MAX_ACTIONS, DEFAULT_RATE_LIMIT_WINDOW_SECS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Actions allowed per window for one (actor, action) pair.
    pub max_actions: usize,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_actions: DEFAULT_RATE_LIMIT_MAX_ACTIONS,
            window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
        }
    }
}

/// Denied attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimited {
    pub retry_after_secs: u64,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    windows: DashMap<(String, Action), VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Record an attempt, or deny it if the window is full. Denied attempts
    /// are not counted.
    pub fn check(&self, actor_id: &str, action: Action) -> Result<(), RateLimited> {
        self.check_at(actor_id, action, Instant::now())
    }

    fn check_at(&self, actor_id: &str, action: Action, now: Instant) -> Result<(), RateLimited> {
        let mut times = self
            .windows
            .entry((actor_id.to_string(), action))
            .or_default();

        // Remove old timestamps outside the window
        while let Some(front) = times.front() {
            if now.duration_since(*front) >= self.config.window {
                times.pop_front();
            } else {
                break;
            }
        }

        if times.len() < self.config.max_actions {
            times.push_back(now);
            return Ok(());
        }

        let oldest = times.front().copied().unwrap_or(now);
        let remaining = self
            .config
            .window
            .saturating_sub(now.duration_since(oldest));
        let retry_after_secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
        Err(RateLimited {
            retry_after_secs: retry_after_secs.max(1),
        })
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-client token-bucket rate limiting.
//!
//! One bucket per client address, created full on first sight. Buckets are
//! never evicted, so the map grows by one entry per distinct address for the
//! lifetime of the process.

use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Credit is kept in nanoseconds of refill time so that refill and consume
/// are exact integer arithmetic: one token costs `refill_interval`.
#[derive(Debug, Clone, Copy)]
struct TokenBucket {
    credit: u128,
    last_refill: Instant,
}

/// Keyed token-bucket limiter. Refill rate and burst are fixed at creation.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<String, TokenBucket>,
    /// Time to regain one token
    refill_interval: Duration,
    burst: u32,
}

impl RateLimiter {
    pub fn new(refill_interval: Duration, burst: u32) -> Self {
        Self {
            buckets: DashMap::new(),
            refill_interval,
            burst,
        }
    }

    /// Try to take a token for `key`.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        let cost = self.refill_interval.as_nanos();
        let capacity = cost * u128::from(self.burst);

        // The entry guard holds the shard lock, so lookup-or-create and the
        // consume below happen atomically for concurrent callers.
        let mut bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket {
                credit: capacity,
                last_refill: now,
            });

        let elapsed = now.saturating_duration_since(bucket.last_refill);
        if !elapsed.is_zero() {
            bucket.credit = (bucket.credit + elapsed.as_nanos()).min(capacity);
            bucket.last_refill = now;
        }

        if self.burst > 0 && bucket.credit >= cost {
            bucket.credit -= cost;
            true
        } else {
            false
        }
    }

    /// Retry hint sent with rejections: one full refill interval.
    pub fn retry_after(&self) -> String {
        self.refill_interval.as_secs().max(1).to_string()
    }

    /// Number of addresses with a bucket.
    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }
}

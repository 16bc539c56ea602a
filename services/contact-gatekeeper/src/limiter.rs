// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-client token bucket rate limiting.
//!
//! Every client identity gets its own bucket, created lazily the first time
//! the identity is seen. The registry map sits behind a reader/writer lock and
//! each bucket behind its own mutex, so lookups for known clients run in
//! parallel while a single client cannot spend the same token twice.

use crate::config::RateLimitConfig;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug)]
struct BucketState {
    /// Available tokens, always within [0, capacity]
    tokens: f64,
    /// Last time tokens were refilled
    last_refill: Instant,
}

/// Token bucket for a single client.
#[derive(Debug)]
pub struct TokenBucket {
    /// Token refill rate per second
    refill_rate: f64,
    /// Maximum tokens (bucket capacity)
    capacity: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Create a full bucket. `capacity` is raised to 1 if given as 0.
    pub fn new(refill_rate: f64, capacity: u32) -> Self {
        Self::new_at(refill_rate, capacity, Instant::now())
    }

    /// Create a full bucket whose refill clock starts at `now`.
    pub fn new_at(refill_rate: f64, capacity: u32, now: Instant) -> Self {
        let capacity = capacity.max(1) as f64;
        Self {
            refill_rate,
            capacity,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: now,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BucketState> {
        // The state is valid after every statement, so a poisoned lock is safe to reuse.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Refill, then try to consume one token.
    pub fn allow(&self) -> bool {
        self.allow_at(Instant::now())
    }

    /// Same as [`allow`](Self::allow) against a caller-supplied instant.
    pub fn allow_at(&self, now: Instant) -> bool {
        let mut state = self.lock();
        self.refill(&mut state, now);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        // saturating: an instant before last_refill adds nothing
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_rate).min(self.capacity);
        if now > state.last_refill {
            state.last_refill = now;
        }
    }

    /// Whole tokens currently available, without refilling.
    pub fn remaining(&self) -> u32 {
        self.lock().tokens.floor() as u32
    }

    /// Time until the next token is available, without refilling.
    /// Saturates at [`Duration::MAX`] for rates too small to represent.
    pub fn retry_after(&self) -> Duration {
        let tokens = self.lock().tokens;
        if tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f64((1.0 - tokens) / self.refill_rate)
                .unwrap_or(Duration::MAX)
        }
    }

    /// Whether a refill at `now` would bring the bucket back to capacity.
    /// Does not touch the stored state.
    pub fn is_full_at(&self, now: Instant) -> bool {
        let state = self.lock();
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.tokens + elapsed * self.refill_rate >= self.capacity
    }

    /// Last time this bucket was touched by an admission check.
    pub fn last_refill(&self) -> Instant {
        self.lock().last_refill
    }

    /// Bucket capacity.
    pub fn capacity(&self) -> u32 {
        self.capacity as u32
    }
}

/// Registry of per-client token buckets.
///
/// Construct one per process (or per test) and hand it to the middleware.
#[derive(Debug)]
pub struct LimiterRegistry {
    refill_rate: f64,
    capacity: u32,
    buckets: RwLock<HashMap<String, Arc<TokenBucket>>>,
}

impl LimiterRegistry {
    /// Create an empty registry where each new bucket refills at `refill_rate`
    /// tokens per second up to `capacity`.
    pub fn new(refill_rate: f64, capacity: u32) -> Self {
        Self {
            refill_rate,
            capacity,
            buckets: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.rate_per_sec, config.burst)
    }

    /// Return the bucket for `client_id`, creating it on first use.
    pub async fn get_or_create(&self, client_id: &str) -> Arc<TokenBucket> {
        {
            let buckets = self.buckets.read().await;
            if let Some(bucket) = buckets.get(client_id) {
                return Arc::clone(bucket);
            }
        }

        let mut buckets = self.buckets.write().await;
        // Another task may have inserted while we waited for the write lock.
        if let Some(bucket) = buckets.get(client_id) {
            return Arc::clone(bucket);
        }

        debug!(client = %client_id, "Creating rate limit bucket");
        let bucket = Arc::new(TokenBucket::new(self.refill_rate, self.capacity));
        buckets.insert(client_id.to_string(), Arc::clone(&bucket));
        bucket
    }

    /// Refill-and-consume for `client_id`. Returns the bucket along with the
    /// decision so callers can report `retry_after`.
    pub async fn check(&self, client_id: &str) -> (bool, Arc<TokenBucket>) {
        let bucket = self.get_or_create(client_id).await;
        let allowed = bucket.allow();
        (allowed, bucket)
    }

    /// Drop buckets that have not been touched within `max_idle` and would be
    /// full again by now. A replacement bucket starts full, so dropping only
    /// those never hands a client more tokens than it would have had. Buckets
    /// still held by an in-flight request are kept. Returns how many were removed.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        self.evict_idle_at(max_idle, Instant::now()).await
    }

    pub async fn evict_idle_at(&self, max_idle: Duration, now: Instant) -> usize {
        let mut buckets = self.buckets.write().await;
        let before = buckets.len();
        buckets.retain(|_, bucket| {
            let idle = now.saturating_duration_since(bucket.last_refill()) >= max_idle;
            // The write lock stops new clones, so a count of one means no caller holds it.
            let unused = Arc::strong_count(bucket) == 1;
            !(idle && unused && bucket.is_full_at(now))
        });
        let evicted = before - buckets.len();
        if evicted > 0 {
            debug!(evicted, remaining = buckets.len(), "Evicted idle rate limit buckets");
        }
        evicted
    }

    /// Number of tracked client identities.
    pub async fn len(&self) -> usize {
        self.buckets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.buckets.read().await.is_empty()
    }
}

//! Token-bucket rate limiter with request queuing
//!
//! Tokens refill continuously based on elapsed time rather than in window
//! steps, so short bursts after a quiet period are admitted up to the
//! configured bucket capacity. When the bucket is empty, callers either
//! queue (FIFO) for the next token or receive an immediate rejection with a
//! backoff hint.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::RateLimitConfig;
use crate::{Result, TaskWeaveError};

struct BucketState {
    /// Current token count. Invariant: 0.0 <= tokens <= burst_size.
    tokens: f64,
    /// Last time tokens were refilled
    last_refill: Instant,
    /// Waiters in FIFO arrival order
    queue: VecDeque<oneshot::Sender<Result<()>>>,
    /// Whether a drain timer is currently scheduled
    drain_armed: bool,
    /// Incremented on reset; stale drain timers check this and bail
    generation: u64,
}

/// Token-bucket rate limiter for one (organization, provider) pair
///
/// `acquire` is the only suspending operation; everything else completes as
/// soon as the state lock is available. Independent limiter instances share
/// no state.
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Arc<Mutex<BucketState>>,
}

impl RateLimiter {
    /// Create a limiter with a full bucket
    pub fn new(config: RateLimitConfig) -> Self {
        let state = BucketState {
            tokens: config.burst_size as f64,
            last_refill: Instant::now(),
            queue: VecDeque::new(),
            drain_armed: false,
            generation: 0,
        };
        Self {
            config,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// The configuration this limiter enforces
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn refill(config: &RateLimitConfig, state: &mut BucketState, now: Instant) {
        let elapsed_ms = now.duration_since(state.last_refill).as_secs_f64() * 1000.0;
        let refilled = elapsed_ms / config.window_ms as f64 * config.max_requests as f64;
        state.tokens = (state.tokens + refilled).min(config.burst_size as f64);
        state.last_refill = now;
    }

    fn time_for_one(config: &RateLimitConfig, state: &BucketState) -> Duration {
        if state.tokens >= 1.0 {
            return Duration::ZERO;
        }
        let needed = 1.0 - state.tokens;
        let wait_ms = needed * config.window_ms as f64 / config.max_requests as f64;
        Duration::from_secs_f64(wait_ms / 1000.0)
    }

    /// Take a token if one is available, without waiting
    pub async fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().await;
        Self::refill(&self.config, &mut state, Instant::now());
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Acquire a token, queuing for one if the bucket is empty
    ///
    /// Queued callers are granted tokens in FIFO arrival order. With queuing
    /// disabled, or when the queue is at capacity, this rejects immediately
    /// with a retryable error carrying the time until the next token. A
    /// queued caller waits indefinitely until a token arrives or
    /// [`reset`](Self::reset) rejects it.
    pub async fn acquire(&self) -> Result<()> {
        let rx = {
            let mut state = self.state.lock().await;
            Self::refill(&self.config, &mut state, Instant::now());

            // Fast path: token available and nobody queued ahead of us.
            if state.queue.is_empty() && state.tokens >= 1.0 {
                state.tokens -= 1.0;
                return Ok(());
            }

            let wait = Self::time_for_one(&self.config, &state);
            let retry_after_ms = wait.as_millis() as u64;

            if !self.config.queue_enabled {
                return Err(TaskWeaveError::RateLimitExceeded { retry_after_ms });
            }
            if state.queue.len() >= self.config.max_queue_size {
                warn!(
                    queue_len = state.queue.len(),
                    retry_after_ms, "Rate limiter queue full"
                );
                return Err(TaskWeaveError::QueueFull { retry_after_ms });
            }

            let (tx, rx) = oneshot::channel();
            state.queue.push_back(tx);
            if !state.drain_armed {
                state.drain_armed = true;
                self.arm_drain(state.generation, wait);
            }
            rx
        };

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(TaskWeaveError::Other(
                "Rate limiter dropped while waiting for a token".to_string(),
            )),
        }
    }

    /// Schedule a single wake-up at the time the next token becomes
    /// available, re-armed after each drain while waiters remain.
    fn arm_drain(&self, generation: u64, wait: Duration) {
        let state = Arc::clone(&self.state);
        let config = self.config.clone();
        tokio::spawn(async move {
            let mut wait = wait;
            loop {
                tokio::time::sleep(wait).await;

                let mut s = state.lock().await;
                if s.generation != generation {
                    // Limiter was reset while we slept; the queue we were
                    // draining no longer exists.
                    return;
                }
                Self::refill(&config, &mut s, Instant::now());

                while s.tokens >= 1.0 {
                    match s.queue.pop_front() {
                        Some(tx) => {
                            s.tokens -= 1.0;
                            if tx.send(Ok(())).is_err() {
                                // Waiter gave up; return the token.
                                s.tokens += 1.0;
                            }
                        }
                        None => break,
                    }
                }

                if s.queue.is_empty() {
                    s.drain_armed = false;
                    return;
                }
                wait = Self::time_for_one(&config, &s);
                debug!(
                    waiters = s.queue.len(),
                    next_wake_ms = wait.as_millis() as u64,
                    "Rate limiter drain re-armed"
                );
            }
        });
    }

    /// Whole tokens currently available
    pub async fn remaining_tokens(&self) -> u32 {
        let mut state = self.state.lock().await;
        Self::refill(&self.config, &mut state, Instant::now());
        state.tokens as u32
    }

    /// Time until at least one token is available
    pub async fn time_until_next_token(&self) -> Duration {
        let mut state = self.state.lock().await;
        Self::refill(&self.config, &mut state, Instant::now());
        Self::time_for_one(&self.config, &state)
    }

    /// Restore a full bucket and reject all queued waiters
    ///
    /// This is a hard cutover: pending waiters receive a rate-limit error
    /// rather than being drained against the restored bucket.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.tokens = self.config.burst_size as f64;
        state.last_refill = Instant::now();
        state.generation += 1;
        state.drain_armed = false;

        let rejected = state.queue.len();
        while let Some(tx) = state.queue.pop_front() {
            let _ = tx.send(Err(TaskWeaveError::RateLimitExceeded { retry_after_ms: 0 }));
        }
        if rejected > 0 {
            debug!(rejected, "Rate limiter reset rejected queued waiters");
        }
    }
}

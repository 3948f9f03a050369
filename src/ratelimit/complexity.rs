//! Point-cost budget tracking for complexity-metered APIs
//!
//! GraphQL providers meter query complexity in points alongside the plain
//! request-rate quota. The budget resets on a fixed window; the reset is
//! checked lazily on every read and write rather than by a timer.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Fixed budget reset window
const RESET_WINDOW: Duration = Duration::from_secs(60);

struct BudgetState {
    /// Points left in the current window. Invariant: remaining <= limit.
    remaining: u32,
    /// When the budget next restores to the full limit
    reset_at: Instant,
}

/// Tracks a point-cost budget against a fixed reset window
///
/// Deliberately independent of the request-rate limiter: a single HTTP call
/// can be within the rate quota yet exceed the point budget, so adapters
/// check both before issuing a point-costed query.
pub struct ComplexityTracker {
    limit: u32,
    state: Mutex<BudgetState>,
}

impl ComplexityTracker {
    /// Create a tracker with a full budget
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            state: Mutex::new(BudgetState {
                remaining: limit,
                reset_at: Instant::now() + RESET_WINDOW,
            }),
        }
    }

    /// The full per-window budget
    pub fn limit(&self) -> u32 {
        self.limit
    }

    fn roll_window(&self, state: &mut BudgetState, now: Instant) {
        if now >= state.reset_at {
            state.remaining = self.limit;
            while state.reset_at <= now {
                state.reset_at += RESET_WINDOW;
            }
        }
    }

    /// Whether a query of the given cost fits in the current budget
    pub async fn can_execute(&self, cost: u32) -> bool {
        let mut state = self.state.lock().await;
        self.roll_window(&mut state, Instant::now());
        state.remaining >= cost
    }

    /// Record points consumed by an executed query; floors at zero
    pub async fn record_usage(&self, cost: u32) {
        let mut state = self.state.lock().await;
        self.roll_window(&mut state, Instant::now());
        state.remaining = state.remaining.saturating_sub(cost);
        debug!(cost, remaining = state.remaining, "Recorded complexity usage");
    }

    /// Adopt the authoritative budget reported by a provider response
    pub async fn update_from_response(&self, remaining: u32, reset_at: Instant) {
        let mut state = self.state.lock().await;
        state.remaining = remaining.min(self.limit);
        state.reset_at = reset_at;
    }

    /// Points left in the current window
    pub async fn remaining(&self) -> u32 {
        let mut state = self.state.lock().await;
        self.roll_window(&mut state, Instant::now());
        state.remaining
    }
}

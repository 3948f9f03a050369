//! Rate limiting
//!
//! Admission control for outbound provider API calls. Two independent
//! budgets exist because a single call can be within the request-rate quota
//! yet exceed a point-cost budget:
//!
//! - [`RateLimiter`]: token-bucket request-rate limiter with optional FIFO
//!   queuing. One instance per (organization, provider) pair.
//! - [`ComplexityTracker`]: point-cost budget for GraphQL-style APIs that
//!   meter query complexity rather than request count.
//!
//! Adapters call [`RateLimiter::acquire`] immediately before every outbound
//! call, and additionally consult the [`ComplexityTracker`] for point-costed
//! queries.

mod bucket;
mod complexity;

pub use bucket::RateLimiter;
pub use complexity::ComplexityTracker;

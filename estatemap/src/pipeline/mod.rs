//! Shared concurrency primitives for the enrichment pipeline.
//!
//! - [`ConcurrencyLimiter`]: semaphore-based admission cap for outbound
//!   calls (geocode provider, photo downloads).
//! - [`Coalescer`]: per-key single-flight table so concurrent requests for
//!   the same resource await one underlying fetch instead of duplicating it.

mod coalesce;
mod limiter;

pub use coalesce::{Coalescer, CoalescerStats, Flight, LeaderGuard};
pub use limiter::{ConcurrencyLimiter, ConcurrencyPermit};

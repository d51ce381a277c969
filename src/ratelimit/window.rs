//! Common interface for per-user window state.

use super::quota::RateLimitConfig;
use crate::error::Result;

/// Per-user mutable state that makes an admission decision.
///
/// Implementations are not synchronized themselves; the limiter wraps each
/// instance in its own lock and calls [`WindowState::evict_and_decide`] while
/// holding it.
pub trait WindowState: Send + 'static {
    /// Short algorithm name used in logs.
    const ALGORITHM: &'static str;

    /// Build fresh state for a newly registered user.
    fn from_config(config: &RateLimitConfig) -> Result<Self>
    where
        Self: Sized;

    /// Drop expired history, then decide on (and possibly record) one call at `now`.
    fn evict_and_decide(&mut self, now: u64) -> bool;

    /// Requests currently counted against the quota, without evicting.
    fn usage(&self) -> u64;

    /// The quota this state enforces.
    fn config(&self) -> &RateLimitConfig;
}

//! Per-user limiter facade and key registry.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
use super::counter::BucketedCounter;
use super::log::EventLog;
use super::quota::RateLimitConfig;
use super::window::WindowState;
use super::UserId;
use crate::error::{QuotaError, Result};

/// Limiter using the bucketed sliding window counter.
pub type SlidingWindowCounterLimiter = RateLimiter<BucketedCounter>;
/// Limiter using the exact sliding window log.
pub type SlidingWindowLogLimiter = RateLimiter<EventLog>;

/// Admission control for registered users.
///
/// This struct is thread-safe and can be shared across threads and tasks.
/// The registry map is sharded, and every user's window state sits behind its
/// own mutex, so callers for different users never contend on a common lock.
pub struct RateLimiter<S: WindowState> {
    /// Window state indexed by user id
    users: DashMap<UserId, Arc<Mutex<S>>>,
    /// Source of the current second
    clock: Arc<dyn Clock>,
}

impl<S: WindowState> RateLimiter<S> {
    /// Create a limiter reading the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a limiter reading the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            users: DashMap::new(),
            clock,
        }
    }

    /// Register a user with the default quota (100 requests per 60 seconds).
    pub fn add_user(&self, user: UserId) -> Result<()> {
        self.add_user_with(user, RateLimitConfig::default())
    }

    /// Register a user with an explicit quota.
    ///
    /// Fails with [`QuotaError::DuplicateKey`] if the user is already
    /// registered, whatever quota is passed the second time.
    pub fn add_user_with(&self, user: UserId, config: RateLimitConfig) -> Result<()> {
        match self.users.entry(user) {
            Entry::Occupied(_) => Err(QuotaError::DuplicateKey(user)),
            Entry::Vacant(slot) => {
                let state = S::from_config(&config)?;
                slot.insert(Arc::new(Mutex::new(state)));
                debug!(
                    user = user,
                    algorithm = S::ALGORITHM,
                    limit = config.request_limit,
                    window_secs = config.window_secs,
                    "Registered user"
                );
                Ok(())
            }
        }
    }

    /// Forget a user. Removing an unknown user is a no-op.
    pub fn remove_user(&self, user: UserId) {
        if self.users.remove(&user).is_some() {
            debug!(user = user, algorithm = S::ALGORITHM, "Removed user");
        }
    }

    /// Decide whether one call from `user` is admitted at the current second.
    ///
    /// The user's lock is held across reading the clock, eviction, decision
    /// and recording, so each user's calls are timestamped in lock order.
    pub fn should_allow_service_call(&self, user: UserId) -> Result<bool> {
        let state = self.state(user)?;

        let mut window = state.lock();
        let now = self.clock.now_secs();
        let allowed = window.evict_and_decide(now);

        trace!(
            user = user,
            now = now,
            usage = window.usage(),
            allowed = allowed,
            "Admission decision"
        );
        if !allowed {
            debug!(
                user = user,
                limit = window.config().request_limit,
                "Rate limit exceeded"
            );
        }

        Ok(allowed)
    }

    /// Requests currently counted for a user, without evicting.
    pub fn current_usage(&self, user: UserId) -> Result<u64> {
        let state = self.state(user)?;
        let usage = state.lock().usage();
        Ok(usage)
    }

    /// Whether a user is registered.
    pub fn contains_user(&self, user: UserId) -> bool {
        self.users.contains_key(&user)
    }

    /// Get the number of registered users.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Remove every user.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.users.clear();
    }

    /// Clone the user's state handle so the map shard is released before locking it.
    fn state(&self, user: UserId) -> Result<Arc<Mutex<S>>> {
        self.users
            .get(&user)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(QuotaError::UnknownKey(user))
    }
}

impl<S: WindowState> Default for RateLimiter<S> {
    fn default() -> Self {
        Self::new()
    }
}

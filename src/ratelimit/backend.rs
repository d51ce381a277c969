//! Admission control trait for choosing an algorithm at runtime.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::clock::Clock;
use super::limiter::{RateLimiter, SlidingWindowCounterLimiter, SlidingWindowLogLimiter};
use super::quota::RateLimitConfig;
use super::window::WindowState;
use super::UserId;
use crate::error::Result;

/// Trait for rate limiter implementations.
///
/// This trait abstracts over the bucketed counter and the event log so a
/// caller can hold either behind `Arc<dyn AdmissionControl>`.
pub trait AdmissionControl: Send + Sync {
    /// Register a user with an explicit quota.
    fn add_user(&self, user: UserId, config: RateLimitConfig) -> Result<()>;

    /// Forget a user. Never fails.
    fn remove_user(&self, user: UserId);

    /// Decide whether one call from `user` is admitted now.
    fn should_allow_service_call(&self, user: UserId) -> Result<bool>;

    /// Name of the underlying algorithm.
    fn algorithm(&self) -> &'static str;
}

impl<S: WindowState> AdmissionControl for RateLimiter<S> {
    fn add_user(&self, user: UserId, config: RateLimitConfig) -> Result<()> {
        self.add_user_with(user, config)
    }

    fn remove_user(&self, user: UserId) {
        RateLimiter::remove_user(self, user)
    }

    fn should_allow_service_call(&self, user: UserId) -> Result<bool> {
        RateLimiter::should_allow_service_call(self, user)
    }

    fn algorithm(&self) -> &'static str {
        S::ALGORITHM
    }
}

/// The available sliding window algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Bucketed counter: fixed memory, approximate window
    #[default]
    Counter,
    /// Timestamp log: exact window, memory grows with traffic
    Log,
}

impl Algorithm {
    /// Build an empty limiter for this algorithm.
    pub fn build(self, clock: Arc<dyn Clock>) -> Arc<dyn AdmissionControl> {
        match self {
            Algorithm::Counter => Arc::new(SlidingWindowCounterLimiter::with_clock(clock)),
            Algorithm::Log => Arc::new(SlidingWindowLogLimiter::with_clock(clock)),
        }
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "counter" => Ok(Algorithm::Counter),
            "log" => Ok(Algorithm::Log),
            other => Err(format!("unknown algorithm '{}', expected 'counter' or 'log'", other)),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Counter => write!(f, "counter"),
            Algorithm::Log => write!(f, "log"),
        }
    }
}

//! Rate limiting logic and state management.

mod backend;
mod clock;
mod counter;
mod limiter;
mod log;
mod quota;
mod window;

/// Identity each limiter's state is scoped to.
pub type UserId = u64;

pub use backend::{AdmissionControl, Algorithm};
pub use clock::{Clock, ManualClock, SystemClock};
pub use counter::BucketedCounter;
pub use limiter::{RateLimiter, SlidingWindowCounterLimiter, SlidingWindowLogLimiter};
pub use log::EventLog;
pub use quota::{
    RateLimitConfig, DEFAULT_BUCKET_COUNT, DEFAULT_REQUEST_LIMIT, DEFAULT_WINDOW_SECS,
};
pub use window::WindowState;

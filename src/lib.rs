//! Sliding Quota - Per-User Admission Control
//!
//! This crate decides, for each incoming service call, whether a user is still
//! within its request quota over a trailing time window. Two algorithms are
//! provided: a bucketed sliding window counter (approximate, fixed memory) and
//! a sliding window log (exact, memory proportional to admitted requests).

pub mod config;
pub mod error;
pub mod ratelimit;
pub mod simulation;

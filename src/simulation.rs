//! Simulated traffic against a limiter.
//!
//! Each user issues a fixed number of calls, spaced by a configurable
//! interval plus random jitter. All users run concurrently on the current task.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::ratelimit::{AdmissionControl, UserId};

/// Outcome of a simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Algorithm of the limiter that was driven
    pub algorithm: &'static str,
    /// Per-user outcomes, in the order the users were given
    pub users: Vec<UserReport>,
    /// Whether the run was cut short by the shutdown signal
    pub interrupted: bool,
}

/// Decisions observed for one user.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserReport {
    /// User identifier
    pub id: UserId,
    /// Calls admitted
    pub allowed: u64,
    /// Calls turned away
    pub rejected: u64,
}

impl SimulationReport {
    /// Calls admitted across all users.
    pub fn total_allowed(&self) -> u64 {
        self.users.iter().map(|u| u.allowed).sum()
    }

    /// Calls rejected across all users.
    pub fn total_rejected(&self) -> u64 {
        self.users.iter().map(|u| u.rejected).sum()
    }
}

/// Drive calls for every user until done or until `shutdown` resolves.
///
/// Users must already be registered with `limiter`.
pub async fn run_simulation<F>(
    limiter: Arc<dyn AdmissionControl>,
    users: &[UserId],
    config: &SimulationConfig,
    shutdown: F,
) -> Result<SimulationReport>
where
    F: Future<Output = ()>,
{
    let (stop_tx, stop_rx) = watch::channel(false);

    let drivers = join_all(
        users
            .iter()
            .map(|&user| drive_user(limiter.as_ref(), user, config, stop_rx.clone())),
    );
    tokio::pin!(drivers);
    tokio::pin!(shutdown);

    let mut interrupted = false;
    let results = tokio::select! {
        results = &mut drivers => results,
        _ = &mut shutdown => {
            interrupted = true;
            let _ = stop_tx.send(true);
            drivers.await
        }
    };

    Ok(SimulationReport {
        algorithm: limiter.algorithm(),
        users: results.into_iter().collect::<Result<Vec<_>>>()?,
        interrupted,
    })
}

async fn drive_user(
    limiter: &dyn AdmissionControl,
    user: UserId,
    config: &SimulationConfig,
    mut stop: watch::Receiver<bool>,
) -> Result<UserReport> {
    let mut rng = StdRng::from_entropy();
    let mut report = UserReport {
        id: user,
        ..Default::default()
    };

    for call in 1..=config.calls_per_user {
        if *stop.borrow() {
            break;
        }

        if limiter.should_allow_service_call(user)? {
            report.allowed += 1;
            info!(user = user, call = call, "Service call allowed");
        } else {
            report.rejected += 1;
            info!(user = user, call = call, "Service call rejected");
        }

        let jitter = if config.jitter_ms > 0 {
            rng.gen_range(0..=config.jitter_ms)
        } else {
            0
        };
        let delay = Duration::from_millis(config.interval_ms + jitter);

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = stop.changed() => break,
        }
    }

    Ok(report)
}

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sliding_quota::config::{AppConfig, LoggingConfig};
use sliding_quota::ratelimit::{Algorithm, SystemClock, UserId};
use sliding_quota::simulation::run_simulation;

/// Drive simulated traffic through a sliding window rate limiter.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Algorithm to use (counter or log), overriding the configuration
    #[arg(short, long)]
    algorithm: Option<Algorithm>,

    /// Calls issued per user
    #[arg(long)]
    calls: Option<u64>,

    /// Delay between calls in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Number of users to register when the configuration lists none
    #[arg(short, long, default_value_t = 1)]
    users: u64,

    /// Print the final report as JSON
    #[arg(long)]
    json_report: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(algorithm) = args.algorithm {
        config.limiter.algorithm = algorithm;
    }
    if let Some(calls) = args.calls {
        config.simulation.calls_per_user = calls;
    }
    if let Some(interval_ms) = args.interval_ms {
        config.simulation.interval_ms = interval_ms;
    }

    init_tracing(&config.logging);

    info!("Starting Sliding Quota traffic simulation");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    config.validate()?;
    match &args.config {
        Some(path) => info!(
            path = %path.display(),
            algorithm = %config.limiter.algorithm,
            "Configuration loaded"
        ),
        None => info!(
            algorithm = %config.limiter.algorithm,
            "No configuration file given, using defaults"
        ),
    }

    let limiter = config.limiter.algorithm.build(Arc::new(SystemClock));

    let users: Vec<UserId> = if config.users.is_empty() {
        for id in 1..=args.users {
            limiter.add_user(id, config.limiter.default_quota)?;
        }
        (1..=args.users).collect()
    } else {
        for user in &config.users {
            limiter.add_user(user.id, user.quota)?;
        }
        config.users.iter().map(|u| u.id).collect()
    };
    info!(users = users.len(), algorithm = limiter.algorithm(), "Users registered");

    let report = run_simulation(limiter, &users, &config.simulation, shutdown_signal()).await?;

    if report.interrupted {
        warn!("Simulation interrupted before all calls were issued");
    }

    if args.json_report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for user in &report.users {
            println!(
                "user {}: {} allowed, {} rejected",
                user.id, user.allowed, user.rejected
            );
        }
    }

    info!(
        allowed = report.total_allowed(),
        rejected = report.total_rejected(),
        "Sliding Quota traffic simulation finished"
    );
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .init();
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping simulation");
        }
        _ = terminate => {
            info!("Received SIGTERM, stopping simulation");
        }
    }
}

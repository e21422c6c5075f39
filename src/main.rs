//! Batchflow Server — batch job execution engine
//!
//! Main entry point that loads configuration, builds the job engine, and
//! keeps it running until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use batchflow_core::config::AppConfig;
use batchflow_core::error::AppError;
use batchflow_core::events::{EventPayload, JobEvent};
use batchflow_engine::JobController;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from files and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("BATCHFLOW_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(config.logging.with_target)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(config.logging.with_target)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Batchflow v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Build the job engine ─────────────────────────────
    let controller = Arc::new(JobController::from_config(&config.engine)?);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Step 2: Lifecycle event log ──────────────────────────────
    let event_task = tokio::spawn(log_events(Arc::clone(&controller), shutdown_rx.clone()));

    // ── Step 3: Retention cleanup ────────────────────────────────
    let cleanup_task = tokio::spawn(run_cleanup(
        Arc::clone(&controller),
        Duration::from_secs(config.engine.cleanup_interval_seconds.max(1)),
        shutdown_rx,
    ));

    tracing::info!("Batchflow ready, waiting for jobs");

    // ── Step 4: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
    let _ = shutdown_tx.send(true);

    controller.shutdown().await;
    let _ = cleanup_task.await;
    let _ = event_task.await;

    tracing::info!("Batchflow shut down cleanly");
    Ok(())
}

/// Periodically delete finished jobs past their retention period
async fn run_cleanup(
    controller: Arc<JobController>,
    every: Duration,
    mut cancel: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.changed() => {
                if *cancel.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                controller.cleanup_expired_jobs(chrono::Utc::now()).await;
            }
        }
    }

    tracing::debug!("Retention cleanup stopped");
}

/// Log lifecycle events; flag those that request external notification
async fn log_events(controller: Arc<JobController>, mut cancel: watch::Receiver<bool>) {
    let mut events = controller.subscribe();

    loop {
        tokio::select! {
            _ = cancel.changed() => {
                if *cancel.borrow() {
                    break;
                }
            }
            received = events.recv() => match received {
                Ok(event) => {
                    let EventPayload::Job(job_event) = &event.payload;
                    match job_event {
                        JobEvent::Completed { job_id, notify: true, .. } => {
                            tracing::info!(event = event.name(), job_id = %job_id, "Job completion notification requested");
                        }
                        JobEvent::Failed { job_id, error, notify: true } => {
                            tracing::info!(
                                event = event.name(),
                                job_id = %job_id,
                                error = error.as_deref().unwrap_or("all items failed"),
                                "Job failure notification requested"
                            );
                        }
                        _ => tracing::debug!(event = event.name(), job_id = %job_event.job_id(), "Lifecycle event"),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event log lagged, skipped {} event(s)", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

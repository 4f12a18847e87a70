use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wirecut_monitor::config::MonitorConfig;
use wirecut_monitor::reporter::StatusReporter;
use wirecut_monitor::scheduler::Scheduler;
use wirecut_sources::api::ControllerApi;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wirecut_monitor=info,wirecut_sources=info".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();

    // --- Configuration ---
    let config = match MonitorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };
    tracing::info!(
        heartbeat = %config.endpoints.heartbeat,
        job = %config.endpoints.job,
        progress = %config.endpoints.progress,
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        "Loaded monitor configuration"
    );

    // --- Controller client ---
    let api = match ControllerApi::new(config.endpoints.clone(), config.request_timeout) {
        Ok(api) => api,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build HTTP client");
            std::process::exit(1);
        }
    };

    // --- Scheduler ---
    let mut reporter = StatusReporter::new();
    let handle = Scheduler::new(Arc::new(api), config.reconciler(), config.poll_interval).start(
        move |update| {
            reporter.observe(&update);
        },
    );

    shutdown_signal().await;

    handle.stop().await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM.
///
/// If a handler cannot be installed that signal is ignored and the other
/// one still works.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

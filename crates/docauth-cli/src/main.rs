//! docauth - authenticate identity documents from the command line.

use anyhow::{Context, Result};
use clap::Parser;
use docauth_cli::{
    attach_console_listeners, load_session_config, run_authenticate, Args, Command, RunSummary,
};
use docauth_client::{AuthenticationSession, LocalSocketConnector};
use docauth_telemetry::{init_telemetry, TelemetryConfig};
use std::io;
use std::process::ExitCode;
use tracing::{error, info, warn};

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Load configuration
    let config = load_session_config(&args)?;

    // Initialize telemetry
    let mut telemetry = TelemetryConfig::from_env().with_log_dir(&config.logging_directory);
    if args.json_logs {
        telemetry.json_logs = true;
    }
    let _telemetry = init_telemetry(&telemetry).context("failed to initialize telemetry")?;

    let Command::Authenticate(auth) = args.command;

    let session = AuthenticationSession::with_event_capacity(
        LocalSocketConnector::new(),
        config.event_capacity,
    );
    let _listener = attach_console_listeners(&session);

    info!(channel = %config.channel_address(), "Init started");
    let started = std::time::Instant::now();
    if let Err(e) = session.initialize(config).await {
        session.dispose().await;
        return Err(e).context("failed to initialize engine session");
    }
    info!(elapsed_ms = started.elapsed().as_millis(), "Init finished");

    let mut stdout = io::stdout();
    let summary = tokio::select! {
        summary = run_authenticate(&session, &auth, &mut stdout) => Some(summary),
        _ = shutdown_signal() => {
            warn!("Shutdown signal received");
            None
        }
    };

    // Graceful shutdown
    session.dispose().await;

    match summary {
        Some(Ok(RunSummary { authenticated, failed })) => {
            info!(authenticated, failed, "Run complete");
            Ok(if failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Some(Err(e)) => Err(e).context("failed to write report"),
        None => Ok(ExitCode::from(130)),
    }
}

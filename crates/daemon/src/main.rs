// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sift daemon (siftd)
//!
//! Serves the filtered event bus over HTTP and publishes stdin lines to it.

use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use sift_daemon::{lifecycle, Args, DaemonConfig};
use tokio::io::BufReader;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

/// Blocking stdin reads cannot be cancelled, so runtime shutdown stops waiting after this
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
    let args = Args::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("siftd: {e}");
            return ExitCode::FAILURE;
        }
    };
    let result = runtime.block_on(run(args));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("siftd: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = DaemonConfig::load(&args)?;
    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let _log_guard = setup_logging(config.log_file.as_deref())?;
    info!(version = env!("CARGO_PKG_VERSION"), "starting siftd");

    let daemon = match lifecycle::startup(config).await {
        Ok(d) => d,
        Err(e) => {
            error!("failed to start daemon: {}", e);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let mut running = daemon.start()?;
    let ingest = (!args.no_stdin).then(|| running.ingest(BufReader::new(tokio::io::stdin())));

    info!(addr = %running.addr(), "daemon ready");
    // Signal ready for the parent process; tests read the bound address from here
    println!("READY {}", running.addr());

    let outcome = tokio::select! {
        result = running.stopped() => {
            if let Err(e) = &result {
                error!("bus failed: {}", e);
            }
            result
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
            Ok(())
        }
        _ = sigint.recv() => {
            info!("received SIGINT, shutting down");
            Ok(())
        }
    };

    let closed = running.shutdown().await;
    if let Some(handle) = ingest {
        handle.abort();
    }

    info!("daemon stopped");
    outcome.and(closed).map_err(Into::into)
}

fn setup_logging(
    log_file: Option<&Path>,
) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let (writer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path.file_name().ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("not a log file path: {}", path.display()),
                )
            })?;
            std::fs::create_dir_all(dir)?;
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name))
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(log_file.is_none()))
        .init();

    Ok(guard)
}

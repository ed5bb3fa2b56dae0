mod cli;
mod error;

use crate::{
    cli::Args,
    error::{CliError, Result},
};
use clap::Parser;
use claque_engine::{HttpSessionFactory, ProxyConfig, SessionConfig, SessionOrchestrator};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Application error: {}", e);
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    if args.viewers == 0 || args.viewers > args.max_viewers {
        return Err(CliError::InvalidViewerCount {
            given: args.viewers,
            max: args.max_viewers,
        });
    }

    let proxy = args.proxy.map(|url| ProxyConfig {
        url,
        username: args.proxy_username,
        password: args.proxy_password,
    });

    let config = Arc::new(SessionConfig::default());
    let shutdown = CancellationToken::new();
    let factory = Arc::new(HttpSessionFactory::new(config.clone()));
    let mut orchestrator = SessionOrchestrator::new(factory, config, shutdown.clone());

    let started = orchestrator
        .launch(&args.broadcaster, args.viewers, proxy.as_ref())
        .await;
    if started == 0 {
        info!("no sessions started, exiting");
        return Ok(());
    }

    let mut report = tokio::time::interval(Duration::from_secs(args.report_interval));
    report.tick().await; // immediate first tick
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("stop signal received, shutting down");
                break;
            }
            _ = shutdown.cancelled() => break,
            _ = report.tick() => {
                info!("active viewers: {}", orchestrator.viewer_count());
            }
        }
    }

    orchestrator.stop_all().await;
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

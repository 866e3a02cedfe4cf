//! Run the host in periodic service mode.

use clap::Args;

use axle_core::config::AppConfig;
use axle_core::result::HostResult;

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Override the scheduled cycle interval in seconds
    #[arg(long)]
    pub tick_interval: Option<u64>,

    /// Extra arguments passed through to plugins
    #[arg(last = true)]
    pub plugin_args: Vec<String>,
}

/// Execute the serve command
pub async fn execute(args: &ServeArgs, mut config: AppConfig) -> HostResult<i32> {
    if let Some(interval) = args.tick_interval {
        config.host.tick_interval_seconds = interval;
    }

    tracing::info!("Starting Axle v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        tick_interval = config.host.tick_interval_seconds,
        plugin_config = %config.host.plugin_config,
        "Service mode"
    );

    let host = super::build_host(config, args.plugin_args.clone()).await?;
    host.start().await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received");
    host.shutdown().await;

    Ok(0)
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

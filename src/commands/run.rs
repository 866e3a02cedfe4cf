//! Invoke plugins once, outside service mode.

use std::time::Duration;

use clap::Args;

use axle_core::config::AppConfig;
use axle_core::result::HostResult;

/// Arguments for the run command
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Plugins to invoke, by id or display name. Empty means all.
    pub plugins: Vec<String>,

    /// Maximum seconds to wait for the invoked plugins to finish
    #[arg(long, default_value = "600")]
    pub wait_seconds: u64,

    /// Extra arguments passed through to plugins
    #[arg(last = true)]
    pub plugin_args: Vec<String>,
}

/// Execute the run command
pub async fn execute(args: &RunArgs, config: AppConfig) -> HostResult<i32> {
    let host = super::build_host(config, args.plugin_args.clone()).await?;

    let mut selected = Vec::with_capacity(args.plugins.len());
    for selector in &args.plugins {
        selected.push(host.select(selector).await?.id());
    }

    let reports = host
        .run_once(&selected, Duration::from_secs(args.wait_seconds))
        .await?;

    let mut failed = false;
    for report in &reports {
        let outcome = match &report.outcome {
            Some(outcome) => outcome.to_string(),
            None => "not invoked".to_string(),
        };
        println!("{} ({}): {}", report.name, report.id, outcome);
        failed |= report.is_failure();
    }

    Ok(if failed { 1 } else { 0 })
}

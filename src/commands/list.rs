//! List the plugins registered with this host build.

use clap::Args;

use axle_core::config::AppConfig;
use axle_core::result::HostResult;

/// Arguments for the list command
#[derive(Debug, Args)]
pub struct ListArgs {}

/// Execute the list command
pub async fn execute(_args: &ListArgs, config: AppConfig) -> HostResult<i32> {
    let host = super::build_host(config, Vec::new()).await?;

    println!(
        "{:<38} {:<24} {:<8}",
        "ID", "NAME", "STATE"
    );
    for snapshot in host.registry().snapshots().await {
        println!(
            "{:<38} {:<24} {:<8}",
            snapshot.id.to_string(),
            snapshot.name,
            snapshot.state.to_string()
        );
    }

    Ok(0)
}

//! Print resolved plugin configuration sections.

use clap::Args;

use axle_core::config::AppConfig;
use axle_core::config::resolver::{ConfigResolver, ConfigSection};
use axle_core::result::HostResult;

/// Arguments for the config command
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Plugin to resolve, by id or display name. Omit for the global
    /// section.
    pub plugin: Option<String>,
}

/// Execute the config command
pub async fn execute(args: &ConfigArgs, config: AppConfig) -> HostResult<i32> {
    let section = match &args.plugin {
        Some(selector) => {
            let host = super::build_host(config, Vec::new()).await?;
            let handle = host.select(selector).await?;
            println!("# Resolved section for {}", handle.identity());
            handle.config().clone()
        }
        None => {
            let resolver = ConfigResolver::load(&config.host.plugin_config)?;
            println!("# Global section");
            resolver.global()
        }
    };

    print_section(&section);
    Ok(0)
}

fn print_section(section: &ConfigSection) {
    for (key, values) in section.iter() {
        for value in values {
            println!("{key} = {value}");
        }
        if values.is_empty() {
            println!("{key} =");
        }
    }
}

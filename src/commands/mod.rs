//! CLI command definitions and dispatch.

pub mod config;
pub mod list;
pub mod run;
pub mod serve;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use axle_core::config::AppConfig;
use axle_core::result::HostResult;
use axle_host::{Plugin, PluginHost};

/// Axle — plugin host
#[derive(Debug, Parser)]
#[command(name = "axle", version, about, long_about = None)]
pub struct Cli {
    /// Path to the host configuration file
    #[arg(short, long, default_value = "config/axle.toml")]
    pub config: String,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the host in periodic service mode
    Serve(serve::ServeArgs),
    /// Invoke selected plugins once and exit
    Run(run::RunArgs),
    /// List registered plugins
    List(list::ListArgs),
    /// Print the resolved configuration section for a plugin
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command, returning the process exit code.
    pub async fn execute(&self, config: AppConfig) -> HostResult<i32> {
        match &self.command {
            Commands::Serve(args) => serve::execute(args, config).await,
            Commands::Run(args) => run::execute(args, config).await,
            Commands::List(args) => list::execute(args, config).await,
            Commands::Config(args) => config::execute(args, config).await,
        }
    }
}

/// The plugins compiled into this binary.
pub fn builtin_plugins() -> Vec<Arc<dyn Plugin>> {
    vec![
        Arc::new(plugin_demo::DemoPlugin::new()),
        Arc::new(plugin_echo::EchoPlugin::new()),
    ]
}

/// Helper: assemble a host with the built-in plugins.
pub async fn build_host(config: AppConfig, plugin_args: Vec<String>) -> HostResult<PluginHost> {
    let mut builder = PluginHost::builder(config).args(plugin_args);
    for plugin in builtin_plugins() {
        builder = builder.plugin(plugin);
    }
    builder.build().await
}

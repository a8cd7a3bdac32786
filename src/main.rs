use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use devproxy::config::{ConfigValidator, load_config};
use devproxy::core::{HostAllowlist, RouteTable};
use devproxy::ports::http_server::HttpServer;
use devproxy::tracing_setup::init_tracing;
use devproxy::ProxyServer;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Development reverse proxy")]
struct Args {
    /// Path to the YAML configuration file
    #[clap(short, long, default_value = "config.yaml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing().map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let args = Args::parse();

    let config = load_config(&args.config)
        .await
        .with_context(|| format!("failed to load configuration from {}", args.config))?;

    ConfigValidator::validate(&config).context("invalid configuration")?;

    let config = Arc::new(config);
    let table = Arc::new(RouteTable::from_config(&config).context("failed to compile routes")?);
    let allowlist = Arc::new(HostAllowlist::from_env(&config.allowed_hosts));

    for rule in table.rules() {
        tracing::info!(prefix = %rule.prefix, action = %rule.action, "route registered");
    }

    let server = ProxyServer::new(config, table, allowlist);
    server.run().await
}

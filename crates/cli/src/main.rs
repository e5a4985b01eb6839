use anyhow::Context;
use clap::Parser;
use rdns_graphql_api::AppState;
use rdns_graphql_application::{services::build_schema, use_cases::ExecuteQueryUseCase};
use rdns_graphql_domain::{CliOverrides, Config};
use rdns_graphql_infrastructure::system::SystemHostnameResolver;
use std::sync::Arc;
use tracing::info;

mod bootstrap;
mod server;

#[derive(Parser)]
#[command(name = "rdns-graphql")]
#[command(version)]
#[command(about = "Reverse DNS lookups over GraphQL")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// HTTP port
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Bind address
    #[arg(short = 'b', long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error, fatal, panic)
    #[arg(short = 'l', long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        port: cli.port,
        bind_address: cli.bind,
        log_level: cli.log_level,
    };

    let config = Config::load(cli.config.as_deref(), cli_overrides)?;

    bootstrap::init_logging(&config.logging);

    info!("Starting rdns-graphql v{}", env!("CARGO_PKG_VERSION"));
    info!(
        config_file = cli.config.as_deref().unwrap_or("default"),
        port = config.server.port,
        bind = %config.server.bind_address,
        "Configuration loaded"
    );

    let resolver = Arc::new(SystemHostnameResolver::new());
    let schema = build_schema(resolver).context("Failed to build GraphQL schema")?;

    let app_state = AppState {
        execute_query: Arc::new(ExecuteQueryUseCase::new(Arc::new(schema))),
    };

    let bind_addr = config.server.socket_addr()?;
    server::start_web_server(bind_addr, app_state).await?;

    Ok(())
}

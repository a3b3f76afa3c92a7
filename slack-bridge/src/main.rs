use clap::Parser;
use gateway::bot::HttpBotCore;
use gateway::config::Config;
use gateway::dispatcher::{Gateway, GatewayService};
use gateway::store::HttpKvStore;
use shared::http::run_http_service;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use telemetry::Reporter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about = "Webhook gateway bridging chat platforms to the lottery bot core")]
struct Cli {
    /// Path to the deployment configuration file
    #[arg(long, short)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "invalid configuration");
        return ExitCode::FAILURE;
    }

    let store = match HttpKvStore::new(
        config.store.url.clone(),
        config.store.api_token.clone(),
        Duration::from_secs(config.store.timeout_secs),
    ) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!(error = %e, "failed to build store client");
            return ExitCode::FAILURE;
        }
    };

    let core = Arc::new(HttpBotCore::new(
        config.core.url.clone(),
        Duration::from_secs(config.core.timeout_secs),
    ));

    let reporter = Reporter::new(
        config.telemetry.ingest_url.clone(),
        Duration::from_secs(config.telemetry.timeout_secs),
    );

    let service = GatewayService::new(Gateway::new(store, core, reporter, config.profile.clone()));

    tracing::info!(
        host = %config.listener.host,
        port = config.listener.port,
        "starting gateway"
    );
    if let Err(e) = run_http_service(&config.listener.host, config.listener.port, service).await {
        tracing::error!(error = %e, "server terminated");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

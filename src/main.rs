use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast;

use foreman_core::config::OrchestratorConfig;
use foreman_core::events::TaskEvent;
use foreman_engine::TaskOrchestrator;
use foreman_host::HttpHost;

#[derive(Parser, Debug)]
#[command(name = "foreman", about = "Agent subtask orchestration server")]
struct Args {
    /// Port for the orchestrator API.
    #[arg(long, default_value_t = 9292)]
    port: u16,

    /// Base URL of the agent execution host.
    #[arg(long, default_value = "http://127.0.0.1:9393")]
    host_url: String,

    /// Maximum concurrent task starts.
    #[arg(long, default_value_t = foreman_core::config::DEFAULT_MAX_CONCURRENT_STARTS)]
    max_concurrent_starts: usize,

    /// Per-attempt instruction delivery timeout in milliseconds.
    #[arg(long, default_value_t = foreman_core::config::DEFAULT_ATTEMPT_TIMEOUT_MS)]
    attempt_timeout_ms: u64,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    tracing::info!(host_url = %args.host_url, "Starting foreman");

    let mut config = OrchestratorConfig::default();
    config.max_concurrent_starts = args.max_concurrent_starts;
    config.fallback.attempt_timeout_ms = args.attempt_timeout_ms;

    let host = Arc::new(HttpHost::new(args.host_url));
    let (event_tx, _) = broadcast::channel::<TaskEvent>(1024);
    let orchestrator = TaskOrchestrator::new(host, config, event_tx);

    let server_config = foreman_server::ServerConfig { port: args.port };
    let handle = foreman_server::start(server_config, orchestrator)
        .await
        .expect("Failed to start server");

    tracing::info!(port = handle.port, "foreman ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for ctrl+c");

    tracing::info!("Shutting down");
}

use anyhow::Result;
use std::sync::Arc;
use tokengate::AdmissionController;
use tokengate_server::config::Config;
use tokengate_server::transport::http::{AppState, HttpTransport};
use tokengate_server::upstream::HttpUpstream;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration from environment variables and CLI arguments
    let config = Config::from_env_and_args()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("tokengate={}", config.log_level).parse()?)
                .add_directive(format!("tokengate_server={}", config.log_level).parse()?),
        )
        .init();

    let controller = AdmissionController::new(config.rate_limit()?);
    controller.start_cleanup(config.cleanup_interval())?;

    let upstream = HttpUpstream::new(
        config.upstream.base_urls.clone(),
        config.upstream_timeout(),
    )?;

    let rate = controller.config();
    tracing::info!(
        "Admission control: {} token(s) per {:?}, burst {}, {:?} refill",
        rate.tokens_per_interval(),
        rate.interval(),
        rate.bucket_size(),
        rate.refill_policy()
    );
    tracing::info!("Upstreams: {}", upstream.base_urls().join(", "));

    let state = Arc::new(AppState {
        controller: controller.clone(),
        upstream: Arc::new(upstream),
    });

    let transport = HttpTransport::new(&config.http.host, config.http.port)?;
    let result = transport.start(state, shutdown_signal()).await;

    controller.stop_cleanup();
    tracing::info!("Server stopped, {} client(s) tracked", controller.tracked_clients());

    result
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use clap::Parser;
use tokio::net::TcpListener;

use animal_health::config::Config;
use animal_health::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    animal_health::init_tracing();

    let config = Config::parse();
    tracing::info!("Starting animal health server with config: {:?}", config);

    // A missing or incompatible model leaves the server up in degraded mode
    tracing::info!(model_dir = %config.model_dir.display(), "Loading model...");
    let state = AppState::load(&config.model_dir);

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let app = server::router(state)
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(prometheus_layer);

    let listener = TcpListener::bind(&config.server_address()).await?;
    tracing::info!("Server running on http://{}", config.server_address());

    axum::serve(listener, app).await?;
    Ok(())
}

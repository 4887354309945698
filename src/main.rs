use anyhow::Context;
use clap::Parser; // for cli
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use seed_gateway::config::Args;
use seed_gateway::feature::FeatureCatalog;
use seed_gateway::janitor::janitor;
use seed_gateway::relay::HttpUpstream;
use seed_gateway::router;
use seed_gateway::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // parse cli arguments
    let args = Args::parse();

    let features = FeatureCatalog::load(&args.features)
        .with_context(|| format!("loading features from {}", args.features.display()))?;
    let upstream = HttpUpstream::new(args.upstream_timeout()).context("building HTTP client")?;

    // creating shared state
    let state = Arc::new(AppState::new(&args, features, Arc::new(upstream)));

    // spawn the background sweeper
    tokio::spawn(janitor(Arc::clone(&state), args.sweep_interval()));

    let app = router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    info!(port = args.port, "Gateway running on http://localhost:{}", args.port);
    info!(
        rate_limit = args.rate_limit,
        rate_window_secs = args.rate_window,
        upstream_timeout_secs = args.upstream_timeout,
        data_dir = %args.data_dir.display(),
        admin = args.admin_password.is_some(),
        "Configuration"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

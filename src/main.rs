use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app;
mod common;
mod config;
mod docs;
mod infrastructure;
mod middleware;
mod modules;
mod routes;
mod state;
mod workers;

#[cfg(test)]
mod test_support;

use common::media::MediaStorage;
use common::scheduler::ScheduledTask;
use config::settings::AppConfig;
use infrastructure::db::pool::{connect_to_db, run_migrations};
use infrastructure::redis::client::RedisService;
use modules::providers::registry::ProviderRegistry;
use state::{AppState, Stores};
use workers::auto_poster::AutoPoster;
use workers::renderer::FfmpegCompositor;
use workers::status_poller::StatusPoller;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,tower_http=info")),
        )
        .init();

    info!("Starting server...");

    let config = AppConfig::new().context("loading configuration")?;
    let db = connect_to_db(&config.database_url).await.context("connecting to PostgreSQL")?;
    run_migrations(&db).await.context("running migrations")?;
    let redis = RedisService::new(&config.redis_url).await.context("connecting to Redis")?;

    let http = reqwest::Client::builder()
        .user_agent(concat!("shorts-studio/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building HTTP client")?;
    let media = MediaStorage::new(
        http.clone(),
        config.renders_dir.clone(),
        config.images_dir.clone(),
        &config.backend_url,
    );
    media.ensure_dirs().await?;

    let providers = ProviderRegistry::from_config(&config, &http, &media);
    let stores = Stores::postgres(&db, &redis);
    let platforms = modules::social::platforms_from_config(&config, &http, stores.accounts.clone(), &media);
    info!("📡 Social platforms configured: {:?}", platforms.configured());

    let state = AppState::new(
        config.clone(),
        media,
        providers,
        stores,
        Arc::new(FfmpegCompositor::default()),
    )
    .with_platforms(platforms);

    let status_poller = ScheduledTask::new(
        Arc::new(StatusPoller::new(state.videos.clone(), state.providers.clone())),
        config.status_poll_interval,
    );
    let auto_poster = ScheduledTask::new(
        Arc::new(AutoPoster::new(state.queue.clone(), state.publisher.clone())),
        config.auto_post_interval,
    );
    status_poller.start();
    auto_poster.start();

    let app = app::create_app(state);
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("🚀 Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    status_poller.stop().await;
    auto_poster.stop().await;
    info!("👋 Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("could not listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

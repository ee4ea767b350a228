use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use genre_story_service::{
    AppConfig, ModelRegistry, build_router,
    model::TorchScriptLoader,
    speech::GoogleTtsClient,
    temp_files::{OsTempFs, ReapPolicy, TempFileReaper},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!(?config.listen_addr, model = %config.model_key, "loading model artifacts");

    let loader = Arc::new(TorchScriptLoader::new(config.device));
    let registry = Arc::new(ModelRegistry::initialize(
        config.models.clone(),
        &config.model_key,
        loader,
    )?);
    let speech = Arc::new(GoogleTtsClient::new(config.speech.clone())?);

    let reaper = TempFileReaper::new(
        config.cleanup.temp_dir.clone(),
        Arc::new(OsTempFs),
        ReapPolicy::story_downloads(config.cleanup.max_age),
        config.cleanup.interval,
    )
    .start();
    tracing::info!(
        dir = %config.cleanup.temp_dir.display(),
        interval_secs = config.cleanup.interval.as_secs(),
        "temp file reaper started"
    );

    let router = build_router(config.clone(), registry, speech);

    let listener = TcpListener::bind(config.listen_addr).await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "story server ready");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reaper.stop().await;
    tracing::info!("shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,hyper=warn,axum::rejection=trace".into());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

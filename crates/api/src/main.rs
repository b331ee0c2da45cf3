use std::sync::Arc;

use anyhow::Context;

use protelab_api::app::{self, services::AppServices};
use protelab_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::from_env()?;
    protelab_observability::tracing::init(config.log_format);

    let services = Arc::new(AppServices::in_memory(config.seed_demo)?);
    let app = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, seed_demo = config.seed_demo, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

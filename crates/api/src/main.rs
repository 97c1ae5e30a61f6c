use anyhow::Context;

use userdesk_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    userdesk_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(?config, "configuration loaded");

    let services = userdesk_api::app::services::build_services(&config).await?;
    let app = userdesk_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};
use vector_data::api::{create_router, AppState};
use vector_data::infrastructure::{AppConfig, IndexRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let fmt_layer = match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => tracing_subscriber::fmt::layer().json().boxed(),
        _ => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=debug,vector_data=debug,tower_http=debug".into()),
        )
        .with(fmt_layer)
        .init();

    let config = AppConfig::load()?;
    info!(indexes = config.indexes.len(), "Configuration loaded");

    let registry = IndexRegistry::from_config(&config).await?;
    info!(indexes = ?registry.names(), "Index registry initialized");

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let state = AppState::new(registry, config);
    let app = create_router(state);

    info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

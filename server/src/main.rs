//! chara-server: serves the character attribute resources under `/api/v1`.
//!
//! Configuration comes from the environment (or `.env`): `DATABASE_URL`, `BIND_ADDR`,
//! `DB_MAX_CONNECTIONS`, `BODY_LIMIT_BYTES`, `RESOURCES_PATH`, `RUST_LOG`.

use chara_api::{app, builtin_catalog, load_catalog_from_path, resolve, AppState, Settings};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("chara_api=info,chara_server=info")),
        )
        .init();

    let catalog = match &settings.resources_path {
        Some(path) => load_catalog_from_path(path).await?,
        None => builtin_catalog()?,
    };
    let registry = resolve(&catalog)?;
    tracing::info!(resources = registry.len(), "catalog resolved");

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.database_url)
        .await?;

    let state = AppState::new(pool, registry);
    let router = app(state, settings.body_limit_bytes);
    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("chara-server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use cinelog_api::api::{create_router, AppState};
use cinelog_api::auth::{HttpIdentityProvider, IdentityProvider};
use cinelog_api::config::Config;
use cinelog_api::db::{create_pool, CollectionStore, PgStore};
use cinelog_api::services::providers::{CatalogProvider, TmdbProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!().run(&pool).await?;

    let store: Arc<dyn CollectionStore> = Arc::new(PgStore::new(pool));
    let identity: Arc<dyn IdentityProvider> = Arc::new(HttpIdentityProvider::new(
        config.auth_url.clone(),
        config.auth_api_key.clone(),
    ));
    let catalog: Arc<dyn CatalogProvider> = Arc::new(TmdbProvider::new(
        config.catalog_api_key.clone(),
        config.catalog_api_url.clone(),
    ));

    let state = AppState::new(store, identity, catalog);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "cinelog API listening");
    axum::serve(listener, app).await?;

    Ok(())
}

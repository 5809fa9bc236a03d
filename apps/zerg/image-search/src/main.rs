use axum::Router;
use axum_helpers::server::{create_production_app, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_images::{
    BlobStore, BlobUrlFormatter, ClipGrpcProvider, ImageService, LocalBlobStore, MemoryBlobStore,
    PgImageRepository, handlers,
};
use std::sync::Arc;
use tracing::info;

mod config;
mod health;
mod openapi;

use config::{BlobConfig, BlobProvider, Config};

fn blob_store(config: &BlobConfig) -> Arc<dyn BlobStore> {
    let urls = BlobUrlFormatter::new(config.public_base_url.clone());

    match config.provider {
        BlobProvider::Local => {
            info!(root = %config.root_dir.display(), "Using local blob store");
            Arc::new(LocalBlobStore::new(config.root_dir.clone(), urls))
        }
        BlobProvider::Memory => {
            tracing::warn!("Using in-memory blob store; uploads are lost on restart");
            Arc::new(MemoryBlobStore::new(urls))
        }
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    let run_migrations = config.database.run_migrations;
    let db = database::postgres::connect_from_config_with_retry(config.database.clone(), None)
        .await
        .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))?;

    if run_migrations {
        database::postgres::run_migrations::<migration::Migrator>(&db, config.app.name).await?;
    }

    let embeddings = ClipGrpcProvider::connect_lazy(&config.clip)?;
    let service = ImageService::new(
        PgImageRepository::new(db.clone()),
        Arc::new(embeddings),
        blob_store(&config.blobs),
    );

    let api_routes = Router::new()
        .nest(
            "/images",
            handlers::router(service.clone(), config.server.max_upload_bytes),
        )
        .nest("/storage", handlers::storage_router(service));

    let router = axum_helpers::create_router::<openapi::ApiDoc>(api_routes).await?;

    // - /health: liveness with app name/version
    // - /ready: database round trip
    let app = router
        .merge(health_router(config.app))
        .merge(health::ready_router(db.clone()));

    info!(
        max_upload_bytes = config.server.max_upload_bytes,
        "Starting image search API"
    );

    create_production_app(app, &config.server, async move {
        info!("Shutting down: closing database connections");
        match db.close().await {
            Ok(_) => info!("PostgreSQL connection closed"),
            Err(e) => tracing::error!("Error closing PostgreSQL: {}", e),
        }
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Image search API shutdown complete");
    Ok(())
}

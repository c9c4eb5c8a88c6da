//! Wiring shared by the server and the maintenance binary.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    auth::jwt::JwtService,
    config::{AppConfig, StoreBackend},
    db,
    routes::FILE_DOWNLOAD_PATH,
    storage::{FsStorage, ObjectStorage, S3Storage},
    store::{MemoryStore, PgStore, Store},
};

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// Opens the configured store; PostgreSQL is migrated before use.
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn Store>> {
    match config.store_backend {
        StoreBackend::Memory => {
            info!("using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set for the postgres store")?;
            let pool = db::init_pool_with_size(url, config.database_max_pool_size)?;
            let migration_pool = pool.clone();
            let applied = tokio::task::spawn_blocking(move || db::run_migrations(&migration_pool))
                .await
                .context("migration task panicked")??;
            info!(applied, "database migrations applied");
            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

/// S3 when a bucket is configured, otherwise the local upload directory.
pub async fn open_storage(config: &AppConfig, jwt: &JwtService) -> Arc<dyn ObjectStorage> {
    match &config.s3_bucket {
        Some(bucket) => {
            info!(bucket = %bucket, "using S3 object storage");
            Arc::new(S3Storage::from_config(config, bucket.clone()).await)
        }
        None => {
            info!(root = %config.upload_dir.display(), "using local file storage");
            Arc::new(FsStorage::new(
                config.upload_dir.clone(),
                jwt.clone(),
                FILE_DOWNLOAD_PATH,
            ))
        }
    }
}

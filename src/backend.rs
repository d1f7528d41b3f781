//! Store selection from configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use snipdeck_core::store::Store;

use crate::config::{Config, StoreBackend};
use crate::db;
use crate::file_store::FileStore;
use crate::migrate;
use crate::sqlite_store::SqliteStore;
use crate::workspace::Workspace;

/// Open the configured store, creating its schema if needed.
pub async fn open_store(config: &Config) -> Result<Arc<dyn Store>> {
    let path = &config.store.path;
    let store: Arc<dyn Store> = match config.store.backend {
        StoreBackend::Sqlite => {
            let pool = db::connect(path)
                .await
                .with_context(|| format!("Failed to open database {}", path.display()))?;
            migrate::run_migrations(&pool).await?;
            Arc::new(SqliteStore::new(pool))
        }
        StoreBackend::File => Arc::new(FileStore::open(path).await?),
    };
    info!(backend = ?config.store.backend, path = %path.display(), "store opened");
    Ok(store)
}

/// Open the configured store and load it into a ready [`Workspace`].
pub async fn open_workspace(config: &Config) -> Result<Workspace> {
    let store = open_store(config).await?;
    let workspace = Workspace::open(store, config.sync.delays()).await;
    workspace.ensure_ready()?;
    Ok(workspace)
}

/// Commit outstanding edits, print notices, and fail if anything was lost.
pub async fn finish(workspace: Workspace) -> Result<()> {
    workspace.flush().await;
    for notice in workspace.drain_notices() {
        eprintln!("Warning: {}", notice);
    }
    let unsaved = workspace.shutdown().await;
    if unsaved > 0 {
        anyhow::bail!("{} edit(s) could not be saved", unsaved);
    }
    Ok(())
}

/// `snipdeck init`: create the database schema or an empty document.
pub async fn run_init(config: &Config) -> Result<()> {
    let path = &config.store.path;
    match config.store.backend {
        StoreBackend::Sqlite => {
            let pool = db::connect(path).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
        }
        StoreBackend::File => {
            FileStore::open(path).await?.save().await?;
        }
    }
    println!("Store initialized at {}", path.display());
    Ok(())
}

mod customers;
mod schema;
mod tokens;

pub use customers::{ContractLink, CustomerRecord, NewCustomer};
pub use tokens::TokenRecord;

use crate::error::StorageError;
use anyhow::Context;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;

/// SQLite-backed persistent store for integration tokens and synced
/// customer records. Cheap to clone; all clones share one pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .context("create database directory")?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&url)
            .await
            .context("open SQLite database")?;

        schema::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// Pinned to a single connection: every pooled connection to
    /// `sqlite::memory:` would otherwise get its own empty database.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("open in-memory SQLite")?;
        schema::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// Liveness probe for the health endpoint.
    pub async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

//! SQLite database handle for the tabula game server.

use std::path::Path;

use sqlx::{Pool, Sqlite};
use tracing::info;

pub use tabula_core::db::DatabaseError;

/// Handle to the server's durable store. Cheap to clone; every component
/// receives its own copy instead of reaching for a process-wide global.
#[derive(Clone)]
pub struct GameDatabase {
    pool: Pool<Sqlite>,
}

impl GameDatabase {
    /// Open or create a database at the given path and run migrations.
    pub async fn open(path: &Path) -> Result<Self, DatabaseError> {
        let pool = tabula_core::db::open_pool(path).await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub async fn open_in_memory() -> Result<Self, DatabaseError> {
        let pool = tabula_core::db::open_pool_in_memory().await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;

        info!("Database migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Flush the WAL into the main database file before shutdown.
    pub async fn checkpoint(&self) -> Result<(), DatabaseError> {
        sqlx::query("PRAGMA wal_checkpoint;")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

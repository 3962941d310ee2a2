use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::database::procedure::{PgProcedureExecutor, ProcedureExecutor};

/// Errors from DatabaseManager and the procedure executors
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Invalid database name: {0}")]
    InvalidDatabaseName(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Failed to decode row: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Hands out ready-to-use procedure executors backed by a shared pool.
#[async_trait]
pub trait SqlPoolSource: Send + Sync {
    /// `None` selects the database named in `DATABASE_URL`
    async fn get_sql_pool(&self, name: Option<&str>) -> Result<Arc<dyn ProcedureExecutor>, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}

/// Lazily created, cached connection pools, one per database name
pub struct DatabaseManager {
    config: DatabaseConfig,
    pools: Arc<RwLock<HashMap<String, PgPool>>>,
}

impl DatabaseManager {
    /// Cache key of the pool for the database named in `DATABASE_URL`
    const DEFAULT_POOL: &'static str = "";

    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            pools: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get existing pool or create a new one lazily
    pub async fn pool(&self, name: Option<&str>) -> Result<PgPool, DatabaseError> {
        let key = name.unwrap_or(Self::DEFAULT_POOL);
        if !key.is_empty() && !Self::is_valid_db_name(key) {
            return Err(DatabaseError::InvalidDatabaseName(key.to_string()));
        }

        // Fast path: try read lock
        {
            let pools = self.pools.read().await;
            if let Some(pool) = pools.get(key) {
                return Ok(pool.clone());
            }
        }

        let connection_string = self.build_connection_string(name)?;

        let pool = PgPoolOptions::new()
            .max_connections(self.config.max_connections)
            .acquire_timeout(Duration::from_secs(self.config.connection_timeout))
            .connect(&connection_string)
            .await?;

        // Another request may have raced us here; keep whichever landed first
        let pool = {
            let mut pools = self.pools.write().await;
            pools.entry(key.to_string()).or_insert(pool).clone()
        };

        info!("Created database pool for: {}", name.unwrap_or("default"));
        Ok(pool)
    }

    fn build_connection_string(&self, database_name: Option<&str>) -> Result<String, DatabaseError> {
        let base = self
            .config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let mut url = url::Url::parse(base).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if let Some(name) = database_name {
            // Replace the path to the database name (ensure leading slash)
            url.set_path(&format!("/{}", name));
        }
        Ok(url.into())
    }

    /// Close and remove all pools (e.g., on shutdown)
    pub async fn close_all(&self) {
        let mut pools = self.pools.write().await;
        for (name, pool) in pools.drain() {
            pool.close().await;
            info!("Closed database pool: {}", if name.is_empty() { "default" } else { &name });
        }
    }

    /// Database names are spliced into connection URLs, keep them to [a-zA-Z0-9_]
    fn is_valid_db_name(name: &str) -> bool {
        !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

#[async_trait]
impl SqlPoolSource for DatabaseManager {
    async fn get_sql_pool(&self, name: Option<&str>) -> Result<Arc<dyn ProcedureExecutor>, DatabaseError> {
        let pool = self.pool(name).await?;
        Ok(Arc::new(PgProcedureExecutor::new(pool)))
    }

    /// Pings the default pool to ensure connectivity
    async fn health_check(&self) -> Result<(), DatabaseError> {
        let pool = self.pool(None).await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(())
    }
}

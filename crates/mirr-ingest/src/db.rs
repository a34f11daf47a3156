//! Destination database setup: connection pool and table preparation

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::credentials::DbCredentials;
use crate::error::{IngestError, Result};
use crate::schema::{create_table_sql, drop_table_sql, COMMENTS_TABLE};

/// Resolved credentials, when present, replace any user/password in the URL.
pub fn connect_options(
    config: &DatabaseConfig,
    credentials: Option<&DbCredentials>,
) -> Result<PgConnectOptions> {
    let mut options = match &config.url {
        Some(url) => PgConnectOptions::from_str(url)
            .map_err(|e| IngestError::config(format!("invalid DATABASE_URL: {}", e)))?,
        None => PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.name),
    };

    if let Some(credentials) = credentials {
        options = options
            .username(&credentials.username)
            .password(&credentials.password);
    }

    Ok(options)
}

pub async fn create_pool(
    config: &DatabaseConfig,
    credentials: Option<&DbCredentials>,
    max_connections: u32,
) -> Result<PgPool> {
    let options = connect_options(config, credentials)?;

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(config.min_connections.min(max_connections))
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect_with(options)
        .await?;

    info!(
        max_connections,
        min_connections = config.min_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

pub async fn health_check(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(IngestError::from)
}

/// Create the `comments` table if needed, dropping it first when `recreate`
/// is set.
pub async fn prepare_table(pool: &PgPool, recreate: bool) -> Result<()> {
    if recreate {
        warn!(table = COMMENTS_TABLE, "Dropping existing table");
        sqlx::query(&drop_table_sql()).execute(pool).await?;
    }

    sqlx::query(&create_table_sql()).execute(pool).await?;
    info!(table = COMMENTS_TABLE, recreated = recreate, "Table ready");
    Ok(())
}

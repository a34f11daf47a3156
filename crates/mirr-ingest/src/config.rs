//! Configuration management
//!
//! Every section loads from the environment, falling back to the `DEFAULT_*`
//! constants below. The binary layers command-line overrides on top and then
//! calls [`IngestConfig::validate`].

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::batcher::DEFAULT_BATCH_SIZE;
use crate::credentials::{CredentialSource, DbCredentials};
use crate::error::{IngestError, Result};
use crate::pool::DEFAULT_CONCURRENCY;
use crate::source::s3::DEFAULT_PAGE_SIZE;

// ============================================================================
// Defaults
// ============================================================================

/// Default AWS region for S3 and Secrets Manager.
pub const DEFAULT_REGION: &str = "us-east-1";

pub const DEFAULT_DATABASE_HOST: &str = "localhost";

pub const DEFAULT_DATABASE_PORT: u16 = 5432;

pub const DEFAULT_DATABASE_NAME: &str = "postgres";

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Connections kept open even while idle.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 1;

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub source: SourceConfig,
    pub database: DatabaseConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceConfig {
    S3(S3SourceConfig),
    Local(LocalSourceConfig),
}

#[derive(Debug, Clone, PartialEq)]
pub struct S3SourceConfig {
    pub bucket: String,
    /// Key prefix, e.g. `WHD/`. Empty means the whole bucket.
    pub prefix: String,
    pub region: String,
    /// Custom endpoint for S3-compatible stores such as MinIO
    pub endpoint: Option<String>,
    pub path_style: bool,
    /// Static keys; when unset the default AWS provider chain is used
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub page_size: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalSourceConfig {
    pub root: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    /// Full connection URL. Host, port and name below are ignored when set.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Secrets Manager secret holding `{"username", "password"}`
    pub secret_id: Option<String>,
    pub secret_region: String,
    /// Pool size; defaults to the worker concurrency
    pub max_connections: Option<u32>,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub batch_size: usize,
    pub concurrency: usize,
    pub serialize_writes: bool,
    /// Drop the table before creating it
    pub recreate_table: bool,
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| IngestError::config(format!("{}={:?} is invalid: {}", key, raw, e))),
        None => Ok(default),
    }
}

fn flag_var(key: &str, default: bool) -> Result<bool> {
    match var(key).map(|raw| raw.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(raw) => match raw.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(IngestError::config(format!("{}={:?} is not a boolean", key, raw))),
        },
    }
}

impl IngestConfig {
    /// Load everything from the environment. The source is S3 when
    /// `S3_BUCKET` is set, otherwise the directory named by `MIRR_SOURCE_DIR`.
    pub fn from_env() -> Result<Self> {
        let source = if var("S3_BUCKET").is_some() {
            SourceConfig::S3(S3SourceConfig::from_env()?)
        } else if let Some(root) = var("MIRR_SOURCE_DIR") {
            SourceConfig::Local(LocalSourceConfig { root: root.into() })
        } else {
            return Err(IngestError::config(
                "no source configured: set S3_BUCKET or MIRR_SOURCE_DIR",
            ));
        };

        let config = Self {
            source,
            database: DatabaseConfig::from_env()?,
            run: RunConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.run.batch_size == 0 {
            return Err(IngestError::config("batch size must be greater than 0"));
        }

        if self.run.concurrency == 0 {
            return Err(IngestError::config("concurrency must be greater than 0"));
        }

        match &self.source {
            SourceConfig::S3(s3) => {
                if s3.bucket.trim().is_empty() {
                    return Err(IngestError::config("S3 bucket cannot be empty"));
                }
                if !(1..=DEFAULT_PAGE_SIZE).contains(&s3.page_size) {
                    return Err(IngestError::config(format!(
                        "S3 page size must be between 1 and {}",
                        DEFAULT_PAGE_SIZE
                    )));
                }
                if s3.access_key.is_some() != s3.secret_key.is_some() {
                    return Err(IngestError::config(
                        "S3_ACCESS_KEY and S3_SECRET_KEY must be set together",
                    ));
                }
            }
            SourceConfig::Local(local) => {
                if local.root.as_os_str().is_empty() {
                    return Err(IngestError::config("source directory cannot be empty"));
                }
            }
        }

        let pool_size = self.database.pool_size(self.run.concurrency);
        if pool_size == 0 {
            return Err(IngestError::config("database max_connections must be greater than 0"));
        }

        if self.database.min_connections > pool_size {
            return Err(IngestError::config(format!(
                "database min_connections ({}) cannot be greater than the pool size ({})",
                self.database.min_connections, pool_size
            )));
        }

        if (pool_size as usize) < self.run.concurrency {
            return Err(IngestError::config(format!(
                "database max_connections ({}) must be at least the concurrency ({})",
                pool_size, self.run.concurrency
            )));
        }

        if self.database.url.is_none() && self.database.host.trim().is_empty() {
            return Err(IngestError::config("database host cannot be empty"));
        }

        Ok(())
    }
}

impl S3SourceConfig {
    /// `S3_BUCKET` may be empty here; [`IngestConfig::validate`] rejects it
    /// unless an override fills it in.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bucket: var("S3_BUCKET").unwrap_or_default(),
            prefix: env::var("S3_PREFIX").unwrap_or_default(),
            region: var("S3_REGION")
                .or_else(|| var("AWS_REGION"))
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            endpoint: var("S3_ENDPOINT"),
            path_style: flag_var("S3_PATH_STYLE", false)?,
            access_key: var("S3_ACCESS_KEY"),
            secret_key: var("S3_SECRET_KEY"),
            page_size: parse_var("S3_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
        })
    }

    pub fn for_minio(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: String::new(),
            region: DEFAULT_REGION.to_string(),
            endpoint: Some(endpoint.into()),
            path_style: true,
            access_key: Some("minioadmin".to_string()),
            secret_key: Some("minioadmin".to_string()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: DEFAULT_DATABASE_HOST.to_string(),
            port: DEFAULT_DATABASE_PORT,
            name: DEFAULT_DATABASE_NAME.to_string(),
            user: None,
            password: None,
            secret_id: None,
            secret_region: DEFAULT_REGION.to_string(),
            max_connections: None,
            min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
            connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            url: var("DATABASE_URL"),
            host: var("DATABASE_HOST").unwrap_or(defaults.host),
            port: parse_var("DATABASE_PORT", defaults.port)?,
            name: var("DATABASE_NAME").unwrap_or(defaults.name),
            user: var("DATABASE_USER"),
            password: env::var("DATABASE_PASSWORD").ok(),
            secret_id: var("DATABASE_SECRET_ID"),
            secret_region: var("DATABASE_SECRET_REGION")
                .or_else(|| var("AWS_REGION"))
                .unwrap_or(defaults.secret_region),
            max_connections: var("DATABASE_MAX_CONNECTIONS")
                .map(|_| parse_var("DATABASE_MAX_CONNECTIONS", 0))
                .transpose()?,
            min_connections: parse_var("DATABASE_MIN_CONNECTIONS", defaults.min_connections)?,
            connect_timeout_secs: parse_var(
                "DATABASE_CONNECT_TIMEOUT",
                defaults.connect_timeout_secs,
            )?,
        })
    }

    /// Where the username and password come from, or `None` when the URL (or
    /// the driver's own defaults) carries them.
    pub fn credential_source(&self) -> Option<CredentialSource> {
        if let Some(secret_id) = &self.secret_id {
            return Some(CredentialSource::SecretsManager {
                secret_id: secret_id.clone(),
                region: self.secret_region.clone(),
            });
        }

        self.user.as_ref().map(|user| {
            CredentialSource::Static(DbCredentials {
                username: user.clone(),
                password: self.password.clone().unwrap_or_default(),
            })
        })
    }

    pub fn pool_size(&self, concurrency: usize) -> u32 {
        self.max_connections
            .unwrap_or_else(|| u32::try_from(concurrency).unwrap_or(u32::MAX))
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            serialize_writes: false,
            recreate_table: false,
        }
    }
}

impl RunConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            batch_size: parse_var("MIRR_BATCH_SIZE", defaults.batch_size)?,
            concurrency: parse_var("MIRR_CONCURRENCY", defaults.concurrency)?,
            serialize_writes: flag_var("MIRR_SERIALIZE_WRITES", defaults.serialize_writes)?,
            recreate_table: flag_var("MIRR_RECREATE_TABLE", defaults.recreate_table)?,
        })
    }
}

//! Shared harness for mirr-ingest integration tests
//!
//! Spins up throwaway PostgreSQL and MinIO containers with testcontainers and
//! writes comment fixtures. Every test gets its own containers, so tables and
//! buckets never leak between tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Client as S3Client;
use mirr_ingest::config::S3SourceConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::minio::MinIO;
use testcontainers_modules::postgres::Postgres;
use tracing::{debug, info};

pub const TEST_BUCKET: &str = "mirrulations-test";

pub const MINIO_ACCESS_KEY: &str = "minioadmin";
pub const MINIO_SECRET_KEY: &str = "minioadmin";

/// Directory layout used by the mirrulations bucket
pub const COMMENTS_DIR: &str = "WHD/WHD-2023-0001/text-WHD-2023-0001/comments";

pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mirr_ingest=debug")),
        )
        .with_test_writer()
        .try_init();
}

// ============================================================================
// PostgreSQL Test Container
// ============================================================================

pub struct TestPostgres {
    _container: ContainerAsync<Postgres>,
    pool: PgPool,
    connection_string: String,
}

impl TestPostgres {
    /// Start PostgreSQL and create the `comments` table.
    pub async fn start() -> Result<Self> {
        info!("Starting PostgreSQL test container...");

        let container = Postgres::default()
            .with_tag("16-alpine")
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?;
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        let connection_string =
            format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);
        debug!("PostgreSQL connection: {}", connection_string);

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&connection_string)
            .await
            .context("Failed to connect to PostgreSQL")?;

        mirr_ingest::db::prepare_table(&pool, false)
            .await
            .context("Failed to create comments table")?;

        Ok(Self {
            _container: container,
            pool,
            connection_string,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub async fn count_comments(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count comments")
    }

    pub async fn comment_exists(&self, id: &str) -> Result<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM comments WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to look up comment")
    }
}

// ============================================================================
// MinIO Test Container
// ============================================================================

pub struct TestMinio {
    _container: ContainerAsync<MinIO>,
    client: S3Client,
    endpoint: String,
    bucket: String,
}

impl TestMinio {
    /// Start MinIO with [`TEST_BUCKET`] created.
    pub async fn start() -> Result<Self> {
        info!("Starting MinIO test container...");

        let container = MinIO::default()
            .start()
            .await
            .context("Failed to start MinIO container")?;

        let host = container
            .get_host()
            .await
            .context("Failed to get MinIO host")?;
        let port = container
            .get_host_port_ipv4(9000.tcp())
            .await
            .context("Failed to get MinIO port")?;

        let endpoint = format!("http://{}:{}", host, port);
        debug!("MinIO endpoint: {}", endpoint);

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&endpoint)
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new(
                MINIO_ACCESS_KEY,
                MINIO_SECRET_KEY,
                None,
                None,
                "static",
            ))
            .force_path_style(true)
            .build();
        let client = S3Client::from_conf(config);

        client
            .create_bucket()
            .bucket(TEST_BUCKET)
            .send()
            .await
            .context("Failed to create S3 bucket")?;

        Ok(Self {
            _container: container,
            client,
            endpoint,
            bucket: TEST_BUCKET.to_string(),
        })
    }

    pub fn client(&self) -> &S3Client {
        &self.client
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn source_config(&self, prefix: &str) -> S3SourceConfig {
        S3SourceConfig {
            prefix: prefix.to_string(),
            ..S3SourceConfig::for_minio(&self.endpoint, &self.bucket)
        }
    }

    pub async fn upload(&self, key: &str, data: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(data.into())
            .send()
            .await
            .with_context(|| format!("Failed to upload {}", key))?;
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// A well-formed comment document
pub fn comment_json(id: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "data": {
            "id": id,
            "type": "comments",
            "links": { "self": format!("https://api.regulations.gov/v4/comments/{}", id) },
            "attributes": {
                "agencyId": "WHD",
                "docketId": "WHD-2023-0001",
                "comment": format!("Comment body for {}", id),
                "postedDate": "2023-03-17T04:00:00Z",
                "pageCount": 1,
                "withdrawn": false,
                "trackingNbr": "lf7-abcd-1234",
            }
        }
    }))
    .unwrap_or_default()
}

pub fn comment_ids(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{}-{:04}", prefix, i)).collect()
}

/// Write one file per document under `root/COMMENTS_DIR`.
pub fn write_comments(root: &Path, documents: &[(String, Vec<u8>)]) -> Result<PathBuf> {
    let dir = root.join(COMMENTS_DIR);
    std::fs::create_dir_all(&dir).context("Failed to create fixture directory")?;
    for (name, body) in documents {
        std::fs::write(dir.join(format!("{}.json", name)), body)
            .with_context(|| format!("Failed to write fixture {}", name))?;
    }
    Ok(dir)
}

pub fn well_formed(ids: &[String]) -> Vec<(String, Vec<u8>)> {
    ids.iter().map(|id| (id.clone(), comment_json(id))).collect()
}

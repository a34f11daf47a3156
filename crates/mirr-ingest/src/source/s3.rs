//! S3 item source
//!
//! Lists a bucket prefix with `ListObjectsV2`, one page at a time, and fetches
//! objects with `GetObject`.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::{config::Region, error::DisplayErrorContext, Client};
use futures::{stream, StreamExt, TryStreamExt};
use tracing::{debug, info, instrument};

use super::{is_comment_key, ItemKey, ItemReader, ItemSource, ItemStream};
use crate::config::S3SourceConfig;
use crate::error::{IngestError, Result};

/// Keys requested per `ListObjectsV2` page; also the S3 maximum
pub const DEFAULT_PAGE_SIZE: i32 = 1000;

#[derive(Clone)]
pub struct S3Source {
    client: Client,
    bucket: String,
    prefix: String,
    page_size: i32,
}

enum ListCursor {
    Start,
    Continue(String),
    Done,
}

impl S3Source {
    /// Build a client from configuration.
    ///
    /// Static keys win when both are set; otherwise the default AWS provider
    /// chain (environment, profile, instance role) supplies credentials.
    pub async fn connect(config: &S3SourceConfig) -> Result<Self> {
        let region = Region::new(config.region.clone());

        let mut builder = match (&config.access_key, &config.secret_key) {
            (Some(access_key), Some(secret_key)) => aws_sdk_s3::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .credentials_provider(Credentials::new(
                    access_key,
                    secret_key,
                    None,
                    None,
                    "mirr-static",
                ))
                .region(region),
            _ => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(region)
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            }
        };

        builder = builder.force_path_style(config.path_style);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(builder.build());

        info!(
            bucket = %config.bucket,
            prefix = %config.prefix,
            endpoint = ?config.endpoint,
            "S3 source initialized"
        );

        Ok(Self::new(client, &config.bucket, &config.prefix).with_page_size(config.page_size))
    }

    pub fn new(client: Client, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = page_size.clamp(1, DEFAULT_PAGE_SIZE);
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ItemSource for S3Source {
    fn scope(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.prefix)
    }

    fn items(&self) -> ItemStream<'_> {
        stream::try_unfold(ListCursor::Start, move |cursor| async move {
            let token = match cursor {
                ListCursor::Done => return Ok::<_, IngestError>(None),
                ListCursor::Start => None,
                ListCursor::Continue(token) => Some(token),
            };

            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&self.prefix)
                .max_keys(self.page_size)
                .set_continuation_token(token)
                .send()
                .await
                .map_err(|e| IngestError::enumeration(self.scope(), DisplayErrorContext(&e)))?;

            let keys: Vec<Result<ItemKey>> = page
                .contents()
                .iter()
                .filter_map(|object| object.key())
                .filter(|key| is_comment_key(key))
                .map(|key| Ok(ItemKey::new(key)))
                .collect();

            debug!(
                listed = page.key_count().unwrap_or_default(),
                matched = keys.len(),
                "Listed S3 page"
            );

            let next = match (page.is_truncated(), page.next_continuation_token()) {
                (Some(true), Some(token)) => ListCursor::Continue(token.to_string()),
                _ => ListCursor::Done,
            };

            Ok(Some((stream::iter(keys), next)))
        })
        .try_flatten()
        .boxed()
    }

    async fn reader(&self) -> Result<Box<dyn ItemReader>> {
        Ok(Box::new(S3Reader {
            client: self.client.clone(),
            bucket: self.bucket.clone(),
        }))
    }
}

/// Per-worker handle; clones share the client's connection pool
pub struct S3Reader {
    client: Client,
    bucket: String,
}

#[async_trait]
impl ItemReader for S3Reader {
    #[instrument(level = "debug", skip(self), fields(bucket = %self.bucket))]
    async fn fetch(&mut self, key: &ItemKey) -> Result<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await
            .map_err(|e| IngestError::item_fetch(key.as_str(), DisplayErrorContext(&e)))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| IngestError::item_fetch(key.as_str(), e))?
            .into_bytes()
            .to_vec();

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_client() -> Client {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("test", "test", None, None, "test"))
            .endpoint_url("http://127.0.0.1:1")
            .force_path_style(true)
            .build();
        Client::from_conf(config)
    }

    #[test]
    fn test_scope_includes_bucket_and_prefix() {
        let source = S3Source::new(offline_client(), "mirrulations", "WHD/");
        assert_eq!(source.scope(), "s3://mirrulations/WHD/");
        assert_eq!(source.bucket(), "mirrulations");
    }

    #[test]
    fn test_page_size_is_clamped() {
        let source = S3Source::new(offline_client(), "b", "").with_page_size(5000);
        assert_eq!(source.page_size, DEFAULT_PAGE_SIZE);

        let source = S3Source::new(offline_client(), "b", "").with_page_size(0);
        assert_eq!(source.page_size, 1);
    }

    #[tokio::test]
    async fn test_unreachable_listing_ends_with_enumeration_error() {
        let config = offline_client()
            .config()
            .to_builder()
            .retry_config(aws_sdk_s3::config::retry::RetryConfig::disabled())
            .build();
        let source = S3Source::new(Client::from_conf(config), "mirrulations", "WHD/");

        let results: Vec<Result<ItemKey>> = source.items().collect().await;

        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Err(IngestError::SourceEnumeration { .. })
        ));
    }
}

//! Item sources
//!
//! An [`ItemSource`] enumerates comment documents under a root scope and hands
//! out per-worker [`ItemReader`]s to fetch their bytes. Two variants exist:
//! [`S3Source`] for a bucket prefix and [`LocalSource`] for a directory tree.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;

pub mod local;
pub mod s3;

pub use local::LocalSource;
pub use s3::S3Source;

/// Items must end with this suffix
pub const ITEM_SUFFIX: &str = ".json";

/// ...and have a path segment equal to this
pub const ITEM_MARKER_SEGMENT: &str = "comments";

/// Opaque address of one document: an S3 object key or a file path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemKey(String);

impl ItemKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn from_path(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inclusion predicate for `/`-separated object keys.
pub fn is_comment_key(key: &str) -> bool {
    key.ends_with(ITEM_SUFFIX) && key.split('/').any(|segment| segment == ITEM_MARKER_SEGMENT)
}

/// Inclusion predicate for filesystem paths, checked per path component.
pub fn is_comment_path(path: &Path) -> bool {
    let json = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(ITEM_SUFFIX));

    json && path
        .components()
        .any(|component| component.as_os_str() == ITEM_MARKER_SEGMENT)
}

/// Lazy stream of matching keys. An `Err` item ends enumeration.
pub type ItemStream<'a> = BoxStream<'a, Result<ItemKey>>;

#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Human-readable root scope, e.g. `s3://bucket/prefix`
    fn scope(&self) -> String;

    fn items(&self) -> ItemStream<'_>;

    /// Open a reader owned by one worker for the lifetime of one batch.
    async fn reader(&self) -> Result<Box<dyn ItemReader>>;
}

#[async_trait]
pub trait ItemReader: Send {
    async fn fetch(&mut self, key: &ItemKey) -> Result<Vec<u8>>;
}

//! Local directory item source
//!
//! Walks a directory tree on a blocking thread and feeds matching paths through
//! a bounded channel, so a huge tree never has to be held in memory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{is_comment_path, ItemKey, ItemReader, ItemSource, ItemStream};
use crate::error::{IngestError, Result};

pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
    channel_capacity: usize,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Runs on a blocking thread. Returns when the walk ends, an entry fails, or
/// the receiving side hangs up.
fn walk(root: PathBuf, scope: String, tx: mpsc::Sender<Result<ItemKey>>) {
    if !root.is_dir() {
        let _ = tx.blocking_send(Err(IngestError::enumeration(
            scope,
            format!("{} is not a directory", root.display()),
        )));
        return;
    }

    for entry in WalkDir::new(&root).follow_links(false) {
        let message = match entry {
            Ok(entry) => {
                if !entry.file_type().is_file() || !is_comment_path(entry.path()) {
                    continue;
                }
                Ok(ItemKey::from_path(entry.path()))
            }
            Err(e) => Err(IngestError::enumeration(scope.clone(), e)),
        };

        let failed = message.is_err();
        if tx.blocking_send(message).is_err() {
            debug!("Item consumer dropped, stopping directory walk");
            return;
        }
        if failed {
            warn!(root = %root.display(), "Directory walk stopped on error");
            return;
        }
    }
}

#[async_trait]
impl ItemSource for LocalSource {
    fn scope(&self) -> String {
        self.root.display().to_string()
    }

    /// Must be called from within a Tokio runtime.
    fn items(&self) -> ItemStream<'_> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let root = self.root.clone();
        let scope = self.scope();

        tokio::task::spawn_blocking(move || walk(root, scope, tx));

        ReceiverStream::new(rx).boxed()
    }

    async fn reader(&self) -> Result<Box<dyn ItemReader>> {
        Ok(Box::new(LocalReader))
    }
}

pub struct LocalReader;

#[async_trait]
impl ItemReader for LocalReader {
    async fn fetch(&mut self, key: &ItemKey) -> Result<Vec<u8>> {
        tokio::fs::read(key.as_str())
            .await
            .map_err(|e| IngestError::item_fetch(key.as_str(), e))
    }
}

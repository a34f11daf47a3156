//! Groups the item stream into fixed-size batches

use futures::future;
use futures::stream::{BoxStream, StreamExt, TryChunksError, TryStreamExt};

use crate::error::Result;
use crate::source::{ItemKey, ItemStream};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// A unit of work: up to `batch_size` item keys, numbered from 1 in the order
/// batches were formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub number: u64,
    pub items: Vec<ItemKey>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Every batch holds exactly `size` items except possibly the last. The first
/// enumeration error is forwarded and ends the stream; items collected for the
/// unfinished batch at that point are discarded.
pub fn batches(items: ItemStream<'_>, size: usize) -> BoxStream<'_, Result<Batch>> {
    items
        .try_chunks(size.max(1))
        .map_err(|TryChunksError(_, e)| e)
        .enumerate()
        .map(|(index, chunk)| {
            chunk.map(|items| Batch {
                number: index as u64 + 1,
                items,
            })
        })
        .scan(false, |failed, batch| {
            if *failed {
                return future::ready(None);
            }
            *failed = batch.is_err();
            future::ready(Some(batch))
        })
        .boxed()
}

//! Bounded worker pool
//!
//! Every batch runs as its own Tokio task. A semaphore caps the number of tasks
//! in flight, and the producer takes a permit *before* pulling the next batch
//! from the stream, so at most `concurrency + 1` batches exist at any time.
//!
//! [`WorkerPool::run`] returns only after every spawned task has finished. A
//! failing or panicking batch is logged and counted; it never cancels its
//! siblings.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::batcher::Batch;
use crate::error::{IngestError, Result};
use crate::report::{BatchOutcome, BatchReport, RunSummary};

pub const DEFAULT_CONCURRENCY: usize = 15;

/// Body of one batch task
#[async_trait]
pub trait BatchHandler: Send + Sync + 'static {
    /// Process a batch to completion. Failures are reported through
    /// [`BatchOutcome::Failed`], never returned.
    async fn handle(&self, batch: Batch) -> BatchReport;
}

pub struct WorkerPool<H> {
    handler: Arc<H>,
    concurrency: usize,
}

impl<H: BatchHandler> WorkerPool<H> {
    pub fn new(handler: H, concurrency: usize) -> Self {
        Self::from_arc(Arc::new(handler), concurrency)
    }

    pub fn from_arc(handler: Arc<H>, concurrency: usize) -> Self {
        Self {
            handler,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Drive `batches` to completion.
    ///
    /// If the stream yields an error, no further batches are submitted; the
    /// batches already running are awaited and then the error is returned.
    pub async fn run(&self, mut batches: BoxStream<'_, Result<Batch>>) -> Result<RunSummary> {
        let started = Instant::now();
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks: JoinSet<BatchReport> = JoinSet::new();
        let mut summary = RunSummary::default();
        let mut failure: Option<IngestError> = None;

        loop {
            while let Some(joined) = tasks.try_join_next() {
                absorb(&mut summary, joined);
            }

            let permit = match Arc::clone(&permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    failure = Some(IngestError::config(format!("worker pool closed: {e}")));
                    break;
                }
            };

            let batch = match batches.next().await {
                None => break,
                Some(Ok(batch)) => batch,
                Some(Err(e)) => {
                    error!(error = %e, "Item enumeration failed, no further batches will be submitted");
                    failure = Some(e);
                    break;
                }
            };

            let handler = Arc::clone(&self.handler);
            let number = batch.number;
            let items = batch.len();
            debug!(batch = number, items, in_flight = tasks.len() + 1, "Submitting batch");

            tasks.spawn(
                async move {
                    let _permit = permit;
                    match AssertUnwindSafe(handler.handle(batch)).catch_unwind().await {
                        Ok(report) => report,
                        Err(panic) => BatchReport::abandoned(
                            number,
                            items,
                            format!("batch task panicked: {}", panic_message(panic.as_ref())),
                        ),
                    }
                }
                .instrument(info_span!("batch", number, items)),
            );
        }

        if !tasks.is_empty() {
            debug!(in_flight = tasks.len(), "Waiting for in-flight batches");
        }
        while let Some(joined) = tasks.join_next().await {
            absorb(&mut summary, joined);
        }

        summary.elapsed = started.elapsed();

        match failure {
            Some(e) => {
                warn!(summary = %summary, "Run aborted after draining in-flight batches");
                Err(e)
            }
            None => Ok(summary),
        }
    }
}

fn absorb(summary: &mut RunSummary, joined: std::result::Result<BatchReport, JoinError>) {
    let report = match joined {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Batch task did not complete");
            summary.batches_total += 1;
            summary.batches_failed += 1;
            return;
        }
    };

    match &report.outcome {
        BatchOutcome::Written(outcome) => info!(
            batch = report.number,
            inserted = outcome.inserted,
            skipped = outcome.skipped,
            dropped = report.items_dropped,
            "Batch committed"
        ),
        BatchOutcome::Empty => info!(
            batch = report.number,
            dropped = report.items_dropped,
            "Batch had no usable records"
        ),
        BatchOutcome::Failed(reason) => error!(
            batch = report.number,
            items = report.items,
            reason = %reason,
            "Batch failed"
        ),
    }

    summary.record(&report);
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

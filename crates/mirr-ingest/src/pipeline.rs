//! Pipeline driver
//!
//! [`run_pipeline`] wires everything together: resolve credentials, open the
//! pool, prepare the table, build the source and drive the worker pool.
//! [`Pipeline`] is the part that runs against an already-built source and
//! writer, which is what the integration tests use.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::batcher::batches;
use crate::config::{IngestConfig, RunConfig, SourceConfig};
use crate::db;
use crate::error::Result;
use crate::handler::CommentBatchHandler;
use crate::pool::WorkerPool;
use crate::report::RunSummary;
use crate::source::{ItemSource, LocalSource, S3Source};
use crate::writer::BatchWriter;

pub struct Pipeline {
    source: Arc<dyn ItemSource>,
    writer: BatchWriter,
    batch_size: usize,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(source: Arc<dyn ItemSource>, writer: BatchWriter, run: &RunConfig) -> Self {
        Self {
            source,
            writer,
            batch_size: run.batch_size,
            concurrency: run.concurrency,
        }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        info!(
            scope = %self.source.scope(),
            batch_size = self.batch_size,
            concurrency = self.concurrency,
            serialize_writes = self.writer.serializes_writes(),
            "Starting ingestion"
        );

        let handler = CommentBatchHandler::new(Arc::clone(&self.source), self.writer.clone());
        let pool = WorkerPool::new(handler, self.concurrency);

        let summary = pool
            .run(batches(self.source.items(), self.batch_size))
            .await?;

        if summary.is_clean() {
            info!(summary = %summary, "Ingestion finished");
        } else {
            warn!(summary = %summary, "Ingestion finished with failures");
        }

        Ok(summary)
    }
}

pub async fn build_source(config: &SourceConfig) -> Result<Arc<dyn ItemSource>> {
    let source: Arc<dyn ItemSource> = match config {
        SourceConfig::S3(s3) => Arc::new(S3Source::connect(s3).await?),
        SourceConfig::Local(local) => Arc::new(LocalSource::new(&local.root)),
    };
    Ok(source)
}

/// Run a full ingestion described by `config`.
///
/// Setup failures (credentials, pool, DDL, source construction) are returned
/// before any batch runs. After that only an enumeration failure returns
/// `Err`; everything else is counted in the summary.
#[instrument(skip_all)]
pub async fn run_pipeline(config: &IngestConfig) -> Result<RunSummary> {
    config.validate()?;

    let credentials = match config.database.credential_source() {
        Some(source) => Some(source.resolve().await?),
        None => None,
    };

    let pool_size = config.database.pool_size(config.run.concurrency);
    let pg = db::create_pool(&config.database, credentials.as_ref(), pool_size).await?;
    db::health_check(&pg).await?;
    db::prepare_table(&pg, config.run.recreate_table).await?;

    let source = build_source(&config.source).await?;
    let writer = BatchWriter::new(pg.clone()).with_serialized_writes(config.run.serialize_writes);

    let result = Pipeline::new(source, writer, &config.run).run().await;
    pg.close().await;
    result
}

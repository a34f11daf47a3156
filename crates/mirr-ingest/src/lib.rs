//! Mirrulations comment ingestion
//!
//! Loads regulations.gov comment documents from S3 (or a local mirror of the
//! bucket) into the Postgres `comments` table.
//!
//! # Pipeline
//!
//! ```text
//! ItemSource ──keys──> batcher ──Batch──> WorkerPool ──> CommentBatchHandler
//!                                           (N tasks)      fetch → parse → write
//! ```
//!
//! Each batch is inserted in its own transaction with
//! `ON CONFLICT (id) DO NOTHING`, so re-running over the same scope is safe.
//! Item-level failures drop a single document; batch-level failures lose one
//! batch; only a failure to enumerate the source ends the run early.
//!
//! # Example
//!
//! ```no_run
//! use mirr_ingest::{run_pipeline, IngestConfig};
//!
//! # async fn example() -> mirr_ingest::Result<()> {
//! let config = IngestConfig::from_env()?;
//! let summary = run_pipeline(&config).await?;
//! println!("{}", summary);
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod batcher;
pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod handler;
pub mod parser;
pub mod pipeline;
pub mod pool;
pub mod record;
pub mod report;
pub mod schema;
pub mod source;
pub mod writer;

pub use batcher::{batches, Batch, DEFAULT_BATCH_SIZE};
pub use config::{DatabaseConfig, IngestConfig, LocalSourceConfig, RunConfig, S3SourceConfig, SourceConfig};
pub use credentials::{CredentialSource, DbCredentials};
pub use error::{ErrorScope, IngestError, Result};
pub use handler::CommentBatchHandler;
pub use parser::parse_comment;
pub use pipeline::{build_source, run_pipeline, Pipeline};
pub use pool::{BatchHandler, WorkerPool, DEFAULT_CONCURRENCY};
pub use record::{CommentRecord, FieldValue};
pub use report::{BatchOutcome, BatchReport, RunSummary};
pub use source::{ItemKey, ItemReader, ItemSource, LocalSource, S3Source};
pub use writer::{BatchWriter, WriteOutcome};

//! Transactional batch writer for the `comments` table

use std::sync::Arc;

use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnection, PgPool};
use sqlx::{Connection, Postgres, QueryBuilder};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{IngestError, Result};
use crate::record::{CommentRecord, FieldValue};
use crate::schema::{column_list, ColumnKind, COLUMNS_PER_ROW, COMMENTS_TABLE};

/// Postgres caps a single statement at this many bind parameters
pub const MAX_BIND_PARAMETERS: usize = 65_535;

pub const MAX_ROWS_PER_STATEMENT: usize = MAX_BIND_PARAMETERS / COLUMNS_PER_ROW;

/// Rows written by one committed batch. `skipped` rows hit an existing id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    pub inserted: u64,
    pub skipped: u64,
}

#[derive(Clone)]
pub struct BatchWriter {
    pool: PgPool,
    write_lock: Option<Arc<Mutex<()>>>,
}

impl BatchWriter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            write_lock: None,
        }
    }

    /// Hold one process-wide lock around every batch transaction.
    pub fn with_serialized_writes(mut self, enabled: bool) -> Self {
        self.write_lock = enabled.then(|| Arc::new(Mutex::new(())));
        self
    }

    pub fn serializes_writes(&self) -> bool {
        self.write_lock.is_some()
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check out a connection for the lifetime of one batch.
    pub async fn acquire(&self) -> Result<PoolConnection<Postgres>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| IngestError::acquisition("database connection", e))
    }

    pub async fn write(
        &self,
        conn: &mut PgConnection,
        records: &[CommentRecord],
    ) -> Result<WriteOutcome> {
        if records.is_empty() {
            return Ok(WriteOutcome::default());
        }

        let _guard = match &self.write_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        insert_records(conn, records).await
    }
}

/// Insert `records` in one transaction, skipping ids that already exist.
///
/// All rows commit together or none do. Batches larger than
/// [`MAX_ROWS_PER_STATEMENT`] are split over several statements inside the
/// same transaction.
pub async fn insert_records(
    conn: &mut PgConnection,
    records: &[CommentRecord],
) -> Result<WriteOutcome> {
    if records.is_empty() {
        return Ok(WriteOutcome::default());
    }

    let mut tx = conn.begin().await.map_err(IngestError::BatchWrite)?;
    let mut inserted = 0u64;

    for chunk in records.chunks(MAX_ROWS_PER_STATEMENT) {
        match insert_statement(chunk).build().execute(&mut *tx).await {
            Ok(done) => inserted += done.rows_affected(),
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "Rollback failed, connection will be discarded");
                }
                return Err(IngestError::BatchWrite(e));
            }
        }
    }

    tx.commit().await.map_err(IngestError::BatchWrite)?;

    let outcome = WriteOutcome {
        inserted,
        skipped: records.len() as u64 - inserted,
    };
    debug!(inserted = outcome.inserted, skipped = outcome.skipped, "Committed records");
    Ok(outcome)
}

fn insert_statement(records: &[CommentRecord]) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::new(format!(
        "INSERT INTO {} ({}) ",
        COMMENTS_TABLE,
        column_list()
    ));

    builder.push_values(records, |mut row, record| {
        row.push_bind(record.id()).push_bind(record.apiurl());

        for (field, value) in record.fields() {
            match field.kind {
                ColumnKind::Text => row.push_bind(value.and_then(FieldValue::as_text)),
                ColumnKind::Integer => row.push_bind(value.and_then(FieldValue::as_integer)),
                ColumnKind::Timestamp => row.push_bind(value.and_then(FieldValue::as_timestamp)),
                ColumnKind::Boolean => row.push_bind(value.and_then(FieldValue::as_boolean)),
            };
        }
    });

    builder.push(" ON CONFLICT (id) DO NOTHING");
    builder
}

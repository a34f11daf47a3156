//! Per-batch reports and the run summary

use std::fmt;
use std::time::Duration;

use crate::writer::WriteOutcome;

/// What happened to one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The transaction committed.
    Written(WriteOutcome),
    /// No record survived parsing, so nothing was written.
    Empty,
    /// Write rolled back, resources could not be acquired, or the task died.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub number: u64,
    /// Item keys in the batch
    pub items: usize,
    pub records_parsed: usize,
    /// Items that never became a record (fetch or parse failure, or the whole
    /// batch when it was abandoned before any item was read)
    pub items_dropped: usize,
    pub outcome: BatchOutcome,
}

impl BatchReport {
    /// A batch given up on before any item was processed.
    pub fn abandoned(number: u64, items: usize, reason: impl Into<String>) -> Self {
        Self {
            number,
            items,
            records_parsed: 0,
            items_dropped: items,
            outcome: BatchOutcome::Failed(reason.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Failed(_))
    }
}

/// Totals across every batch of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub batches_total: u64,
    pub batches_failed: u64,
    pub items_total: u64,
    pub items_dropped: u64,
    pub records_inserted: u64,
    pub records_skipped: u64,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn record(&mut self, report: &BatchReport) {
        self.batches_total += 1;
        self.items_total += report.items as u64;
        self.items_dropped += report.items_dropped as u64;

        match &report.outcome {
            BatchOutcome::Written(outcome) => {
                self.records_inserted += outcome.inserted;
                self.records_skipped += outcome.skipped;
            }
            BatchOutcome::Empty => {}
            BatchOutcome::Failed(_) => self.batches_failed += 1,
        }
    }

    /// True when no batch failed and no item was dropped
    pub fn is_clean(&self) -> bool {
        self.batches_failed == 0 && self.items_dropped == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} batches ({} failed), {} items ({} dropped), {} inserted, {} skipped in {:.2?}",
            self.batches_total,
            self.batches_failed,
            self.items_total,
            self.items_dropped,
            self.records_inserted,
            self.records_skipped,
            self.elapsed
        )
    }
}

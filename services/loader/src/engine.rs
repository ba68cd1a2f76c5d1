//! Batch upsert engine.
//!
//! Iterates input rows in fixed-size batches; each batch is one
//! transaction. Per-row failures that only concern that row (an
//! unresolvable parent, an unrepairable tally, a unique-constraint hit)
//! are absorbed and counted; anything else rolls the whole batch back and
//! propagates to the orchestrator.

use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{is_unique_violation, LoadError, Result};

/// Per-stage load statistics, aggregated into the pipeline report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub rows_read: u64,
    pub inserted: u64,
    pub skipped_duplicate: u64,
    pub skipped_unresolvable: u64,
    pub skipped_incoherent: u64,
    pub corrections: u64,
    pub parents_created: u64,
    pub batches: u64,
}

impl LoadStats {
    pub fn merge(&mut self, other: &LoadStats) {
        self.rows_read += other.rows_read;
        self.inserted += other.inserted;
        self.skipped_duplicate += other.skipped_duplicate;
        self.skipped_unresolvable += other.skipped_unresolvable;
        self.skipped_incoherent += other.skipped_incoherent;
        self.corrections += other.corrections;
        self.parents_created += other.parents_created;
        self.batches += other.batches;
    }

    pub fn skipped_total(&self) -> u64 {
        self.skipped_duplicate + self.skipped_unresolvable + self.skipped_incoherent
    }
}

/// Outcome of staging one row inside the current batch transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// Row staged for insertion, with the number of coherence corrections
    /// that were applied to it.
    Inserted { corrections: u32 },
    /// Row already present (preloaded keys or earlier in this run).
    Duplicate,
    /// Row rejected by the coherence corrector; reason is logged.
    Incoherent(&'static str),
}

/// One entity loader's row handler. Implementations resolve parents via
/// the reference caches, apply coherence where applicable, deduplicate
/// against their key set, and stage the INSERT on the given connection
/// (the open batch transaction).
#[async_trait]
pub trait RowSink {
    type Row: Send + Sync;

    /// Natural-key rendering of a row, for skip logging.
    fn describe(row: &Self::Row) -> String;

    async fn stage(&mut self, conn: &mut SqliteConnection, row: &Self::Row)
        -> Result<RowOutcome>;
}

pub async fn load_in_batches<S>(
    pool: &SqlitePool,
    sink: &mut S,
    rows: &[S::Row],
    batch_size: usize,
) -> Result<LoadStats>
where
    S: RowSink + Send,
{
    let mut stats = LoadStats {
        rows_read: rows.len() as u64,
        ..LoadStats::default()
    };

    for (batch_idx, chunk) in rows.chunks(batch_size.max(1)).enumerate() {
        let mut tx = pool.begin().await?;

        for row in chunk {
            match sink.stage(&mut tx, row).await {
                Ok(RowOutcome::Inserted { corrections }) => {
                    stats.inserted += 1;
                    stats.corrections += u64::from(corrections);
                }
                Ok(RowOutcome::Duplicate) => {
                    stats.skipped_duplicate += 1;
                }
                Ok(RowOutcome::Incoherent(reason)) => {
                    warn!(row = %S::describe(row), reason, "row rejected as incoherent");
                    stats.skipped_incoherent += 1;
                }
                Err(LoadError::MissingDependency { entity, key }) => {
                    warn!(
                        row = %S::describe(row),
                        entity,
                        key = %key,
                        "row skipped: unresolvable reference"
                    );
                    stats.skipped_unresolvable += 1;
                }
                // Check-then-insert is not atomic under an external writer;
                // the unique constraint is the backstop and hitting it is a
                // duplicate, not a batch failure.
                Err(LoadError::Storage(e)) if is_unique_violation(&e) => {
                    warn!(
                        row = %S::describe(row),
                        error = %e,
                        "unique constraint hit, counted as duplicate"
                    );
                    stats.skipped_duplicate += 1;
                }
                Err(other) => {
                    tx.rollback().await.ok();
                    return Err(other);
                }
            }
        }

        tx.commit().await?;
        stats.batches += 1;
        debug!(
            batch = batch_idx + 1,
            inserted = stats.inserted,
            skipped = stats.skipped_total(),
            "batch committed"
        );
    }

    Ok(stats)
}

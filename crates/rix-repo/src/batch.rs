//! Background deletion of many readings.
//!
//! Deletion runs in fixed-size chunks, each committed as its own
//! transaction. A failed chunk leaves its readings fully in place and the
//! run moves on to the next chunk. Outcomes are reported through `tracing`
//! only; the returned [`BatchDeleteSummary`] carries counts, not errors.

use std::collections::HashSet;

use rix_kv::{KvStore, PooledConnection, Transaction};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::codec;
use crate::repository::ReadingRepository;

/// Counters describing one batch deletion run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchDeleteSummary {
    /// Ids handed to the run.
    pub requested: usize,
    /// Repeats of an id already seen earlier in the request.
    pub duplicates: usize,
    /// Distinct ids with a stored blob at read time.
    pub fetched: usize,
    /// Distinct ids with no stored blob at read time.
    pub missing: usize,
    /// Fetched readings left in place because their blob would not decode.
    pub skipped: usize,
    /// Readings removed by committed chunks.
    pub deleted: usize,
    pub chunks_committed: usize,
    pub chunks_failed: usize,
    /// The initial read failed and nothing was attempted.
    pub aborted: bool,
}

impl<S: KvStore + ?Sized> ReadingRepository<S> {
    /// Delete the readings with the given ids, `batch_size` per transaction.
    ///
    /// Never fails as a whole. A failure to read the readings up front aborts
    /// before any mutation; every later failure only affects its own reading
    /// or chunk. Each distinct id is handled once, in first-seen order.
    pub async fn purge_readings(&self, ids: &[String]) -> BatchDeleteSummary {
        let mut summary = BatchDeleteSummary {
            requested: ids.len(),
            ..Default::default()
        };
        if ids.is_empty() {
            return summary;
        }

        let conn = match self.connection().await {
            Ok(conn) => conn,
            Err(e) => {
                error!(
                    error = %e,
                    count = ids.len(),
                    "batch reading deletion failed to acquire a connection"
                );
                summary.aborted = true;
                return summary;
            }
        };

        let mut seen = HashSet::with_capacity(ids.len());
        let stored_keys: Vec<String> = ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .map(|id| self.keys.stored_key(id))
            .collect();
        summary.duplicates = ids.len() - stored_keys.len();

        let blobs = match conn.mget(&stored_keys).await {
            Ok(blobs) => blobs,
            Err(e) => {
                error!(
                    error = %e,
                    count = stored_keys.len(),
                    "batch reading deletion failed while retrieving readings"
                );
                summary.aborted = true;
                return summary;
            }
        };

        let chunk_len = self.batch_size.min(stored_keys.len());
        let mut tx = Transaction::with_capacity(chunk_len.saturating_mul(4));
        let mut queued = 0;
        for (stored_key, blob) in stored_keys.iter().zip(blobs) {
            let Some(blob) = blob else {
                debug!(key = %stored_key, "reading already absent");
                summary.missing += 1;
                continue;
            };
            summary.fetched += 1;

            let base = match codec::decode_base(&blob) {
                Ok(base) => base,
                Err(e) => {
                    warn!(
                        key = %stored_key,
                        error = %e,
                        "unable to decode reading; leaving it in place"
                    );
                    summary.skipped += 1;
                    continue;
                }
            };

            self.queue_removal(&mut tx, stored_key, &base.device_name);
            queued += 1;

            if queued >= self.batch_size {
                commit_chunk(&conn, std::mem::take(&mut tx), queued, &mut summary).await;
                queued = 0;
            }
        }

        if queued > 0 {
            commit_chunk(&conn, tx, queued, &mut summary).await;
        }

        info!(
            requested = summary.requested,
            deleted = summary.deleted,
            skipped = summary.skipped,
            missing = summary.missing,
            chunks_failed = summary.chunks_failed,
            "batch reading deletion finished"
        );
        summary
    }
}

impl<S: KvStore + ?Sized + 'static> ReadingRepository<S> {
    /// Run [`purge_readings`](Self::purge_readings) as a background task.
    ///
    /// The caller is not held while the deletion runs. Dropping the handle
    /// detaches the task; awaiting it yields the summary.
    pub fn delete_readings_by_ids(&self, ids: Vec<String>) -> JoinHandle<BatchDeleteSummary> {
        let repo = self.clone();
        tokio::spawn(async move { repo.purge_readings(&ids).await })
    }
}

async fn commit_chunk<S: KvStore + ?Sized>(
    conn: &PooledConnection<S>,
    tx: Transaction,
    readings: usize,
    summary: &mut BatchDeleteSummary,
) {
    match conn.exec(tx).await {
        Ok(()) => {
            summary.chunks_committed += 1;
            summary.deleted += readings;
            debug!(readings, "batch deletion chunk committed");
        }
        Err(e) => {
            summary.chunks_failed += 1;
            error!(error = %e, readings, "unable to execute batch reading deletion");
        }
    }
}

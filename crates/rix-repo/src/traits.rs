use async_trait::async_trait;
use rix_types::{Reading, Timestamp};

use crate::error::RepoResult;

/// Write boundary for reading create and delete operations.
#[async_trait]
pub trait ReadingWriter: Send + Sync {
    /// Persist a reading together with its three index entries.
    ///
    /// Fills in a generated id and the current time when they are missing,
    /// and returns the reading exactly as stored.
    async fn add_reading(&self, reading: Reading) -> RepoResult<Reading>;

    /// Persist several readings in one transaction.
    ///
    /// Nothing is written if any reading fails validation.
    async fn add_readings(&self, readings: Vec<Reading>) -> RepoResult<Vec<Reading>>;

    /// Remove a reading and its index entries. Fails if it does not exist.
    async fn delete_reading_by_id(&self, id: &str) -> RepoResult<()>;
}

/// Read boundary for reading lookups and index enumeration.
#[async_trait]
pub trait ReadingReader: Send + Sync {
    async fn reading_by_id(&self, id: &str) -> RepoResult<Reading>;

    /// Every reading of `owner`, oldest first, decoded as simple readings.
    async fn readings_by_owner(&self, owner: &str) -> RepoResult<Vec<Reading>>;

    /// Ranks `start..=stop` of `owner`'s index. Negative ranks count from
    /// the newest reading.
    async fn readings_by_owner_range(
        &self,
        owner: &str,
        start: i64,
        stop: i64,
    ) -> RepoResult<Vec<Reading>>;

    /// Newest readings first, skipping `offset`.
    async fn all_readings(&self, offset: usize, limit: usize) -> RepoResult<Vec<Reading>>;

    /// Readings created within `start..=end`, oldest first.
    async fn readings_by_time_range(
        &self,
        start: Timestamp,
        end: Timestamp,
        offset: usize,
        limit: usize,
    ) -> RepoResult<Vec<Reading>>;

    async fn reading_count(&self) -> RepoResult<u64>;

    async fn reading_count_by_owner(&self, owner: &str) -> RepoResult<u64>;
}

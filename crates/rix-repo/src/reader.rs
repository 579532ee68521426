use async_trait::async_trait;
use rix_kv::KvStore;
use rix_types::{Reading, Timestamp};
use tracing::debug;

use crate::codec;
use crate::error::{RepoError, RepoResult};
use crate::repository::ReadingRepository;
use crate::traits::ReadingReader;

type Decode = fn(&str, &[u8]) -> RepoResult<Reading>;

// Payloads are never stored, so owner listings only reconstruct simple readings.
fn decode_as_simple(key: &str, blob: &[u8]) -> RepoResult<Reading> {
    codec::decode_simple(key, blob).map(Reading::from)
}

/// Inclusive rank window for `limit` entries starting at `offset`.
fn rank_window(offset: usize, limit: usize) -> (i64, i64) {
    let start = i64::try_from(offset).unwrap_or(i64::MAX);
    let span = i64::try_from(limit).unwrap_or(i64::MAX);
    (start, start.saturating_add(span - 1))
}

/// Resolve stored keys to readings. Keys whose blob is gone by the time it
/// is fetched (deleted after the index read) are left out.
async fn load<S: KvStore + ?Sized>(
    store: &S,
    stored_keys: Vec<String>,
    decode: Decode,
) -> RepoResult<Vec<Reading>> {
    if stored_keys.is_empty() {
        return Ok(Vec::new());
    }
    let blobs = store
        .mget(&stored_keys)
        .await
        .map_err(|e| RepoError::database("retrieving readings failed", e))?;

    let mut readings = Vec::with_capacity(blobs.len());
    for (key, blob) in stored_keys.iter().zip(blobs) {
        match blob {
            Some(blob) => readings.push(decode(key, &blob)?),
            None => debug!(key = %key, "indexed reading vanished before it was read"),
        }
    }
    Ok(readings)
}

#[async_trait]
impl<S: KvStore + ?Sized> ReadingReader for ReadingRepository<S> {
    async fn reading_by_id(&self, id: &str) -> RepoResult<Reading> {
        let stored_key = self.keys.stored_key(id);
        let conn = self.connection().await?;
        let blob = conn
            .get(&stored_key)
            .await
            .map_err(|e| RepoError::database(format!("reading[id:{id}] lookup failed"), e))?
            .ok_or(RepoError::EntityDoesNotExist {
                key: stored_key.clone(),
            })?;
        codec::decode_reading(&stored_key, &blob)
    }

    async fn readings_by_owner(&self, owner: &str) -> RepoResult<Vec<Reading>> {
        self.readings_by_owner_range(owner, 0, -1).await
    }

    async fn readings_by_owner_range(
        &self,
        owner: &str,
        start: i64,
        stop: i64,
    ) -> RepoResult<Vec<Reading>> {
        let conn = self.connection().await?;
        let stored_keys = self
            .indices
            .owner(owner)
            .range(&*conn, start, stop)
            .await
            .map_err(|e| {
                RepoError::database(format!("querying readings of device {owner} failed"), e)
            })?;
        load(&*conn, stored_keys, decode_as_simple).await
    }

    async fn all_readings(&self, offset: usize, limit: usize) -> RepoResult<Vec<Reading>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let (start, stop) = rank_window(offset, limit);
        let conn = self.connection().await?;
        let stored_keys = self
            .indices
            .created()
            .range_rev(&*conn, start, stop)
            .await
            .map_err(|e| RepoError::database("querying all readings failed", e))?;
        load(&*conn, stored_keys, codec::decode_reading).await
    }

    async fn readings_by_time_range(
        &self,
        start: Timestamp,
        end: Timestamp,
        offset: usize,
        limit: usize,
    ) -> RepoResult<Vec<Reading>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let conn = self.connection().await?;
        let stored_keys = self
            .indices
            .created()
            .range_by_score(&*conn, start, end, offset, Some(limit))
            .await
            .map_err(|e| {
                let context = format!("querying readings created in {start}..={end} failed");
                RepoError::database(context, e)
            })?;
        load(&*conn, stored_keys, codec::decode_reading).await
    }

    async fn reading_count(&self) -> RepoResult<u64> {
        let conn = self.connection().await?;
        self.indices
            .membership()
            .len(&*conn)
            .await
            .map_err(|e| RepoError::database("counting readings failed", e))
    }

    async fn reading_count_by_owner(&self, owner: &str) -> RepoResult<u64> {
        let conn = self.connection().await?;
        self.indices
            .owner(owner)
            .len(&*conn)
            .await
            .map_err(|e| {
                RepoError::database(format!("counting readings of device {owner} failed"), e)
            })
    }
}

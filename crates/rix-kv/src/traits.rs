use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreResult;
use crate::transaction::Transaction;

/// Remote key-value store with blobs and sorted sets.
///
/// All implementations must satisfy these invariants:
/// - Every single command is atomic on its own key.
/// - [`exec`](KvStore::exec) applies all queued commands of one transaction
///   or none of them, with no interleaving from other transactions.
/// - No isolation is offered between a read and a later `exec`; callers
///   that read-then-write race with concurrent writers.
/// - Sorted sets order members by score, then by member bytes.
/// - An emptied sorted set no longer exists as a key.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the blob at `key`.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>>;

    /// Read many blobs in one round-trip. Missing keys yield `None` in place.
    ///
    /// Default implementation calls `get()` for each key. Backends should
    /// override with a single batched command.
    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<Bytes>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get(key).await?);
        }
        Ok(values)
    }

    /// Members of `set` between ranks `start` and `stop` inclusive, lowest
    /// score first. Negative ranks count from the end (`-1` is the last).
    async fn zrange(&self, set: &str, start: i64, stop: i64) -> StoreResult<Vec<String>>;

    /// Like [`zrange`](KvStore::zrange) but highest score first.
    async fn zrevrange(&self, set: &str, start: i64, stop: i64) -> StoreResult<Vec<String>>;

    /// Members of `set` whose score lies in `min..=max`, lowest score first,
    /// skipping `offset` matches and returning at most `limit` (all if `None`).
    async fn zrange_by_score(
        &self,
        set: &str,
        min: i64,
        max: i64,
        offset: usize,
        limit: Option<usize>,
    ) -> StoreResult<Vec<String>>;

    /// Score of `member` in `set`, if present.
    async fn zscore(&self, set: &str, member: &str) -> StoreResult<Option<i64>>;

    /// Cardinality of `set` (zero if it does not exist).
    async fn zcard(&self, set: &str) -> StoreResult<u64>;

    /// Commit a queued transaction atomically.
    async fn exec(&self, tx: Transaction) -> StoreResult<()>;
}

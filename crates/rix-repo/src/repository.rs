use std::sync::Arc;

use bytes::Bytes;
use rix_kv::{ConnectionPool, KvStore, PooledConnection, Transaction};
use rix_types::BaseReading;

use crate::config::RepoConfig;
use crate::error::{ConfigError, RepoError, RepoResult};
use crate::index::ReadingIndices;
use crate::keys::KeySpace;

/// Reading repository over a pooled key-value store.
///
/// Cheap to clone; clones share the pool. The operations live in
/// [`ReadingWriter`](crate::ReadingWriter), [`ReadingReader`](crate::ReadingReader)
/// and the batch deletion methods.
pub struct ReadingRepository<S: ?Sized> {
    pub(crate) pool: ConnectionPool<S>,
    pub(crate) keys: KeySpace,
    pub(crate) indices: ReadingIndices,
    pub(crate) batch_size: usize,
}

impl<S: KvStore + ?Sized> ReadingRepository<S> {
    pub fn new(store: Arc<S>, config: RepoConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let keys = KeySpace::new(config.namespace.as_str());
        Ok(Self {
            pool: ConnectionPool::new(store, config.pool_config()),
            indices: ReadingIndices::new(&keys),
            keys,
            batch_size: config.batch_size,
        })
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    pub fn indices(&self) -> &ReadingIndices {
        &self.indices
    }

    pub fn pool(&self) -> &ConnectionPool<S> {
        &self.pool
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub(crate) async fn connection(&self) -> RepoResult<PooledConnection<S>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| RepoError::database("unable to acquire a store connection", e))
    }

    /// Queue the blob write and the three index entries of one reading.
    pub(crate) fn queue_insert(
        &self,
        tx: &mut Transaction,
        stored_key: &str,
        base: &BaseReading,
        blob: Bytes,
    ) {
        tx.set(stored_key, blob);
        self.indices.queue_insert(tx, stored_key, base);
    }

    /// Queue the blob removal and the three index removals of one reading.
    pub(crate) fn queue_removal(&self, tx: &mut Transaction, stored_key: &str, owner: &str) {
        tx.unlink(stored_key);
        self.indices.queue_removal(tx, stored_key, owner);
    }
}

impl<S: ?Sized> Clone for ReadingRepository<S> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            keys: self.keys.clone(),
            indices: self.indices.clone(),
            batch_size: self.batch_size,
        }
    }
}

impl<S: ?Sized> std::fmt::Debug for ReadingRepository<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadingRepository")
            .field("namespace", &self.keys.namespace())
            .field("batch_size", &self.batch_size)
            .field("pool", &self.pool)
            .finish()
    }
}

//! Bounded pool of store connections.
//!
//! Each logical operation acquires one [`PooledConnection`] and owns it for
//! its whole duration. The permit backing the connection is returned to the
//! pool when the guard drops, so every exit path releases it, including
//! early returns through `?` and panics unwinding through a task.

use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Sizing and wait policy for a [`ConnectionPool`].
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Maximum number of connections checked out at once.
    pub max_connections: usize,
    /// How long `acquire` waits for a free connection before failing.
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 16,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// A pool handing out scoped connections to a shared store client.
pub struct ConnectionPool<S: ?Sized> {
    store: Arc<S>,
    permits: Arc<Semaphore>,
    config: PoolConfig,
}

impl<S: ?Sized> ConnectionPool<S> {
    pub fn new(store: Arc<S>, config: PoolConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_connections));
        Self {
            store,
            permits,
            config,
        }
    }

    /// Check out a connection, waiting up to the configured timeout.
    pub async fn acquire(&self) -> StoreResult<PooledConnection<S>> {
        let timeout = self.config.acquire_timeout;
        let permit = tokio::time::timeout(timeout, Arc::clone(&self.permits).acquire_owned())
            .await
            .map_err(|_| StoreError::PoolTimeout {
                waited_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })?
            .map_err(|_| StoreError::PoolClosed)?;
        debug!(available = self.available(), "connection acquired");
        Ok(PooledConnection {
            store: Arc::clone(&self.store),
            _permit: permit,
        })
    }

    /// Connections currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn max_connections(&self) -> usize {
        self.config.max_connections
    }

    /// Refuse all further acquisitions. Checked-out connections stay valid.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }
}

impl<S: ?Sized> Clone for ConnectionPool<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            permits: Arc::clone(&self.permits),
            config: self.config.clone(),
        }
    }
}

impl<S: ?Sized> std::fmt::Debug for ConnectionPool<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("max_connections", &self.config.max_connections)
            .field("available", &self.available())
            .finish()
    }
}

/// A checked-out connection. Dereferences to the store client.
pub struct PooledConnection<S: ?Sized> {
    store: Arc<S>,
    _permit: OwnedSemaphorePermit,
}

impl<S: ?Sized> std::fmt::Debug for PooledConnection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection").finish_non_exhaustive()
    }
}

impl<S: ?Sized> Deref for PooledConnection<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryKvStore;
    use crate::traits::KvStore;

    fn pool(max: usize, timeout_ms: u64) -> ConnectionPool<InMemoryKvStore> {
        ConnectionPool::new(
            Arc::new(InMemoryKvStore::new()),
            PoolConfig {
                max_connections: max,
                acquire_timeout: Duration::from_millis(timeout_ms),
            },
        )
    }

    #[tokio::test]
    async fn connection_is_released_on_drop() {
        let pool = pool(2, 100);
        {
            let _a = pool.acquire().await.unwrap();
            let _b = pool.acquire().await.unwrap();
            assert_eq!(pool.available(), 0);
        }
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn exhausted_pool_times_out() {
        let pool = pool(1, 20);
        let _held = pool.acquire().await.unwrap();
        let err = pool.acquire().await.unwrap_err();
        assert_eq!(err, StoreError::PoolTimeout { waited_ms: 20 });
    }

    #[tokio::test]
    async fn released_connection_wakes_waiter() {
        let pool = pool(1, 1_000);
        let held = pool.acquire().await.unwrap();

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await.map(|_| ()) })
        };
        tokio::task::yield_now().await;
        drop(held);

        waiter.await.unwrap().unwrap();
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn closed_pool_rejects_acquire() {
        let pool = pool(1, 100);
        pool.close();
        assert!(pool.is_closed());
        assert_eq!(pool.acquire().await.unwrap_err(), StoreError::PoolClosed);
    }

    #[tokio::test]
    async fn error_path_still_releases() {
        let pool = pool(1, 100);

        async fn failing(pool: &ConnectionPool<InMemoryKvStore>) -> StoreResult<()> {
            let conn = pool.acquire().await?;
            conn.fail_reads(true);
            conn.get("k").await?;
            Ok(())
        }

        assert!(failing(&pool).await.is_err());
        assert_eq!(pool.available(), 1);
    }
}

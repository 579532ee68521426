/// Errors from backing store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A single command was rejected by the store.
    #[error("{command} failed on {key}: {reason}")]
    CommandFailed {
        command: &'static str,
        key: String,
        reason: String,
    },

    /// A queued transaction was discarded; none of its commands were applied.
    #[error("transaction aborted: {0}")]
    TransactionAborted(String),

    /// The key holds a value of a different type than the command expects.
    #[error("wrong type for key {key}: expected {expected}")]
    WrongType { key: String, expected: &'static str },

    /// The connection pool was closed.
    #[error("connection pool is closed")]
    PoolClosed,

    /// No pooled connection became available in time.
    #[error("timed out after {waited_ms}ms waiting for a pooled connection")]
    PoolTimeout { waited_ms: u64 },

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

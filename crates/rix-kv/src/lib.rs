//! Key-value backing store abstraction for Rix.
//!
//! The repository layer above this crate persists blobs and maintains
//! secondary indexes as sorted sets in a remote store that only offers
//! single-key atomicity plus queued multi-command transactions. This crate
//! models exactly that surface and nothing more.
//!
//! # Building Blocks
//!
//! - [`KvStore`] -- async command surface (GET, MGET, ZRANGE, ZCARD, EXEC, ...)
//! - [`Transaction`] -- local queue of write [`Command`]s committed as one unit
//! - [`ConnectionPool`] -- bounded pool with scoped [`PooledConnection`] guards
//! - [`InMemoryKvStore`] -- single-process backend with fault injection
//!
//! # Design Rules
//!
//! 1. Writes only happen through [`KvStore::exec`]; a transaction is applied
//!    completely or not at all.
//! 2. There is no isolation between a read and a later transaction.
//! 3. A connection is owned by exactly one operation until it is dropped.

pub mod error;
pub mod memory;
pub mod pool;
pub mod traits;
pub mod transaction;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryKvStore;
pub use pool::{ConnectionPool, PoolConfig, PooledConnection};
pub use traits::KvStore;
pub use transaction::{Command, Transaction};

//! Reading persistence for the Rix device data store.
//!
//! This crate maps sensor readings onto a key-value store. It provides:
//! - `ReadingWriter` / `ReadingReader` trait boundaries
//! - `ReadingRepository`, implementing both over any pooled `KvStore`
//! - Primary, creation-time and per-device indexes kept in step with the blobs
//! - Chunked background deletion of many readings
//! - `RepoConfig`, loaded from TOML

pub mod batch;
pub mod codec;
pub mod config;
mod deleter;
pub mod error;
pub mod index;
pub mod keys;
mod reader;
pub mod repository;
pub mod traits;
mod writer;

pub use batch::BatchDeleteSummary;
pub use config::RepoConfig;
pub use error::{ConfigError, DatabaseCause, ErrorKind, RepoError, RepoResult};
pub use index::{IndexSet, ReadingIndices};
pub use keys::{KeySpace, DEFAULT_NAMESPACE};
pub use repository::ReadingRepository;
pub use traits::{ReadingReader, ReadingWriter};

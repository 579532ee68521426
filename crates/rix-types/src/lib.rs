//! Domain types for Rix.
//!
//! Shared by the repository layer and its callers.
//!
//! # Key Types
//!
//! - [`Reading`]: A device reading, either [`SimpleReading`] or [`BinaryReading`]
//! - [`BaseReading`]: Fields shared by both variants (id, owner, timestamps)
//! - [`ReadingId`]: Validated UUID identifier of a stored reading
//! - [`Timestamp`]: Milliseconds since the UNIX epoch

pub mod error;
pub mod id;
pub mod reading;
pub mod temporal;

pub use error::TypeError;
pub use id::ReadingId;
pub use reading::{BaseReading, BinaryReading, Reading, ReadingKind, SimpleReading};
pub use temporal::{now_millis, Timestamp};

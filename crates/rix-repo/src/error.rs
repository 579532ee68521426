use std::fmt;

use rix_kv::StoreError;
use rix_types::TypeError;

/// Coarse classification of a [`RepoError`], for callers that map outcomes
/// onto their own status codes or retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidId,
    ContractInvalid,
    EntityDoesNotExist,
    DatabaseError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidId => "InvalidId",
            Self::ContractInvalid => "ContractInvalid",
            Self::EntityDoesNotExist => "EntityDoesNotExist",
            Self::DatabaseError => "DatabaseError",
        };
        f.write_str(name)
    }
}

/// Errors produced by repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// A supplied reading id is not a well-formed UUID.
    #[error("reading id {id:?} is not a valid UUID")]
    InvalidId {
        id: String,
        #[source]
        source: TypeError,
    },

    /// The reading cannot be stored in its current shape.
    #[error("contract invalid: {reason}")]
    ContractInvalid {
        reason: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// No reading is stored under the key.
    #[error("reading does not exist: {key}")]
    EntityDoesNotExist { key: String },

    /// A store command or transaction failed, or a stored record could not
    /// be decoded.
    #[error("database error: {context}")]
    Database {
        context: String,
        #[source]
        source: DatabaseCause,
    },
}

/// Underlying cause of a [`RepoError::Database`].
#[derive(Debug, thiserror::Error)]
pub enum DatabaseCause {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("undecodable record: {0}")]
    Decode(#[from] serde_json::Error),
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidId { .. } => ErrorKind::InvalidId,
            Self::ContractInvalid { .. } => ErrorKind::ContractInvalid,
            Self::EntityDoesNotExist { .. } => ErrorKind::EntityDoesNotExist,
            Self::Database { .. } => ErrorKind::DatabaseError,
        }
    }

    pub(crate) fn database(context: impl Into<String>, cause: impl Into<DatabaseCause>) -> Self {
        Self::Database {
            context: context.into(),
            source: cause.into(),
        }
    }

    pub(crate) fn contract(reason: impl Into<String>) -> Self {
        Self::ContractInvalid {
            reason: reason.into(),
            source: None,
        }
    }
}

/// Result alias for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from loading or validating a [`RepoConfig`](crate::RepoConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn kind_follows_variant() {
        let err = RepoError::EntityDoesNotExist {
            key: "reading:x".into(),
        };
        assert_eq!(err.kind(), ErrorKind::EntityDoesNotExist);
        assert_eq!(err.to_string(), "reading does not exist: reading:x");

        let err = RepoError::database("delete failed", StoreError::PoolClosed);
        assert_eq!(err.kind(), ErrorKind::DatabaseError);
    }

    #[test]
    fn database_error_keeps_store_cause() {
        let err = RepoError::database(
            "reading[id:abc] delete failed",
            StoreError::TransactionAborted("boom".into()),
        );
        let source = err.source().expect("has source");
        assert_eq!(source.to_string(), "transaction aborted: boom");
    }

    #[test]
    fn kind_display_names() {
        assert_eq!(ErrorKind::InvalidId.to_string(), "InvalidId");
        assert_eq!(ErrorKind::DatabaseError.to_string(), "DatabaseError");
    }
}

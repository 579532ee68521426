//! Queued multi-command transactions.
//!
//! A [`Transaction`] is a local queue of write commands. Nothing reaches the
//! store until the queue is handed to [`KvStore::exec`](crate::KvStore::exec),
//! which applies every command or none of them. There is no isolation across
//! transactions: two queues committed concurrently may interleave in any
//! order, but the commands of one queue are never split.

use bytes::Bytes;

/// A single write command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Store a blob under `key`, replacing any previous blob.
    Set { key: String, value: Bytes },
    /// Remove `key` whatever it holds.
    Unlink { key: String },
    /// Add `member` to the sorted set `set` with `score`, updating the score
    /// if the member is already present.
    ZAdd {
        set: String,
        score: i64,
        member: String,
    },
    /// Remove `member` from the sorted set `set`.
    ZRem { set: String, member: String },
}

impl Command {
    /// Command name as it appears in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Set { .. } => "SET",
            Self::Unlink { .. } => "UNLINK",
            Self::ZAdd { .. } => "ZADD",
            Self::ZRem { .. } => "ZREM",
        }
    }

    /// The store key this command touches.
    pub fn key(&self) -> &str {
        match self {
            Self::Set { key, .. } | Self::Unlink { key } => key,
            Self::ZAdd { set, .. } | Self::ZRem { set, .. } => set,
        }
    }
}

/// An ordered queue of commands committed as one all-or-nothing unit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transaction {
    commands: Vec<Command>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Bytes>) -> &mut Self {
        self.commands.push(Command::Set {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn unlink(&mut self, key: impl Into<String>) -> &mut Self {
        self.commands.push(Command::Unlink { key: key.into() });
        self
    }

    pub fn zadd(
        &mut self,
        set: impl Into<String>,
        score: i64,
        member: impl Into<String>,
    ) -> &mut Self {
        self.commands.push(Command::ZAdd {
            set: set.into(),
            score,
            member: member.into(),
        });
        self
    }

    pub fn zrem(&mut self, set: impl Into<String>, member: impl Into<String>) -> &mut Self {
        self.commands.push(Command::ZRem {
            set: set.into(),
            member: member.into(),
        });
        self
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}

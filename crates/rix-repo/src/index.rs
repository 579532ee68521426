//! Secondary indexes over stored readings.
//!
//! Each index is one sorted set in the backing store. Writes never touch the
//! store directly; they are queued on a [`Transaction`] so that a reading's
//! blob and all of its index entries commit together.

use rix_kv::{KvStore, StoreResult, Transaction};
use rix_types::BaseReading;

use crate::keys::KeySpace;

/// Handle to one sorted set of stored keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexSet {
    name: String,
}

impl IndexSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add(&self, tx: &mut Transaction, score: i64, member: &str) {
        tx.zadd(self.name.as_str(), score, member);
    }

    pub fn remove(&self, tx: &mut Transaction, member: &str) {
        tx.zrem(self.name.as_str(), member);
    }

    /// Members between ranks `start` and `stop` inclusive, oldest first.
    pub async fn range<S: KvStore + ?Sized>(
        &self,
        store: &S,
        start: i64,
        stop: i64,
    ) -> StoreResult<Vec<String>> {
        store.zrange(&self.name, start, stop).await
    }

    /// Members between ranks `start` and `stop` inclusive, newest first.
    pub async fn range_rev<S: KvStore + ?Sized>(
        &self,
        store: &S,
        start: i64,
        stop: i64,
    ) -> StoreResult<Vec<String>> {
        store.zrevrange(&self.name, start, stop).await
    }

    /// Members scored within `min..=max`, oldest first.
    pub async fn range_by_score<S: KvStore + ?Sized>(
        &self,
        store: &S,
        min: i64,
        max: i64,
        offset: usize,
        limit: Option<usize>,
    ) -> StoreResult<Vec<String>> {
        store.zrange_by_score(&self.name, min, max, offset, limit).await
    }

    pub async fn score<S: KvStore + ?Sized>(
        &self,
        store: &S,
        member: &str,
    ) -> StoreResult<Option<i64>> {
        store.zscore(&self.name, member).await
    }

    pub async fn len<S: KvStore + ?Sized>(&self, store: &S) -> StoreResult<u64> {
        store.zcard(&self.name).await
    }
}

/// The three indexes every stored reading belongs to.
///
/// Owner indexes are not tracked anywhere: a handle is derived from the owner
/// name on demand, the set springs into existence on its first member and
/// disappears with its last.
#[derive(Clone, Debug)]
pub struct ReadingIndices {
    keys: KeySpace,
    membership: IndexSet,
    created: IndexSet,
}

impl ReadingIndices {
    pub fn new(keys: &KeySpace) -> Self {
        Self {
            keys: keys.clone(),
            membership: IndexSet::new(keys.membership_index()),
            created: IndexSet::new(keys.created_index()),
        }
    }

    pub fn membership(&self) -> &IndexSet {
        &self.membership
    }

    pub fn created(&self) -> &IndexSet {
        &self.created
    }

    pub fn owner(&self, owner: &str) -> IndexSet {
        IndexSet::new(self.keys.owner_index(owner))
    }

    /// Queue the entries that make `stored_key` visible through every index.
    pub fn queue_insert(&self, tx: &mut Transaction, stored_key: &str, base: &BaseReading) {
        self.membership.add(tx, 0, stored_key);
        self.created.add(tx, base.created, stored_key);
        self.owner(&base.device_name).add(tx, base.created, stored_key);
    }

    /// Queue removal of `stored_key` from every index.
    pub fn queue_removal(&self, tx: &mut Transaction, stored_key: &str, owner: &str) {
        self.membership.remove(tx, stored_key);
        self.created.remove(tx, stored_key);
        self.owner(owner).remove(tx, stored_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rix_kv::{Command, InMemoryKvStore};

    fn base(owner: &str, created: i64) -> BaseReading {
        BaseReading {
            created,
            ..BaseReading::new(owner, "temperature", "profile", "Int64")
        }
    }

    #[test]
    fn insert_queues_three_scored_entries() {
        let indices = ReadingIndices::new(&KeySpace::default());
        let mut tx = Transaction::new();
        indices.queue_insert(&mut tx, "reading:1", &base("dev-a", 77));

        assert_eq!(
            tx.commands(),
            [
                Command::ZAdd {
                    set: "reading".into(),
                    score: 0,
                    member: "reading:1".into()
                },
                Command::ZAdd {
                    set: "reading:created".into(),
                    score: 77,
                    member: "reading:1".into()
                },
                Command::ZAdd {
                    set: "reading:device:name:dev-a".into(),
                    score: 77,
                    member: "reading:1".into()
                },
            ]
        );
    }

    #[test]
    fn removal_targets_the_given_owner() {
        let indices = ReadingIndices::new(&KeySpace::default());
        let mut tx = Transaction::new();
        indices.queue_removal(&mut tx, "reading:1", "dev-b");

        let sets: Vec<&str> = tx.commands().iter().map(Command::key).collect();
        assert_eq!(sets, ["reading", "reading:created", "reading:device:name:dev-b"]);
    }

    #[tokio::test]
    async fn owner_indexes_are_partitioned() {
        let store = InMemoryKvStore::new();
        let indices = ReadingIndices::new(&KeySpace::default());
        let mut tx = Transaction::new();
        indices.queue_insert(&mut tx, "reading:1", &base("dev-a", 2));
        indices.queue_insert(&mut tx, "reading:2", &base("dev-a", 1));
        indices.queue_insert(&mut tx, "reading:3", &base("dev-b", 3));
        store.exec(tx).await.unwrap();

        let a = indices.owner("dev-a").range(&store, 0, -1).await.unwrap();
        assert_eq!(a, ["reading:2", "reading:1"]);
        assert_eq!(indices.owner("dev-b").len(&store).await.unwrap(), 1);
        assert_eq!(indices.membership().len(&store).await.unwrap(), 3);
        assert_eq!(
            indices.created().range_rev(&store, 0, 0).await.unwrap(),
            ["reading:3"]
        );
        assert_eq!(
            indices.created().score(&store, "reading:2").await.unwrap(),
            Some(1)
        );
    }
}

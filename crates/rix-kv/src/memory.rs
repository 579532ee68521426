use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::KvStore;
use crate::transaction::{Command, Transaction};

/// A value held at one key.
#[derive(Clone, Debug)]
enum Value {
    Blob(Bytes),
    Sorted(SortedSet),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ValueKind {
    Blob,
    Sorted,
}

impl Value {
    fn kind(&self) -> ValueKind {
        match self {
            Self::Blob(_) => ValueKind::Blob,
            Self::Sorted(_) => ValueKind::Sorted,
        }
    }
}

/// Sorted set ordered by `(score, member)`.
#[derive(Clone, Debug, Default)]
struct SortedSet {
    scores: HashMap<String, i64>,
    ordered: BTreeSet<(i64, String)>,
}

impl SortedSet {
    fn insert(&mut self, score: i64, member: String) {
        if let Some(old) = self.scores.insert(member.clone(), score) {
            self.ordered.remove(&(old, member.clone()));
        }
        self.ordered.insert((score, member));
    }

    fn remove(&mut self, member: &str) -> bool {
        match self.scores.remove(member) {
            Some(score) => {
                self.ordered.remove(&(score, member.to_string()));
                true
            }
            None => false,
        }
    }

    fn len(&self) -> usize {
        self.ordered.len()
    }

    fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    fn by_rank(&self, start: i64, stop: i64, reverse: bool) -> Vec<String> {
        let Some((first, last)) = normalize_rank_range(self.len(), start, stop) else {
            return Vec::new();
        };
        let take = last - first + 1;
        if reverse {
            self.ordered
                .iter()
                .rev()
                .skip(first)
                .take(take)
                .map(|(_, m)| m.clone())
                .collect()
        } else {
            self.ordered
                .iter()
                .skip(first)
                .take(take)
                .map(|(_, m)| m.clone())
                .collect()
        }
    }

    fn by_score(&self, min: i64, max: i64, offset: usize, limit: Option<usize>) -> Vec<String> {
        if min > max {
            return Vec::new();
        }
        self.ordered
            .range((min, String::new())..)
            .take_while(|(score, _)| *score <= max)
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .map(|(_, m)| m.clone())
            .collect()
    }
}

/// Resolve inclusive, possibly negative ranks against a set of `len` members.
fn normalize_rank_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = i64::try_from(len).ok()?;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((usize::try_from(start).ok()?, usize::try_from(stop).ok()?))
}

/// In-memory, HashMap-based key-value store.
///
/// Intended for tests and embedding. One `RwLock` guards the whole keyspace,
/// which makes every transaction trivially atomic and isolated from others.
/// Fault injection hooks let tests force transaction and read failures.
pub struct InMemoryKvStore {
    keys: RwLock<HashMap<String, Value>>,
    exec_calls: AtomicUsize,
    // Remaining successful execs before one injected failure.
    exec_fault: Mutex<Option<usize>>,
    read_fault: AtomicBool,
}

impl InMemoryKvStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            exec_calls: AtomicUsize::new(0),
            exec_fault: Mutex::new(None),
            read_fault: AtomicBool::new(false),
        }
    }

    /// Number of keys currently stored (blobs and sorted sets).
    pub fn len(&self) -> usize {
        self.keys.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.read().expect("lock poisoned").is_empty()
    }

    /// Returns `true` if `key` exists with any type.
    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.read().expect("lock poisoned").contains_key(key)
    }

    /// Return a sorted list of all keys in the store.
    pub fn all_keys(&self) -> Vec<String> {
        let map = self.keys.read().expect("lock poisoned");
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Remove every key.
    pub fn clear(&self) {
        self.keys.write().expect("lock poisoned").clear();
    }

    /// Number of `exec` calls seen so far, including failed ones.
    pub fn exec_calls(&self) -> usize {
        self.exec_calls.load(Ordering::SeqCst)
    }

    /// Let the next `successes` transactions commit, then abort exactly one.
    pub fn fail_exec_after(&self, successes: usize) {
        *self.exec_fault.lock().expect("lock poisoned") = Some(successes);
    }

    /// Make every read command fail with [`StoreError::Unavailable`] while set.
    pub fn fail_reads(&self, fail: bool) {
        self.read_fault.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> StoreResult<()> {
        if self.read_fault.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".into()));
        }
        Ok(())
    }

    fn take_exec_fault(&self) -> bool {
        let mut fault = self.exec_fault.lock().expect("lock poisoned");
        match *fault {
            Some(0) => {
                *fault = None;
                true
            }
            Some(n) => {
                *fault = Some(n - 1);
                false
            }
            None => false,
        }
    }

    fn read_sorted<T>(
        &self,
        set: &str,
        empty: T,
        f: impl FnOnce(&SortedSet) -> T,
    ) -> StoreResult<T> {
        self.check_reads()?;
        let map = self.keys.read().expect("lock poisoned");
        match map.get(set) {
            None => Ok(empty),
            Some(Value::Sorted(s)) => Ok(f(s)),
            Some(Value::Blob(_)) => Err(StoreError::WrongType {
                key: set.to_string(),
                expected: "sorted set",
            }),
        }
    }
}

/// Check every command against the key types it will observe, including the
/// effects of earlier commands in the same transaction.
fn validate(map: &HashMap<String, Value>, commands: &[Command]) -> StoreResult<()> {
    let mut staged: HashMap<&str, Option<ValueKind>> = HashMap::new();
    for command in commands {
        let key = command.key();
        let current = match staged.get(key) {
            Some(kind) => *kind,
            None => map.get(key).map(Value::kind),
        };
        let next = match command {
            Command::Set { .. } => Some(ValueKind::Blob),
            Command::Unlink { .. } => None,
            Command::ZAdd { .. } | Command::ZRem { .. } => {
                if current == Some(ValueKind::Blob) {
                    return Err(StoreError::WrongType {
                        key: key.to_string(),
                        expected: "sorted set",
                    });
                }
                match command {
                    Command::ZAdd { .. } => Some(ValueKind::Sorted),
                    _ => current,
                }
            }
        };
        staged.insert(key, next);
    }
    Ok(())
}

fn apply(map: &mut HashMap<String, Value>, command: Command) {
    match command {
        Command::Set { key, value } => {
            map.insert(key, Value::Blob(value));
        }
        Command::Unlink { key } => {
            map.remove(&key);
        }
        Command::ZAdd { set, score, member } => {
            let entry = map
                .entry(set)
                .or_insert_with(|| Value::Sorted(SortedSet::default()));
            if let Value::Sorted(s) = entry {
                s.insert(score, member);
            }
        }
        Command::ZRem { set, member } => {
            let emptied = match map.get_mut(&set) {
                Some(Value::Sorted(s)) => s.remove(&member) && s.is_empty(),
                _ => false,
            };
            if emptied {
                map.remove(&set);
            }
        }
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        self.check_reads()?;
        let map = self.keys.read().expect("lock poisoned");
        match map.get(key) {
            None => Ok(None),
            Some(Value::Blob(b)) => Ok(Some(b.clone())),
            Some(Value::Sorted(_)) => Err(StoreError::WrongType {
                key: key.to_string(),
                expected: "blob",
            }),
        }
    }

    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<Bytes>>> {
        self.check_reads()?;
        let map = self.keys.read().expect("lock poisoned");
        // Like MGET, a key of another type reads as missing.
        Ok(keys
            .iter()
            .map(|k| match map.get(k) {
                Some(Value::Blob(b)) => Some(b.clone()),
                _ => None,
            })
            .collect())
    }

    async fn zrange(&self, set: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        self.read_sorted(set, Vec::new(), |s| s.by_rank(start, stop, false))
    }

    async fn zrevrange(&self, set: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        self.read_sorted(set, Vec::new(), |s| s.by_rank(start, stop, true))
    }

    async fn zrange_by_score(
        &self,
        set: &str,
        min: i64,
        max: i64,
        offset: usize,
        limit: Option<usize>,
    ) -> StoreResult<Vec<String>> {
        self.read_sorted(set, Vec::new(), |s| s.by_score(min, max, offset, limit))
    }

    async fn zscore(&self, set: &str, member: &str) -> StoreResult<Option<i64>> {
        self.read_sorted(set, None, |s| s.scores.get(member).copied())
    }

    async fn zcard(&self, set: &str) -> StoreResult<u64> {
        self.read_sorted(set, 0, |s| s.len() as u64)
    }

    async fn exec(&self, tx: Transaction) -> StoreResult<()> {
        self.exec_calls.fetch_add(1, Ordering::SeqCst);
        if self.take_exec_fault() {
            warn!(commands = tx.len(), "injected transaction failure");
            return Err(StoreError::TransactionAborted("injected failure".into()));
        }

        let mut map = self.keys.write().expect("lock poisoned");
        validate(&map, tx.commands())?;
        let count = tx.len();
        for command in tx.into_commands() {
            apply(&mut map, command);
        }
        debug!(commands = count, "transaction committed");
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryKvStore")
            .field("key_count", &count)
            .field("exec_calls", &self.exec_calls())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn seeded() -> Transaction {
        let mut tx = Transaction::new();
        tx.set("reading:a", Bytes::from_static(b"a"))
            .zadd("reading:created", 30, "reading:a")
            .zadd("reading:created", 10, "reading:b")
            .zadd("reading:created", 20, "reading:c");
        tx
    }

    // -----------------------------------------------------------------------
    // Blobs
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn set_and_get_blob() {
        let store = InMemoryKvStore::new();
        let mut tx = Transaction::new();
        tx.set("k", Bytes::from_static(b"hello"));
        store.exec(tx).await.unwrap();

        let value = store.get("k").await.unwrap().expect("should exist");
        assert_eq!(&value[..], b"hello");
    }

    #[tokio::test]
    async fn get_missing_is_none() {
        let store = InMemoryKvStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mget_keeps_positions_of_missing_keys() {
        let store = InMemoryKvStore::new();
        store.exec(seeded()).await.unwrap();

        let keys = vec![
            "reading:a".to_string(),
            "reading:missing".to_string(),
            "reading:created".to_string(),
        ];
        let values = store.mget(&keys).await.unwrap();
        assert_eq!(values.len(), 3);
        assert!(values[0].is_some());
        assert!(values[1].is_none());
        assert!(values[2].is_none());
    }

    #[tokio::test]
    async fn unlink_removes_key() {
        let store = InMemoryKvStore::new();
        store.exec(seeded()).await.unwrap();
        let mut tx = Transaction::new();
        tx.unlink("reading:a");
        store.exec(tx).await.unwrap();
        assert!(!store.contains_key("reading:a"));
    }

    // -----------------------------------------------------------------------
    // Sorted sets
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn zrange_orders_by_score() {
        let store = InMemoryKvStore::new();
        store.exec(seeded()).await.unwrap();

        let all = store.zrange("reading:created", 0, -1).await.unwrap();
        assert_eq!(all, ["reading:b", "reading:c", "reading:a"]);

        let newest = store.zrevrange("reading:created", 0, 0).await.unwrap();
        assert_eq!(newest, ["reading:a"]);
    }

    #[tokio::test]
    async fn zrange_negative_and_out_of_bounds_ranks() {
        let store = InMemoryKvStore::new();
        store.exec(seeded()).await.unwrap();

        assert_eq!(
            store.zrange("reading:created", -2, -1).await.unwrap(),
            ["reading:c", "reading:a"]
        );
        assert_eq!(
            store.zrange("reading:created", 1, 100).await.unwrap(),
            ["reading:c", "reading:a"]
        );
        assert!(store.zrange("reading:created", 5, 10).await.unwrap().is_empty());
        assert!(store.zrange("reading:created", 2, 1).await.unwrap().is_empty());
        assert!(store.zrange("absent", 0, -1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn zrange_by_score_is_inclusive_with_paging() {
        let store = InMemoryKvStore::new();
        store.exec(seeded()).await.unwrap();

        let hits = store
            .zrange_by_score("reading:created", 10, 20, 0, None)
            .await
            .unwrap();
        assert_eq!(hits, ["reading:b", "reading:c"]);

        let paged = store
            .zrange_by_score("reading:created", 0, 100, 1, Some(1))
            .await
            .unwrap();
        assert_eq!(paged, ["reading:c"]);
    }

    #[tokio::test]
    async fn zadd_existing_member_updates_score() {
        let store = InMemoryKvStore::new();
        store.exec(seeded()).await.unwrap();
        let mut tx = Transaction::new();
        tx.zadd("reading:created", 5, "reading:a");
        store.exec(tx).await.unwrap();

        assert_eq!(store.zcard("reading:created").await.unwrap(), 3);
        assert_eq!(
            store.zscore("reading:created", "reading:a").await.unwrap(),
            Some(5)
        );
        let first = store.zrange("reading:created", 0, 0).await.unwrap();
        assert_eq!(first, ["reading:a"]);
    }

    #[tokio::test]
    async fn emptied_sorted_set_disappears() {
        let store = InMemoryKvStore::new();
        let mut tx = Transaction::new();
        tx.zadd("owner", 1, "m");
        store.exec(tx).await.unwrap();
        assert!(store.contains_key("owner"));

        let mut tx = Transaction::new();
        tx.zrem("owner", "m");
        store.exec(tx).await.unwrap();
        assert!(!store.contains_key("owner"));
        assert_eq!(store.zcard("owner").await.unwrap(), 0);
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn wrong_type_aborts_whole_transaction() {
        let store = InMemoryKvStore::new();
        let mut tx = Transaction::new();
        tx.set("blob", Bytes::from_static(b"x"));
        store.exec(tx).await.unwrap();

        let mut tx = Transaction::new();
        tx.set("other", Bytes::from_static(b"y")).zadd("blob", 1, "m");
        let err = store.exec(tx).await.unwrap_err();
        assert!(matches!(err, StoreError::WrongType { ref key, .. } if key == "blob"));
        assert!(!store.contains_key("other"));
    }

    #[tokio::test]
    async fn set_then_zadd_same_key_in_one_transaction_is_rejected() {
        let store = InMemoryKvStore::new();
        let mut tx = Transaction::new();
        tx.set("k", Bytes::from_static(b"x")).zadd("k", 1, "m");
        assert!(store.exec(tx).await.is_err());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn injected_exec_failure_hits_exactly_one_transaction() {
        let store = InMemoryKvStore::new();
        store.fail_exec_after(1);

        let mut first = Transaction::new();
        first.set("a", Bytes::from_static(b"1"));
        let mut second = Transaction::new();
        second.set("b", Bytes::from_static(b"2"));
        let mut third = Transaction::new();
        third.set("c", Bytes::from_static(b"3"));

        store.exec(first).await.unwrap();
        let err = store.exec(second).await.unwrap_err();
        assert!(matches!(err, StoreError::TransactionAborted(_)));
        store.exec(third).await.unwrap();

        assert_eq!(store.all_keys(), ["a", "c"]);
        assert_eq!(store.exec_calls(), 3);
    }

    #[tokio::test]
    async fn injected_read_failure() {
        let store = InMemoryKvStore::new();
        store.fail_reads(true);
        assert!(matches!(
            store.get("k").await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.mget(&["k".to_string()]).await.is_err());
        store.fail_reads(false);
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_transactions_are_all_applied() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryKvStore::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let member = format!("reading:{i}");
                let mut tx = Transaction::new();
                tx.set(member.clone(), Bytes::from(vec![i as u8]))
                    .zadd("reading", 0, member);
                store.exec(tx).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(store.zcard("reading").await.unwrap(), 32);
        assert_eq!(store.len(), 33);
    }

    #[test]
    fn debug_shows_counts() {
        let store = InMemoryKvStore::new();
        let debug = format!("{store:?}");
        assert!(debug.contains("key_count: 0"));
    }

    proptest! {
        #[test]
        fn sorted_set_rank_order_matches_score_then_member(
            entries in proptest::collection::vec((any::<i64>(), "[a-z]{1,6}"), 0..40)
        ) {
            let mut set = SortedSet::default();
            let mut latest: HashMap<String, i64> = HashMap::new();
            for (score, member) in entries {
                set.insert(score, member.clone());
                latest.insert(member, score);
            }

            let mut expected: Vec<(i64, String)> =
                latest.into_iter().map(|(m, s)| (s, m)).collect();
            expected.sort();
            let expected: Vec<String> = expected.into_iter().map(|(_, m)| m).collect();

            prop_assert_eq!(set.by_rank(0, -1, false), expected.clone());
            let mut reversed = expected;
            reversed.reverse();
            prop_assert_eq!(set.by_rank(0, -1, true), reversed);
        }
    }
}

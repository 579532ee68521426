use rix_kv::{KvStore, Transaction};
use tracing::debug;

use crate::codec;
use crate::error::{RepoError, RepoResult};
use crate::repository::ReadingRepository;

impl<S: KvStore + ?Sized> ReadingRepository<S> {
    /// Delete one reading: read it to learn its owner, then remove the blob
    /// and all three index entries in one transaction.
    ///
    /// The read and the transaction are not isolated from each other. A
    /// concurrent rewrite of the same id between the two steps can leave the
    /// new owner's index entry behind.
    pub(crate) async fn remove_reading(&self, id: &str) -> RepoResult<()> {
        let stored_key = self.keys.stored_key(id);
        let conn = self.connection().await?;

        let blob = conn
            .get(&stored_key)
            .await
            .map_err(|e| RepoError::database(format!("reading[id:{id}] lookup failed"), e))?
            .ok_or_else(|| RepoError::EntityDoesNotExist {
                key: stored_key.clone(),
            })?;
        let base = codec::decode_base(&blob).map_err(|e| {
            RepoError::database(format!("reading format parsing failed for {stored_key}"), e)
        })?;

        let mut tx = Transaction::with_capacity(4);
        self.queue_removal(&mut tx, &stored_key, &base.device_name);
        conn.exec(tx)
            .await
            .map_err(|e| RepoError::database(format!("reading[id:{id}] delete failed"), e))?;

        debug!(key = %stored_key, owner = %base.device_name, "reading deleted");
        Ok(())
    }
}

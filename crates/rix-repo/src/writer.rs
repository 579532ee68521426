use async_trait::async_trait;
use bytes::Bytes;
use rix_kv::{KvStore, Transaction};
use rix_types::{now_millis, BaseReading, Reading, ReadingId};
use tracing::debug;

use crate::codec;
use crate::error::{RepoError, RepoResult};
use crate::repository::ReadingRepository;
use crate::traits::ReadingWriter;

/// Fill in a missing timestamp and id, and check what the indexes rely on.
fn normalize(base: &mut BaseReading) -> RepoResult<()> {
    if base.created == 0 {
        base.created = now_millis();
    }
    if base.id.is_empty() {
        base.id = ReadingId::new().to_string();
    } else {
        ReadingId::parse(&base.id).map_err(|source| RepoError::InvalidId {
            id: base.id.clone(),
            source,
        })?;
    }
    // The owner index key is derived from the device name.
    if base.device_name.is_empty() {
        return Err(RepoError::contract("reading has no device name"));
    }
    Ok(())
}

impl<S: KvStore + ?Sized> ReadingRepository<S> {
    /// Turn a submitted reading into what gets stored: the reading itself,
    /// its primary key, and its blob.
    fn prepare(&self, mut reading: Reading) -> RepoResult<(Reading, String, Bytes)> {
        codec::strip_payload(&mut reading);
        normalize(reading.base_mut())?;
        let blob = codec::encode(&reading)?;
        let stored_key = self.keys.stored_key(reading.id());
        Ok((reading, stored_key, blob))
    }
}

#[async_trait]
impl<S: KvStore + ?Sized> ReadingWriter for ReadingRepository<S> {
    async fn add_reading(&self, reading: Reading) -> RepoResult<Reading> {
        let (reading, stored_key, blob) = self.prepare(reading)?;
        let mut tx = Transaction::with_capacity(4);
        self.queue_insert(&mut tx, &stored_key, reading.base(), blob);

        let conn = self.connection().await?;
        conn.exec(tx).await.map_err(|e| {
            RepoError::database(format!("reading[id:{}] add failed", reading.id()), e)
        })?;

        debug!(
            key = %stored_key,
            owner = reading.device_name(),
            kind = %reading.kind(),
            "reading added"
        );
        Ok(reading)
    }

    async fn add_readings(&self, readings: Vec<Reading>) -> RepoResult<Vec<Reading>> {
        if readings.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = Transaction::with_capacity(readings.len() * 4);
        let mut stored = Vec::with_capacity(readings.len());
        for reading in readings {
            let (reading, stored_key, blob) = self.prepare(reading)?;
            self.queue_insert(&mut tx, &stored_key, reading.base(), blob);
            stored.push(reading);
        }

        let conn = self.connection().await?;
        conn.exec(tx).await.map_err(|e| {
            RepoError::database(format!("adding {} readings failed", stored.len()), e)
        })?;

        debug!(count = stored.len(), "readings added");
        Ok(stored)
    }

    async fn delete_reading_by_id(&self, id: &str) -> RepoResult<()> {
        self.remove_reading(id).await
    }
}

//! Storage layer.
//!
//! - [`kv`] - Raw store contract and write batches
//! - [`redis`] - Redis implementation
//! - [`memory`] - Versioned in-memory implementation
//! - [`codec`] - Wire encoding for persisted values
//! - [`txn`] - Atomic multi-key update description
//!
//! The [`Storage`] façade composes a raw store with the codec and runs
//! [`AtomicUpdate`]s under bounded optimistic retry.

pub mod codec;
pub mod kv;
pub mod memory;
pub mod redis;
pub mod txn;

pub use self::codec::ProtoCodec;
pub use self::kv::{CommitOutcome, KvStore, WatchTxn, WriteBatch, WriteOp};
pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;
pub use self::txn::{AtomicUpdate, DeferredWrite, Mutation, OldValue};

use std::sync::Arc;

use prost::Message;

use crate::core::error::{RegistryError, RegistryResult};

/// Bound on optimistic retries per transaction.
pub const MAX_TXN_RETRIES: usize = 10;

/// Typed façade over a raw [`KvStore`].
#[derive(Clone)]
pub struct Storage {
    kv: Arc<dyn KvStore>,
}

impl Storage {
    /// Wrap a raw store.
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Read and decode one value. Absent keys are `Ok(None)`.
    pub async fn get<T: Message + Default>(&self, key: &str) -> RegistryResult<Option<T>> {
        match self.kv.get(key).await? {
            None => Ok(None),
            Some(bytes) => ProtoCodec::decode(&bytes).map(Some),
        }
    }

    /// Encode and write one value unconditionally.
    pub async fn set<T: Message>(&self, key: &str, value: &T) -> RegistryResult<()> {
        self.kv.set(key, ProtoCodec::encode(value)).await
    }

    /// Delete keys unconditionally. Absent keys are not errors.
    pub async fn delete(&self, keys: &[String]) -> RegistryResult<()> {
        self.kv.delete(keys).await
    }

    /// Apply `update` atomically with bounded optimistic retry.
    ///
    /// Each attempt arms a watch on the locked keys, reads the old values
    /// through it, runs the updaters in order against that snapshot, stages
    /// the resulting writes together with the locked deletes and the deferred
    /// supplier output, and commits. A conflicting commit retries from the
    /// watch; any other failure aborts the transaction and nothing is
    /// written. After [`MAX_TXN_RETRIES`] conflicts the transaction fails
    /// with [`RegistryError::ConcurrentUpdate`] naming the watched keys.
    pub async fn apply_atomically(&self, mut update: AtomicUpdate<'_>) -> RegistryResult<()> {
        let watched = update.watched_keys();

        for _ in 0..MAX_TXN_RETRIES {
            let mut txn = self.kv.watch(&watched).await?;

            let locked_keys: Vec<String> = update
                .locked_writes
                .iter()
                .map(|write| write.key.clone())
                .collect();
            let mut old_values = Vec::with_capacity(locked_keys.len());
            for key in &locked_keys {
                old_values.push(txn.read(key).await?);
            }

            let mut batch = WriteBatch::new();
            for (write, old) in update.locked_writes.iter_mut().zip(&old_values) {
                match (write.update)(OldValue::new(old.as_deref()))? {
                    Mutation::Keep => {}
                    Mutation::Put(value) => batch.set(write.key.clone(), value),
                    Mutation::Delete => batch.delete(write.key.clone()),
                }
            }
            for key in &update.locked_deletes {
                batch.delete(key.clone());
            }
            if let Some(supplier) = update.deferred_writes.as_mut() {
                for write in supplier() {
                    batch.set(write.key, write.value);
                }
            }
            if let Some(supplier) = update.deferred_deletes.as_mut() {
                for key in supplier() {
                    batch.delete(key);
                }
            }

            match txn.commit(batch).await? {
                CommitOutcome::Committed => return Ok(()),
                CommitOutcome::Conflict => continue,
            }
        }

        Err(RegistryError::ConcurrentUpdate { keys: watched })
    }
}

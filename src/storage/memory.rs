//! In-memory store with versioned optimistic transactions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::kv::{CommitOutcome, KvStore, WatchTxn, WriteBatch, WriteOp};
use crate::core::error::RegistryResult;

/// HashMap-backed [`KvStore`].
///
/// Every mutation bumps a per-key version counter. A watch records the
/// versions it observed and the commit revalidates them under the store lock,
/// so transactions behave like the remote store's watch protocol. Version
/// counters survive deletion, which is what makes "key recreated with the
/// same bytes" a conflict.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Vec<u8>>,
    versions: HashMap<String, u64>,
}

impl Inner {
    fn version(&self, key: &str) -> u64 {
        self.versions.get(key).copied().unwrap_or(0)
    }

    fn bump(&mut self, key: &str) {
        *self.versions.entry(key.to_string()).or_insert(0) += 1;
    }

    fn apply(&mut self, batch: WriteBatch) {
        for op in batch.into_ops() {
            match op {
                WriteOp::Set { key, value } => {
                    self.entries.insert(key.clone(), value);
                    self.bump(&key);
                }
                WriteOp::Delete { key } => {
                    if self.entries.remove(&key).is_some() {
                        self.bump(&key);
                    }
                }
            }
        }
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Check if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Names of all live keys, for test assertions.
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().entries.keys().cloned().collect()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> RegistryResult<Option<Vec<u8>>> {
        Ok(self.inner.lock().entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> RegistryResult<()> {
        let mut inner = self.inner.lock();
        inner.entries.insert(key.to_string(), value);
        inner.bump(key);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> RegistryResult<()> {
        let mut inner = self.inner.lock();
        for key in keys {
            if inner.entries.remove(key).is_some() {
                inner.bump(key);
            }
        }
        Ok(())
    }

    async fn watch(&self, keys: &[String]) -> RegistryResult<Box<dyn WatchTxn>> {
        let inner = self.inner.lock();
        let observed = keys
            .iter()
            .map(|key| (key.clone(), inner.version(key)))
            .collect();
        Ok(Box::new(MemoryWatchTxn {
            store: Arc::clone(&self.inner),
            observed,
        }))
    }
}

struct MemoryWatchTxn {
    store: Arc<Mutex<Inner>>,
    observed: Vec<(String, u64)>,
}

#[async_trait]
impl WatchTxn for MemoryWatchTxn {
    async fn read(&mut self, key: &str) -> RegistryResult<Option<Vec<u8>>> {
        Ok(self.store.lock().entries.get(key).cloned())
    }

    async fn commit(self: Box<Self>, batch: WriteBatch) -> RegistryResult<CommitOutcome> {
        let mut inner = self.store.lock();
        for (key, version) in &self.observed {
            if inner.version(key) != *version {
                return Ok(CommitOutcome::Conflict);
            }
        }
        inner.apply(batch);
        Ok(CommitOutcome::Committed)
    }
}

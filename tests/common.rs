//! Common test utilities.
//!
//! Shared helpers for integration tests. Import with `mod common;`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use asit::core::error::RegistryResult;
use asit::registry::model::Client;
use asit::registry::repository::ClientRepository;
use asit::storage::{
    CommitOutcome, KvStore, MemoryStore, ProtoCodec, Storage, WatchTxn, WriteBatch,
};

/// Repository over a fresh in-memory store; the store is returned too so
/// tests can inspect raw state.
pub fn memory_repository() -> (ClientRepository, MemoryStore) {
    let store = MemoryStore::new();
    let storage = Storage::new(Arc::new(store.clone()));
    (ClientRepository::new(storage), store)
}

/// A client record with one marker property.
pub fn sample_client(id: &str) -> Client {
    Client {
        id: id.to_string(),
        properties: HashMap::from([("a".to_string(), "1".to_string())]),
        last_updated: 0,
    }
}

/// Store wrapper that forces commit conflicts, for retry-path tests.
///
/// The first `forced_conflicts` commits report [`CommitOutcome::Conflict`]
/// without applying anything; later commits pass through to the inner store.
pub struct ConflictStore {
    inner: MemoryStore,
    forced: Arc<AtomicUsize>,
}

impl ConflictStore {
    pub fn new(inner: MemoryStore, forced_conflicts: usize) -> Self {
        Self {
            inner,
            forced: Arc::new(AtomicUsize::new(forced_conflicts)),
        }
    }

    /// A store whose commits never succeed.
    pub fn always(inner: MemoryStore) -> Self {
        Self::new(inner, usize::MAX)
    }
}

#[async_trait]
impl KvStore for ConflictStore {
    async fn get(&self, key: &str) -> RegistryResult<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> RegistryResult<()> {
        self.inner.set(key, value).await
    }

    async fn delete(&self, keys: &[String]) -> RegistryResult<()> {
        self.inner.delete(keys).await
    }

    async fn watch(&self, keys: &[String]) -> RegistryResult<Box<dyn WatchTxn>> {
        let txn = self.inner.watch(keys).await?;
        Ok(Box::new(ConflictTxn {
            inner: txn,
            forced: Arc::clone(&self.forced),
        }))
    }
}

struct ConflictTxn {
    inner: Box<dyn WatchTxn>,
    forced: Arc<AtomicUsize>,
}

#[async_trait]
impl WatchTxn for ConflictTxn {
    async fn read(&mut self, key: &str) -> RegistryResult<Option<Vec<u8>>> {
        self.inner.read(key).await
    }

    async fn commit(self: Box<Self>, batch: WriteBatch) -> RegistryResult<CommitOutcome> {
        let forced = self
            .forced
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |left| {
                if left > 0 {
                    Some(left - 1)
                } else {
                    None
                }
            })
            .is_ok();
        if forced {
            return Ok(CommitOutcome::Conflict);
        }
        let ConflictTxn { inner, .. } = *self;
        inner.commit(batch).await
    }
}

/// Check the cross-index consistency invariants against live state.
pub async fn assert_invariants(repository: &ClientRepository, store: &MemoryStore) {
    let clients = repository.list_clients().await.unwrap();

    // Membership entries are unique and agree with the primary records.
    for client in &clients {
        assert_eq!(
            clients.iter().filter(|c| c.id == client.id).count(),
            1,
            "client {} listed more than once",
            client.id
        );
        let primary = repository
            .get_client(&client.id)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("listed client {} has no primary record", client.id));
        assert_eq!(
            primary.last_updated, client.last_updated,
            "timestamps disagree for client {}",
            client.id
        );
    }

    // Every key in a key set resolves back to its client.
    for client in &clients {
        for key in repository.client_keys(&client.id).await.unwrap() {
            let owner = repository
                .get_client_by_key(&key)
                .await
                .unwrap()
                .unwrap_or_else(|| panic!("key {key} has no reverse-index entry"));
            assert_eq!(owner.id, client.id, "key {key} resolves to the wrong client");
        }
    }

    // Every reverse-index entry appears in its owner's key set.
    for raw_key in store.keys() {
        let Some(key) = raw_key.strip_prefix("client_key:") else {
            continue;
        };
        let bytes = store.get(&raw_key).await.unwrap().unwrap();
        let owner: Client = ProtoCodec::decode(&bytes).unwrap();
        let keys = repository.client_keys(&owner.id).await.unwrap();
        assert!(
            keys.iter().any(|k| k == key),
            "reverse-index entry {key} missing from the key set of {}",
            owner.id
        );
    }
}

//! Client and key repository.
//!
//! Maintains three logical indexes over the store and keeps them consistent
//! by bundling every logical operation into one atomic update:
//!
//! - `all_clients`, the membership list
//! - `client:<id>` / `client_keys:<id>`, the per-client aggregate
//! - `client_key:<key>`, the reverse index holding a denormalised client
//!   snapshot taken at association time and refreshed on every client update

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::model::{
    client_keys_key, client_record_key, now_millis, reverse_index_key, Client, ClientKeys,
    ClientList, KEY_ALL_CLIENTS, MAX_KEY_SIZE,
};
use crate::core::error::{RegistryError, RegistryResult};
use crate::storage::{AtomicUpdate, DeferredWrite, Mutation, Storage, MAX_TXN_RETRIES};

/// Repository over the transactional storage façade.
#[derive(Clone)]
pub struct ClientRepository {
    storage: Storage,
}

impl ClientRepository {
    /// Create a repository over `storage`.
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// All registered clients. An absent membership list reads as empty.
    pub async fn list_clients(&self) -> RegistryResult<Vec<Client>> {
        Ok(self
            .storage
            .get::<ClientList>(KEY_ALL_CLIENTS)
            .await?
            .map(|list| list.clients)
            .unwrap_or_default())
    }

    /// The client registered under `id`, if any.
    pub async fn get_client(&self, id: &str) -> RegistryResult<Option<Client>> {
        self.storage.get(&client_record_key(id)).await
    }

    /// Keys associated with `id`, in insertion order. Absent reads as empty.
    pub async fn client_keys(&self, id: &str) -> RegistryResult<Vec<String>> {
        Ok(self
            .storage
            .get::<ClientKeys>(&client_keys_key(id))
            .await?
            .map(|keys| keys.keys)
            .unwrap_or_default())
    }

    /// The client owning `key`, if any, as the stored snapshot.
    pub async fn get_client_by_key(&self, key: &str) -> RegistryResult<Option<Client>> {
        self.storage.get(&reverse_index_key(key)).await
    }

    /// Create or replace a client, returning the stored snapshot.
    ///
    /// Stamps `last_updated` once and writes the same snapshot to the
    /// membership list, the primary record and every reverse-index entry
    /// currently pointing at the client. A client with no key set gets an
    /// empty cascade; the primary record is always written.
    pub async fn set_client(&self, client: &Client) -> RegistryResult<Client> {
        let mut stored = client.clone();
        stored.last_updated = now_millis();

        let captured_keys: Mutex<Option<Vec<String>>> = Mutex::new(None);

        let update = AtomicUpdate::new()
            .lock(KEY_ALL_CLIENTS, |old| {
                let mut list: ClientList = old.decode()?.unwrap_or_default();
                match list.clients.iter_mut().find(|entry| entry.id == stored.id) {
                    Some(entry) => *entry = stored.clone(),
                    None => list.clients.push(stored.clone()),
                }
                Ok(Mutation::put(&list))
            })
            .lock(client_keys_key(&stored.id), |old| {
                // Capture the key set for the cascade; the watch on this key
                // serialises us against concurrent key adds and removals.
                *captured_keys.lock() = old.decode::<ClientKeys>()?.map(|keys| keys.keys);
                Ok(Mutation::Keep)
            })
            .lock(client_record_key(&stored.id), |_| Ok(Mutation::put(&stored)))
            .deferred_writes(|| {
                captured_keys
                    .lock()
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .map(|key| DeferredWrite::new(reverse_index_key(key), &stored))
                    .collect()
            });

        self.storage.apply_atomically(update).await?;
        Ok(stored)
    }

    /// Delete a client and purge every key pointing at it.
    ///
    /// Removing an unknown client is a no-op on the indexes.
    pub async fn remove_client(&self, id: &str) -> RegistryResult<()> {
        let captured_keys: Mutex<Vec<String>> = Mutex::new(Vec::new());

        let update = AtomicUpdate::new()
            .lock(KEY_ALL_CLIENTS, |old| {
                let Some(mut list) = old.decode::<ClientList>()? else {
                    return Ok(Mutation::Keep);
                };
                let before = list.clients.len();
                list.clients.retain(|entry| entry.id != id);
                if list.clients.len() == before {
                    Ok(Mutation::Keep)
                } else {
                    Ok(Mutation::put(&list))
                }
            })
            .lock(client_keys_key(id), |old| {
                match old.decode::<ClientKeys>()? {
                    None => {
                        captured_keys.lock().clear();
                        Ok(Mutation::Keep)
                    }
                    Some(keys) => {
                        *captured_keys.lock() = keys.keys;
                        Ok(Mutation::Delete)
                    }
                }
            })
            .delete(client_record_key(id))
            .deferred_deletes(|| {
                captured_keys
                    .lock()
                    .iter()
                    .map(|key| reverse_index_key(key))
                    .collect()
            });

        self.storage.apply_atomically(update).await
    }

    /// Associate `key` with the client registered under `client_id`.
    ///
    /// The primary record is watched but not mutated, so a concurrent client
    /// deletion conflicts instead of resurrecting the reverse index. Adding a
    /// key the client already holds refreshes the reverse-index snapshot and
    /// leaves the key set unchanged.
    pub async fn add_client_key(&self, client_id: &str, key: &str) -> RegistryResult<()> {
        if key.is_empty() {
            return Err(RegistryError::invalid_input("client key must not be empty"));
        }
        if key.len() > MAX_KEY_SIZE {
            return Err(RegistryError::invalid_input(format!(
                "client key exceeds {MAX_KEY_SIZE} bytes"
            )));
        }

        let snapshot: Mutex<Option<Client>> = Mutex::new(None);

        let update = AtomicUpdate::new()
            .lock(client_record_key(client_id), |old| {
                match old.decode::<Client>()? {
                    None => Err(RegistryError::EntityNotFound),
                    Some(client) => {
                        *snapshot.lock() = Some(client);
                        Ok(Mutation::Keep)
                    }
                }
            })
            .lock(client_keys_key(client_id), |old| {
                let mut keys: ClientKeys = old.decode()?.unwrap_or_default();
                if !keys.keys.iter().any(|existing| existing == key) {
                    keys.keys.push(key.to_string());
                }
                Ok(Mutation::put(&keys))
            })
            .lock(reverse_index_key(key), |old| {
                if let Some(owner) = old.decode::<Client>()? {
                    if owner.id != client_id {
                        return Err(RegistryError::non_unique_key(key));
                    }
                }
                match snapshot.lock().as_ref() {
                    Some(client) => Ok(Mutation::put(client)),
                    None => Err(RegistryError::storage(
                        "client snapshot missing from the locked phase",
                    )),
                }
            });

        self.storage.apply_atomically(update).await
    }

    /// Dissociate `key` from its client. Removing an absent key succeeds.
    ///
    /// The lookup outside the transaction only discovers the owner; the
    /// locked updater on the reverse index re-checks the stored owner and
    /// flags the attempt stale when it changed underneath us, in which case
    /// the whole operation restarts from the lookup.
    pub async fn remove_client_key(&self, key: &str) -> RegistryResult<()> {
        for _ in 0..MAX_TXN_RETRIES {
            let Some(owner) = self.get_client_by_key(key).await? else {
                return Ok(());
            };

            let stale = AtomicBool::new(false);

            let update = AtomicUpdate::new()
                .lock(reverse_index_key(key), |old| {
                    match old.decode::<Client>()? {
                        // Someone else already removed it; finishing the
                        // key-set cleanup below stays correct.
                        None => Ok(Mutation::Delete),
                        Some(current) if current.id == owner.id => Ok(Mutation::Delete),
                        Some(_) => {
                            stale.store(true, Ordering::Relaxed);
                            Ok(Mutation::Keep)
                        }
                    }
                })
                .lock(client_keys_key(&owner.id), |old| {
                    if stale.load(Ordering::Relaxed) {
                        return Ok(Mutation::Keep);
                    }
                    match old.decode::<ClientKeys>()? {
                        None => Ok(Mutation::Keep),
                        Some(mut keys) => {
                            keys.keys.retain(|existing| existing != key);
                            Ok(Mutation::put(&keys))
                        }
                    }
                });

            self.storage.apply_atomically(update).await?;
            if !stale.load(Ordering::Relaxed) {
                return Ok(());
            }
        }

        Err(RegistryError::ConcurrentUpdate {
            keys: vec![reverse_index_key(key)],
        })
    }
}

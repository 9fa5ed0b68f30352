//! Atomic multi-key update description.
//!
//! An [`AtomicUpdate`] bundles the locked conditional writes, the locked
//! unconditional deletes and the deferred suppliers of one logical operation.
//! The engine in [`Storage`](super::Storage) executes it with bounded
//! optimistic retry.

use prost::Message;

use super::codec::ProtoCodec;
use crate::core::error::RegistryResult;

/// Accessor handed to locked updaters.
///
/// Wraps the raw bytes observed for the key when the watch was armed, so an
/// updater decodes exactly the snapshot that guards its commit.
pub struct OldValue<'a> {
    raw: Option<&'a [u8]>,
}

impl<'a> OldValue<'a> {
    pub(crate) fn new(raw: Option<&'a [u8]>) -> Self {
        Self { raw }
    }

    /// Check if the key held a value.
    pub fn is_present(&self) -> bool {
        self.raw.is_some()
    }

    /// Decode the observed value. `Ok(None)` when the key was absent.
    pub fn decode<T: Message + Default>(&self) -> RegistryResult<Option<T>> {
        match self.raw {
            None => Ok(None),
            Some(bytes) => ProtoCodec::decode(bytes).map(Some),
        }
    }
}

/// Outcome of a locked updater.
pub enum Mutation {
    /// Leave the key untouched. The watch guard still applies.
    Keep,
    /// Replace the value with the given encoded bytes.
    Put(Vec<u8>),
    /// Delete the key.
    Delete,
}

impl Mutation {
    /// Stage a typed write, encoding it with the wire codec.
    pub fn put<T: Message>(value: &T) -> Self {
        Mutation::Put(ProtoCodec::encode(value))
    }
}

/// Locked conditional updater: observed old value in, mutation out.
///
/// Updaters must be pure functions of their inputs; the engine re-runs them
/// on every retry attempt.
pub type Updater<'a> = Box<dyn FnMut(OldValue<'_>) -> RegistryResult<Mutation> + Send + 'a>;

pub(crate) struct LockedWrite<'a> {
    pub key: String,
    pub update: Updater<'a>,
}

/// A write produced by a deferred supplier, already encoded.
pub struct DeferredWrite {
    /// Target key. Not watched.
    pub key: String,
    /// Encoded value.
    pub value: Vec<u8>,
}

impl DeferredWrite {
    /// Stage a typed deferred write.
    pub fn new<T: Message>(key: impl Into<String>, value: &T) -> Self {
        Self {
            key: key.into(),
            value: ProtoCodec::encode(value),
        }
    }
}

type DeferredWrites<'a> = Box<dyn FnMut() -> Vec<DeferredWrite> + Send + 'a>;
type DeferredDeletes<'a> = Box<dyn FnMut() -> Vec<String> + Send + 'a>;

/// Description of one atomic multi-key update.
///
/// Locked writes and locked deletes arm the watch. Deferred suppliers run
/// after the locked phase of each attempt and their writes land in the same
/// commit, but their target keys are not watched; they carry cascades whose
/// targets are discovered while the locked phase holds the guard.
#[derive(Default)]
pub struct AtomicUpdate<'a> {
    pub(crate) locked_writes: Vec<LockedWrite<'a>>,
    pub(crate) locked_deletes: Vec<String>,
    pub(crate) deferred_writes: Option<DeferredWrites<'a>>,
    pub(crate) deferred_deletes: Option<DeferredDeletes<'a>>,
}

impl<'a> AtomicUpdate<'a> {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a locked conditional write. Updaters run in insertion order.
    pub fn lock(
        mut self,
        key: impl Into<String>,
        update: impl FnMut(OldValue<'_>) -> RegistryResult<Mutation> + Send + 'a,
    ) -> Self {
        self.locked_writes.push(LockedWrite {
            key: key.into(),
            update: Box::new(update),
        });
        self
    }

    /// Add a locked unconditional delete.
    pub fn delete(mut self, key: impl Into<String>) -> Self {
        self.locked_deletes.push(key.into());
        self
    }

    /// Set the deferred-writes supplier.
    pub fn deferred_writes(
        mut self,
        supplier: impl FnMut() -> Vec<DeferredWrite> + Send + 'a,
    ) -> Self {
        self.deferred_writes = Some(Box::new(supplier));
        self
    }

    /// Set the deferred-deletes supplier.
    pub fn deferred_deletes(mut self, supplier: impl FnMut() -> Vec<String> + Send + 'a) -> Self {
        self.deferred_deletes = Some(Box::new(supplier));
        self
    }

    /// Watched-key set: locked deletes first, then locked write keys.
    pub fn watched_keys(&self) -> Vec<String> {
        let mut keys =
            Vec::with_capacity(self.locked_deletes.len() + self.locked_writes.len());
        keys.extend(self.locked_deletes.iter().cloned());
        keys.extend(self.locked_writes.iter().map(|write| write.key.clone()));
        keys
    }
}

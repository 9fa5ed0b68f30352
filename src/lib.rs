//! ASIT - client and access-key registry over a watched key-value store.
//!
//! The service keeps a registry of clients and their lookup keys behind an
//! HTTP API, with all state in a remote key-value store. Multi-key updates
//! are synthesised from the store's single-key watch primitive: each logical
//! operation bundles its conditional writes into one optimistic transaction
//! that commits atomically or retries on conflict.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP API (axum)                         │
//! │        routing │ request ids │ CORS │ error mapping             │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Client/Key Repository                       │
//! │   membership list │ primary records │ key sets │ reverse index  │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Transaction Engine                         │
//! │      locked updaters │ deferred cascades │ bounded retry        │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       KV Store Adapter                          │
//! │            Redis (watch/pipeline) │ in-memory (versioned)       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! ## Core
//! - [`core::config`] - Environment configuration and validation
//! - [`core::error`] - Error types shared by every layer
//!
//! ## Storage
//! - [`storage::kv`] - Raw store contract and write batches
//! - [`storage::redis`] - Redis implementation
//! - [`storage::memory`] - Versioned in-memory implementation
//! - [`storage::codec`] - Wire encoding for persisted values
//! - [`storage::txn`] - Atomic multi-key update description
//!
//! ## Registry
//! - [`registry::model`] - Record types and the key layout
//! - [`registry::repository`] - Domain operations
//!
//! ## HTTP API
//! - [`api::server`] - Router assembly and the listening loop
//! - [`api::handlers`] - Route handlers
//! - [`api::middleware`] - Request-id, logging and CORS layers
//!
//! ## CLI
//! - [`cli::commands`] - CLI command implementations
//!
//! # Key Invariants
//!
//! - Every client in a primary record appears exactly once in the
//!   membership list.
//! - Every key in a client's key set resolves through the reverse index to
//!   that client, and vice versa.
//! - A key maps to at most one client.
//! - `last_updated` is non-decreasing per client id.

// Core infrastructure
pub mod core;

// Storage layer
pub mod storage;

// Domain registry
pub mod registry;

// HTTP adapter
pub mod api;

// CLI
pub mod cli;

// Re-exports for convenience
pub use crate::core::{config, error};
pub use registry::{model, repository, Client, ClientRepository};
pub use storage::{MemoryStore, ProtoCodec, RedisStore, Storage};

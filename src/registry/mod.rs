//! Client and key registry.
//!
//! - [`model`] - Persisted record types and the key layout
//! - [`repository`] - Domain operations over the transactional storage

pub mod model;
pub mod repository;

pub use model::{Client, ClientKeys, ClientList};
pub use repository::ClientRepository;

//! Persisted record types and the key layout.
//!
//! The records double as wire messages (prost, stable field tags) and HTTP
//! payloads (serde). Which record type lives under which key prefix is a
//! repository-level contract.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Membership list of all registered clients.
pub const KEY_ALL_CLIENTS: &str = "all_clients";
/// Prefix of the primary record, `client:<id>`.
pub const KEY_CLIENT_PREFIX: &str = "client:";
/// Prefix of the reverse index, `client_key:<key>`.
pub const KEY_CLIENT_KEY_PREFIX: &str = "client_key:";
/// Prefix of the per-client key set, `client_keys:<id>`.
pub const KEY_CLIENT_KEYS_PREFIX: &str = "client_keys:";

/// Largest accepted client key, in bytes.
pub const MAX_KEY_SIZE: usize = 1024;

/// A registered client.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct Client {
    /// Externally assigned UUID.
    #[prost(string, tag = "1")]
    #[serde(default)]
    pub id: String,

    /// Opaque property payload.
    #[prost(map = "string, string", tag = "2")]
    #[serde(default)]
    pub properties: HashMap<String, String>,

    /// Wall-clock milliseconds since the Unix epoch; non-decreasing per id.
    #[prost(int64, tag = "3")]
    #[serde(default)]
    pub last_updated: i64,
}

/// The `all_clients` membership list.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct ClientList {
    #[prost(message, repeated, tag = "1")]
    #[serde(default)]
    pub clients: Vec<Client>,
}

/// Key set of one client, in insertion order, no duplicates.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct ClientKeys {
    #[prost(string, repeated, tag = "1")]
    #[serde(default)]
    pub keys: Vec<String>,
}

/// Primary record key for `id`.
pub fn client_record_key(id: &str) -> String {
    format!("{KEY_CLIENT_PREFIX}{id}")
}

/// Reverse-index key for the client key `key`.
pub fn reverse_index_key(key: &str) -> String {
    format!("{KEY_CLIENT_KEY_PREFIX}{key}")
}

/// Key-set key for `id`.
pub fn client_keys_key(id: &str) -> String {
    format!("{KEY_CLIENT_KEYS_PREFIX}{id}")
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

//! HTTP API adapter.
//!
//! - [`server`] - Router assembly and the listening loop
//! - [`handlers`] - Route handlers
//! - [`middleware`] - Request-id, request-logging and CORS layers
//! - [`error`] - Error-to-status mapping and the error header

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;

pub use server::{router, serve, AppState, API_PREFIX};

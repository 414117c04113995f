//! JSON HTTP API for the presentation layer.
//!
//! Routes are nested under `/api/`. `api_router()` returns a `Router` that
//! can be mounted on any axum server; `start_api_server()` runs one.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server, ApiServer, ApiSession};
pub use types::ApiContext;

//! Hospital REST API.
//!
//! Routes are nested under `/api/`. Everything except health and token
//! issuance goes through: Auth → Audit → Role gate → Handler.
//!
//! The router is composable: `api_router()` returns a `Router` that can be
//! mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_server_on, ApiServer, ServerError};
pub use types::ApiContext;

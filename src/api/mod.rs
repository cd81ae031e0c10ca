//! HTTP gateway.
//!
//! Every request passes the audit logger and the edge gatekeeper. Auth flow
//! routes live under `/auth`, the role router under `/dashboard`, the JSON
//! records API under `/api`. Anything else falls through to static files.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod route_class;
pub mod router;
pub mod security_headers;
pub mod server;
pub mod types;

pub use router::build_router;
pub use server::{start_server, GatewayServer, ServerError};
pub use types::ApiContext;

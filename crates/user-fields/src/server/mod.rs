//! Axum HTTP server, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router: each route is an explicit handler bound to a path.
//! - Resolve the acting user from the configured request header.
//! - Inject shared application state (`AppState`) into handlers.
//!
//! The store has no knowledge of HTTP; handlers only translate requests into
//! store calls and store errors into status codes.

pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

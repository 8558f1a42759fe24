pub mod auth;
pub mod billing;
pub mod generate;
pub mod middleware;
pub mod questions;
pub mod quota;
pub mod rest;
pub mod sessions;
pub mod state;
pub mod usage;

// Re-export the handlers the server binary wires into the router.
pub use middleware::require_auth;
pub use sessions::{create_session_handler, list_sessions_handler};

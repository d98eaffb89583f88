pub mod auth;
pub mod calendar;
pub mod emotions;
pub mod entries;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod weather;

// Re-export the middleware and the shared state so the binary building the
// router can reach them directly.
pub use middleware::require_session;
pub use state::{AppState, SessionContext, SessionRegistry};

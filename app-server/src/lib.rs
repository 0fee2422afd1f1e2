//! HTTP surface of the maintenance copilot.
//!
//! Routes only translate between HTTP and the copilot, completion and
//! retrieval crates; all behaviour lives there.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;

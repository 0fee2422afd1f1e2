//! # Maintenance Copilot Agent
//!
//! A conversational agent that helps hotel guests and staff file maintenance
//! requests. Each conversation owns an append-only transcript seeded with the
//! copilot persona; replies come from the completion provider, which may call
//! the maintenance tools on the model's behalf.
//!
//! `CopilotSessions` keeps one agent per session id and evicts idle ones.

pub mod copilot;
pub mod error;
pub mod persona;
pub mod sessions;
pub mod transcript;

pub use copilot::MaintenanceCopilot;
pub use error::{AgentError, Result};
pub use persona::MAINTENANCE_COPILOT_PERSONA;
pub use sessions::{CopilotSessions, SessionConfig, SessionReply};
pub use transcript::Transcript;

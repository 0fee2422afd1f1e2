//! # Tool Surface
//!
//! The fixed set of backend operations the maintenance copilot's language
//! model may invoke. Tools are typed handlers registered by name once at
//! startup; the completion loop enumerates them as JSON-schema descriptors
//! and invokes them by name with a JSON object of arguments.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Tool Surface                                 │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ToolRegistry ──► ToolExecutor ──► ToolHandler                 │
//! │       │                                 │                       │
//! │       ▼                                 ▼                       │
//! │  ToolDescriptor / ToolSpec      MaintenanceRequest tools        │
//! │                                         │                       │
//! │                                         ▼                       │
//! │                                   RequestStore                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod executor;
pub mod maintenance;
pub mod registry;
pub mod spec;
pub mod storage;
pub mod tool;

pub use error::{Result, StorageError, ToolError};
pub use executor::{ExecutionResult, ToolExecutor};
pub use maintenance::{
    CreateMaintenanceRequestTool, MaintenanceRequest, SaveMaintenanceRequestTool,
    register_maintenance_tools,
};
pub use registry::{ToolRegistry, log_tool_surface};
pub use spec::{DataType, InputConstraints, ToolInput, ToolSpec};
pub use storage::{FileRequestStore, InMemoryRequestStore, RequestStore};
pub use tool::{ToolDescriptor, ToolEffect, ToolHandler};

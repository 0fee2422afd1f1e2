//! Core tool types.
//!
//! A tool is a named backend operation the model may ask to run. Each one is
//! a typed handler behind the `ToolHandler` trait and describes itself with a
//! `ToolDescriptor`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::spec::ToolSpec;

/// How the model should treat a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolEffect {
    /// Reads or builds data without external effects.
    #[default]
    ReadOnly,
    /// Changes state outside the process (e.g. a database write).
    Consequential,
}

/// The name, purpose and argument schema of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Name the model uses to call the tool.
    pub name: String,

    /// Description of what the tool does, shown to the model.
    pub description: String,

    /// Argument specification.
    pub spec: ToolSpec,

    /// Whether invoking the tool has external effects.
    #[serde(default)]
    pub effect: ToolEffect,
}

impl ToolDescriptor {
    /// Create a new descriptor with no arguments.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            spec: ToolSpec::new(),
            effect: ToolEffect::ReadOnly,
        }
    }

    /// Set the argument specification.
    pub fn with_spec(mut self, spec: ToolSpec) -> Self {
        self.spec = spec;
        self
    }

    /// Mark the tool as having external effects.
    pub fn consequential(mut self) -> Self {
        self.effect = ToolEffect::Consequential;
        self
    }

    /// Render in the OpenAI function-calling format.
    pub fn function_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.spec.generate_schema()
            }
        })
    }
}

/// A backend operation that can be invoked by name.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Describe the tool to the model.
    fn descriptor(&self) -> ToolDescriptor;

    /// Run the tool with arguments that already passed `descriptor().spec`
    /// validation. Returns the payload reported back to the model.
    async fn call(&self, arguments: serde_json::Value) -> Result<serde_json::Value>;
}

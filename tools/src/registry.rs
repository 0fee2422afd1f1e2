//! Tool registry for runtime tool dispatch.
//!
//! The registry maps tool names to handlers. It is filled once at startup and
//! then shared read-only, so the model can name a tool and the backend can
//! run it without any runtime type inspection.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Result, ToolError};
use crate::executor::{ExecutionResult, ToolExecutor};
use crate::tool::{ToolDescriptor, ToolHandler};

/// Name-indexed table of available tools.
pub struct ToolRegistry {
    /// Handlers by tool name.
    tools: HashMap<String, Arc<dyn ToolHandler>>,

    /// Runs handlers with validation and timeouts.
    executor: ToolExecutor,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            executor: ToolExecutor::new(),
        }
    }

    /// Use the given executor for invocations.
    pub fn with_executor(mut self, executor: ToolExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Register a tool. Names must be unique and non-empty.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) -> Result<()> {
        let name = handler.descriptor().name;

        if name.is_empty() {
            return Err(ToolError::InvalidDefinition(
                "tool name must not be empty".to_string(),
            ));
        }
        if self.tools.contains_key(&name) {
            return Err(ToolError::AlreadyExists(name));
        }

        debug!("Registered tool: {name}");
        self.tools.insert(name, handler);
        Ok(())
    }

    /// Check whether a tool is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Descriptors of every registered tool, sorted by name.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let mut descriptors: Vec<ToolDescriptor> =
            self.tools.values().map(|t| t.descriptor()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Invoke a tool by name.
    ///
    /// Unknown names, invalid arguments, handler errors and timeouts all come
    /// back as a failed result.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: serde_json::Value,
        timeout: Option<Duration>,
    ) -> ExecutionResult {
        let Some(tool) = self.tools.get(name) else {
            warn!("Model requested unknown tool: {name}");
            return ExecutionResult::failure(ToolError::NotFound(name.to_string()).to_string(), 0);
        };

        self.executor.execute(tool.as_ref(), arguments, timeout).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ToolRegistry").field("tools", &names).finish()
    }
}

/// Log the registered tool surface once at startup.
pub fn log_tool_surface(registry: &ToolRegistry) {
    let names: Vec<String> = registry.descriptors().into_iter().map(|d| d.name).collect();
    info!("Tool surface ready with {} tools: {names:?}", names.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolDescriptor;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    struct Named(&'static str);

    #[async_trait]
    impl ToolHandler for Named {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new(self.0, "test tool")
        }

        async fn call(&self, _arguments: serde_json::Value) -> Result<serde_json::Value> {
            Ok(serde_json::json!({ "called": self.0 }))
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Named("beta"))).unwrap();
        registry.register(Arc::new(Named("alpha"))).unwrap();

        assert!(registry.contains("alpha"));
        assert_eq!(registry.len(), 2);
        let names: Vec<String> = registry.descriptors().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Named("alpha"))).unwrap();
        let err = registry.register(Arc::new(Named("alpha"))).unwrap_err();
        assert!(matches!(err, ToolError::AlreadyExists(name) if name == "alpha"));
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let mut registry = ToolRegistry::new();
        assert!(registry.register(Arc::new(Named(""))).is_err());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_invoke_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Named("alpha"))).unwrap();

        let result = registry.invoke("alpha", serde_json::json!({}), None).await;
        assert!(result.success);
        assert_eq!(result.output, serde_json::json!({ "called": "alpha" }));
    }

    struct Pause;

    #[async_trait]
    impl ToolHandler for Pause {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new("pause", "Waits ten seconds")
        }

        async fn call(&self, _arguments: serde_json::Value) -> Result<serde_json::Value> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(serde_json::Value::Null)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_executor_sets_default_timeout() {
        let mut registry = ToolRegistry::new()
            .with_executor(ToolExecutor::new().with_default_timeout(Duration::from_secs(1)));
        registry.register(Arc::new(Pause)).unwrap();

        let result = registry.invoke("pause", serde_json::json!({}), None).await;
        assert_eq!(
            result.error.as_deref(),
            Some("tool pause timed out after 1000ms")
        );
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool_fails_softly() {
        let registry = ToolRegistry::new();
        let result = registry.invoke("missing", serde_json::json!({}), None).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("tool not found: missing"));
    }
}

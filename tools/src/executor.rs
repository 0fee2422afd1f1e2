//! Tool execution engine.
//!
//! The `ToolExecutor` runs a handler with input validation, a time limit and
//! result capture. Failures never escape as errors: they come back as a
//! failed `ExecutionResult` so the caller can hand them to the model.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ToolError;
use crate::tool::ToolHandler;

/// Result of tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Whether execution succeeded.
    pub success: bool,

    /// Output from the tool.
    pub output: serde_json::Value,

    /// Error message if failed.
    pub error: Option<String>,

    /// Execution time in milliseconds.
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Create a successful result.
    pub fn success(output: serde_json::Value, duration_ms: u64) -> Self {
        Self {
            success: true,
            output,
            error: None,
            duration_ms,
        }
    }

    /// Create a failed result.
    pub fn failure(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            output: serde_json::Value::Null,
            error: Some(error.into()),
            duration_ms,
        }
    }

    /// The text reported back to the model for this result.
    pub fn to_payload(&self) -> String {
        match &self.error {
            Some(error) => serde_json::json!({ "error": error }).to_string(),
            None => match &self.output {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        }
    }
}

/// Executor for running tools.
pub struct ToolExecutor {
    /// Default timeout for executions.
    default_timeout: Duration,
}

impl ToolExecutor {
    /// Create a new tool executor.
    pub fn new() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
        }
    }

    /// Set the default timeout.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// The timeout used when the caller does not supply one.
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Execute a tool with the given arguments.
    ///
    /// `timeout` replaces the default limit for this call.
    pub async fn execute(
        &self,
        tool: &dyn ToolHandler,
        arguments: serde_json::Value,
        timeout: Option<Duration>,
    ) -> ExecutionResult {
        let start = Instant::now();
        let descriptor = tool.descriptor();
        let limit = timeout.unwrap_or(self.default_timeout);

        debug!("Executing tool: {} with arguments: {arguments}", descriptor.name);

        if let Err(message) = descriptor.spec.validate_inputs(&arguments) {
            warn!("Rejected arguments for tool {}: {message}", descriptor.name);
            return ExecutionResult::failure(
                ToolError::InvalidInput(message).to_string(),
                start.elapsed().as_millis() as u64,
            );
        }

        let outcome = match tokio::time::timeout(limit, tool.call(arguments)).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::TimedOut {
                name: descriptor.name.clone(),
                after_ms: limit.as_millis() as u64,
            }),
        };

        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(output) => {
                info!(
                    "Tool {} executed successfully in {duration_ms}ms",
                    descriptor.name
                );
                ExecutionResult::success(output, duration_ms)
            }
            Err(e) => {
                warn!("Tool {} failed: {e}", descriptor.name);
                ExecutionResult::failure(e.to_string(), duration_ms)
            }
        }
    }
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::spec::{DataType, ToolInput, ToolSpec};
    use crate::tool::ToolDescriptor;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new("echo", "Echo the text back").with_spec(
                ToolSpec::new().with_input(ToolInput::required("text", DataType::String, "Text")),
            )
        }

        async fn call(&self, arguments: serde_json::Value) -> Result<serde_json::Value> {
            Ok(arguments["text"].clone())
        }
    }

    struct Stalls;

    #[async_trait]
    impl ToolHandler for Stalls {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new("stalls", "Never finishes in time")
        }

        async fn call(&self, _arguments: serde_json::Value) -> Result<serde_json::Value> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(serde_json::Value::Null)
        }
    }

    #[test]
    fn test_executor_creation() {
        let executor = ToolExecutor::new();
        assert_eq!(executor.default_timeout(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_successful_execution() {
        let executor = ToolExecutor::new();
        let result = executor
            .execute(&Echo, serde_json::json!({ "text": "hi" }), None)
            .await;

        assert!(result.success);
        assert_eq!(result.to_payload(), "hi");
    }

    #[tokio::test]
    async fn test_invalid_arguments_fail_without_calling() {
        let executor = ToolExecutor::new();
        let result = executor.execute(&Echo, serde_json::json!({}), None).await;

        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("invalid input: Missing required input: text")
        );
        assert!(result.to_payload().contains("\"error\""));
    }

    struct Slow(Duration);

    #[async_trait]
    impl ToolHandler for Slow {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new("slow", "Takes a while")
        }

        async fn call(&self, _arguments: serde_json::Value) -> Result<serde_json::Value> {
            tokio::time::sleep(self.0).await;
            Ok(serde_json::json!("finished"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_timeout_may_exceed_default() {
        let executor = ToolExecutor::new();
        let result = executor
            .execute(
                &Slow(Duration::from_secs(45)),
                serde_json::json!({}),
                Some(Duration::from_secs(60)),
            )
            .await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.to_payload(), "finished");
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_timeout_applies_without_override() {
        let executor = ToolExecutor::new().with_default_timeout(Duration::from_secs(5));
        let result = executor
            .execute(&Slow(Duration::from_secs(45)), serde_json::json!({}), None)
            .await;

        assert_eq!(
            result.error.as_deref(),
            Some("tool slow timed out after 5000ms")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_failure() {
        let executor = ToolExecutor::new();
        let result = executor
            .execute(&Stalls, serde_json::json!({}), Some(Duration::from_millis(10)))
            .await;

        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("tool stalls timed out after 10ms")
        );
    }
}

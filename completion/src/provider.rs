//! The bounded tool loop.
//!
//! `CompletionProvider` asks the model for a reply, runs whatever tools it
//! requests, feeds the results back and repeats until the model answers. The
//! loop stops with an error once the model has used up its tool rounds or the
//! whole call runs out of time.

use std::sync::Arc;
use std::time::Duration;

use copilot_tools::{ToolDescriptor, ToolRegistry};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{CompletionError, Result};
use crate::message::{ConversationTurn, ToolCallRequest, ToolInvocation};
use crate::model::{ChatModel, ModelReply};

/// Limits applied to a single completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionConfig {
    /// Maximum number of tool rounds before the model must answer.
    pub max_rounds: u32,

    /// Timeout for one model request.
    pub request_timeout: Duration,

    /// Timeout for one tool invocation.
    pub tool_timeout: Duration,

    /// Time budget for the whole completion, tool rounds included.
    pub budget: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            max_rounds: 5,
            request_timeout: Duration::from_secs(60),
            tool_timeout: Duration::from_secs(30),
            budget: Duration::from_secs(120),
        }
    }
}

impl CompletionConfig {
    /// Set the maximum number of tool rounds.
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Set the model request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the tool invocation timeout.
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    /// Set the overall time budget.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }
}

/// Outcome of a successful completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Tool turns produced along the way, in invocation order.
    pub tool_turns: Vec<ConversationTurn>,

    /// The model's final answer.
    pub reply: ConversationTurn,

    /// Number of tool rounds used.
    pub rounds: u32,
}

impl Completion {
    /// All produced turns: tool turns first, then the reply.
    pub fn into_turns(self) -> Vec<ConversationTurn> {
        let mut turns = self.tool_turns;
        turns.push(self.reply);
        turns
    }
}

/// Produces assistant replies, auto-invoking tools along the way.
pub struct CompletionProvider {
    model: Arc<dyn ChatModel>,
    tools: Arc<ToolRegistry>,
    config: CompletionConfig,
}

impl CompletionProvider {
    /// Create a provider over a model and a tool registry.
    pub fn new(model: Arc<dyn ChatModel>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            model,
            tools,
            config: CompletionConfig::default(),
        }
    }

    /// Use the given limits.
    pub fn with_config(mut self, config: CompletionConfig) -> Self {
        self.config = config;
        self
    }

    /// Active limits.
    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    /// The tool registry the provider dispatches to.
    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Produce the next assistant reply for `history`.
    ///
    /// Only tools in `available_tools` may be invoked; a request for anything
    /// else becomes a failed tool turn. `history` is not modified, the
    /// produced turns are returned in the `Completion`.
    pub async fn complete(
        &self,
        history: &[ConversationTurn],
        available_tools: &[ToolDescriptor],
    ) -> Result<Completion> {
        let mut tool_turns = Vec::new();
        self.complete_into(history, available_tools, &mut tool_turns)
            .await
    }

    /// Like [`complete`](Self::complete), but each tool turn is pushed onto
    /// `tool_turns` as soon as its tool has run.
    ///
    /// On success the turns move into the returned `Completion`. On failure
    /// they stay in `tool_turns`, so the caller can record tools that already
    /// took effect.
    pub async fn complete_into(
        &self,
        history: &[ConversationTurn],
        available_tools: &[ToolDescriptor],
        tool_turns: &mut Vec<ConversationTurn>,
    ) -> Result<Completion> {
        let deadline = Instant::now() + self.config.budget;
        let mut working: Vec<ConversationTurn> = history.to_vec();
        let mut round: u32 = 0;

        loop {
            let reply = self.ask_model(&working, available_tools, deadline).await?;

            let calls = match reply {
                ModelReply::Answer(text) => {
                    info!(
                        "Completion finished after {round} tool rounds via {}",
                        self.model.name()
                    );
                    return Ok(Completion {
                        tool_turns: std::mem::take(tool_turns),
                        reply: ConversationTurn::assistant(text),
                        rounds: round,
                    });
                }
                ModelReply::ToolCalls(calls) => calls,
            };

            if round >= self.config.max_rounds {
                warn!(
                    "Model still requesting tools after {} rounds",
                    self.config.max_rounds
                );
                return Err(CompletionError::LoopBoundExceeded {
                    max_rounds: self.config.max_rounds,
                });
            }
            round += 1;

            debug!("Tool round {round}: {} calls", calls.len());
            for call in calls {
                let turn = self
                    .run_tool(call, round, available_tools, deadline)
                    .await?;
                working.push(turn.clone());
                tool_turns.push(turn);
                // A tool that ate the rest of the budget fails the completion.
                self.remaining(deadline)?;
            }
        }
    }

    async fn ask_model(
        &self,
        history: &[ConversationTurn],
        tools: &[ToolDescriptor],
        deadline: Instant,
    ) -> Result<ModelReply> {
        let limit = self.remaining(deadline)?.min(self.config.request_timeout);

        match tokio::time::timeout(limit, self.model.respond(history, tools)).await {
            Ok(reply) => reply,
            Err(_) => Err(CompletionError::Timeout {
                after_ms: limit.as_millis() as u64,
            }),
        }
    }

    async fn run_tool(
        &self,
        call: ToolCallRequest,
        round: u32,
        available_tools: &[ToolDescriptor],
        deadline: Instant,
    ) -> Result<ConversationTurn> {
        let remaining = self.remaining(deadline)?;

        let result = if available_tools.iter().any(|t| t.name == call.name) {
            let limit = remaining.min(self.config.tool_timeout);
            self.tools
                .invoke(&call.name, call.arguments.clone(), Some(limit))
                .await
        } else {
            warn!("Model requested tool outside the offered set: {}", call.name);
            copilot_tools::ExecutionResult::failure(
                format!("tool not available: {}", call.name),
                0,
            )
        };

        let invocation = ToolInvocation {
            call_id: call.id,
            name: call.name,
            arguments: call.arguments,
            round,
            failed: !result.success,
        };
        Ok(ConversationTurn::tool(invocation, result.to_payload()))
    }

    fn remaining(&self, deadline: Instant) -> Result<Duration> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(CompletionError::Timeout {
                after_ms: self.config.budget.as_millis() as u64,
            });
        }
        Ok(remaining)
    }
}

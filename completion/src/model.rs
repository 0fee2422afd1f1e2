//! The hosted chat model seam.

use async_trait::async_trait;
use copilot_tools::ToolDescriptor;

use crate::error::Result;
use crate::message::{ConversationTurn, ToolCallRequest};

/// What the model produced for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// A final answer for the user.
    Answer(String),

    /// One or more tool invocations to run before asking again.
    ToolCalls(Vec<ToolCallRequest>),
}

/// A hosted chat-completion model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Get the name of this model backend.
    fn name(&self) -> &str;

    /// Produce the next message for `history`, optionally requesting tools
    /// from `tools`.
    async fn respond(
        &self,
        history: &[ConversationTurn],
        tools: &[ToolDescriptor],
    ) -> Result<ModelReply>;
}

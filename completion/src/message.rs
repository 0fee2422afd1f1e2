//! Conversation turns.

use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// A tool invocation the model asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Provider-assigned call id, echoed back with the result.
    pub id: String,

    /// Tool name.
    pub name: String,

    /// Arguments as sent by the model.
    pub arguments: serde_json::Value,
}

/// The invocation a tool turn answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Provider-assigned call id.
    pub call_id: String,

    /// Tool name.
    pub name: String,

    /// Arguments as sent by the model.
    pub arguments: serde_json::Value,

    /// Round of the completion loop the call belongs to, starting at 1.
    pub round: u32,

    /// Whether the tool reported an error.
    pub failed: bool,
}

/// One entry of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who produced the turn.
    pub role: Role,

    /// Text of the turn. For tool turns, the tool's payload or error.
    pub content: String,

    /// Set on tool turns only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation: Option<ToolInvocation>,
}

impl ConversationTurn {
    /// A system instruction turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    /// An assistant answer.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// The result of a tool invocation.
    pub fn tool(invocation: ToolInvocation, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            invocation: Some(invocation),
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            invocation: None,
        }
    }
}

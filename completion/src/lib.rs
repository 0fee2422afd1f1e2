//! # Chat Completion
//!
//! Produces the copilot's next reply from a conversation history. The model
//! may ask for tools; the provider runs them through the tool registry,
//! appends the results and asks again, up to a fixed number of rounds and
//! within one time budget.
//!
//! ```text
//! history ──► CompletionProvider ──► ChatModel ──► Answer ──► Completion
//!                    ▲                    │
//!                    │                    ▼
//!               tool turns ◄── ToolRegistry ◄── ToolCalls
//! ```

pub mod error;
pub mod message;
pub mod model;
pub mod openai;
pub mod provider;

#[cfg(any(test, feature = "test-support"))]
pub mod scripted;

pub use error::{CompletionError, Result};
pub use message::{ConversationTurn, Role, ToolCallRequest, ToolInvocation};
pub use model::{ChatModel, ModelReply};
pub use openai::{ChatEndpoint, OpenAiChatModel, to_wire_messages};
pub use provider::{Completion, CompletionConfig, CompletionProvider};

#[cfg(any(test, feature = "test-support"))]
pub use scripted::ScriptedModel;

//! A chat model that plays back a fixed script.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use copilot_tools::ToolDescriptor;

use crate::error::{CompletionError, Result};
use crate::message::ConversationTurn;
use crate::model::{ChatModel, ModelReply};

/// Replies with the scripted outcomes in order and records every history it
/// was asked about.
#[derive(Default)]
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<ModelReply>>>,
    requests: Mutex<Vec<Vec<ConversationTurn>>>,
}

impl ScriptedModel {
    /// Script the given replies.
    pub fn new(replies: Vec<ModelReply>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Append a reply to the script.
    pub fn with_reply(self, reply: ModelReply) -> Self {
        self.push(Ok(reply));
        self
    }

    /// Append a failure to the script.
    pub fn with_failure(self, error: CompletionError) -> Self {
        self.push(Err(error));
        self
    }

    /// Histories received so far, one per request.
    pub fn requests(&self) -> Vec<Vec<ConversationTurn>> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of scripted outcomes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn push(&self, outcome: Result<ModelReply>) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(outcome);
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn respond(
        &self,
        history: &[ConversationTurn],
        _tools: &[ToolDescriptor],
    ) -> Result<ModelReply> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(history.to_vec());

        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| {
                Err(CompletionError::InvalidResponse(
                    "script exhausted".to_string(),
                ))
            })
    }
}

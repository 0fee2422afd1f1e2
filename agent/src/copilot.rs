//! The maintenance copilot agent.

use std::sync::Arc;

use copilot_completion::{ConversationTurn, CompletionProvider};
use copilot_tools::ToolDescriptor;
use tracing::{debug, info, warn};

use crate::error::{AgentError, Result};
use crate::persona::MAINTENANCE_COPILOT_PERSONA;
use crate::transcript::Transcript;

/// One conversation with the maintenance copilot.
///
/// The agent owns its transcript. `chat` takes `&mut self`, so a single
/// conversation is never driven concurrently; share it behind a mutex.
pub struct MaintenanceCopilot {
    provider: Arc<CompletionProvider>,
    tools: Vec<ToolDescriptor>,
    transcript: Transcript,
}

impl MaintenanceCopilot {
    /// Start a conversation with the copilot persona and every tool the
    /// provider's registry holds.
    pub fn new(provider: Arc<CompletionProvider>) -> Self {
        let tools = provider.tools().descriptors();
        Self::with_persona(provider, tools, MAINTENANCE_COPILOT_PERSONA)
    }

    /// Start a conversation with custom instructions and tool set.
    pub fn with_persona(
        provider: Arc<CompletionProvider>,
        tools: Vec<ToolDescriptor>,
        persona: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            tools,
            transcript: Transcript::new(persona),
        }
    }

    /// The conversation so far.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Send a user message and return the copilot's reply.
    ///
    /// A failure before any tool ran leaves the transcript as it was. When
    /// tools already ran, the user turn and their tool turns are kept so the
    /// model sees their effects on the next message.
    pub async fn chat(&mut self, message: &str) -> Result<String> {
        if message.trim().is_empty() {
            return Err(AgentError::Validation(
                "message must not be empty".to_string(),
            ));
        }

        let user = ConversationTurn::user(message);
        let mut history = self.transcript.turns().to_vec();
        history.push(user.clone());

        debug!(
            "Copilot chat with {} prior turns and {} tools",
            self.transcript.len(),
            self.tools.len()
        );
        let mut tool_turns = Vec::new();
        let outcome = self
            .provider
            .complete_into(&history, &self.tools, &mut tool_turns)
            .await;
        let completion = match outcome {
            Ok(completion) => completion,
            Err(err) => {
                if !tool_turns.is_empty() {
                    warn!(
                        "Completion failed after {} tool turns; keeping them: {err}",
                        tool_turns.len()
                    );
                    let mut produced = vec![user];
                    produced.extend(tool_turns);
                    self.transcript.extend(produced)?;
                }
                return Err(err.into());
            }
        };
        let reply = completion.reply.content.clone();
        let rounds = completion.rounds;

        let mut produced = vec![user];
        produced.extend(completion.into_turns());
        self.transcript.extend(produced)?;

        info!(
            "Copilot replied after {rounds} tool rounds; transcript has {} turns",
            self.transcript.len()
        );
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copilot_completion::{
        CompletionConfig, CompletionError, ModelReply, Role, ScriptedModel, ToolCallRequest,
    };
    use copilot_tools::{
        InMemoryRequestStore, RequestStore, ToolRegistry, register_maintenance_tools,
    };
    use pretty_assertions::assert_eq;

    fn copilot_with(
        model: Arc<ScriptedModel>,
        store: Arc<InMemoryRequestStore>,
        config: CompletionConfig,
    ) -> MaintenanceCopilot {
        let mut registry = ToolRegistry::new();
        register_maintenance_tools(&mut registry, store).unwrap();
        let provider = CompletionProvider::new(model, Arc::new(registry)).with_config(config);
        MaintenanceCopilot::new(Arc::new(provider))
    }

    fn roles(copilot: &MaintenanceCopilot) -> Vec<Role> {
        copilot.transcript().turns().iter().map(|t| t.role).collect()
    }

    #[tokio::test]
    async fn test_plain_chat_appends_user_and_assistant() {
        let model = Arc::new(ScriptedModel::new(vec![ModelReply::Answer(
            "How can I help?".into(),
        )]));
        let mut copilot = copilot_with(
            model.clone(),
            Arc::new(InMemoryRequestStore::new()),
            CompletionConfig::default(),
        );

        let reply = copilot.chat("hello").await.unwrap();

        assert_eq!(reply, "How can I help?");
        assert_eq!(roles(&copilot), vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(
            copilot.transcript().turns()[0].content,
            MAINTENANCE_COPILOT_PERSONA
        );
        assert_eq!(model.requests()[0].len(), 2);
    }

    #[tokio::test]
    async fn test_leak_is_saved_once_after_approval() {
        let store = Arc::new(InMemoryRequestStore::new());
        let model = Arc::new(ScriptedModel::new(vec![
            ModelReply::Answer(
                "I can file a request for the leak in room 204 at Oceanview Inn. Shall I save it?"
                    .into(),
            ),
            ModelReply::ToolCalls(vec![ToolCallRequest {
                id: "call_save".into(),
                name: "save_maintenance_request".into(),
                arguments: serde_json::json!({
                    "hotel_id": 3,
                    "hotel": "Oceanview Inn",
                    "details": "Water leaking from the bathroom ceiling",
                    "room_number": 204
                }),
            }]),
            ModelReply::Answer("Hotel maintenance has been notified.".into()),
        ]));
        let mut copilot =
            copilot_with(model, store.clone(), CompletionConfig::default());

        copilot
            .chat("There's a leak in the bathroom of room 204 at Oceanview Inn (hotel 3)")
            .await
            .unwrap();
        assert!(store.list().await.unwrap().is_empty());

        let reply = copilot.chat("Yes, please save it").await.unwrap();

        assert_eq!(reply, "Hotel maintenance has been notified.");
        assert_eq!(
            roles(&copilot),
            vec![
                Role::System,
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Tool,
                Role::Assistant,
            ]
        );
        let saved = store.list().await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].room_number, Some(204));

        let tool_turn = &copilot.transcript().turns()[4];
        assert!(tool_turn.content.contains("\"status\":\"saved\""));
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected_before_the_model() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let mut copilot = copilot_with(
            model.clone(),
            Arc::new(InMemoryRequestStore::new()),
            CompletionConfig::default(),
        );

        let err = copilot.chat("   ").await.unwrap_err();

        assert!(matches!(err, AgentError::Validation(_)));
        assert!(model.requests().is_empty());
        assert_eq!(copilot.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_completion_leaves_transcript_unchanged() {
        let model = Arc::new(
            ScriptedModel::new(vec![])
                .with_failure(CompletionError::ProviderUnavailable("down".into()))
                .with_reply(ModelReply::Answer("back again".into())),
        );
        let mut copilot = copilot_with(
            model,
            Arc::new(InMemoryRequestStore::new()),
            CompletionConfig::default(),
        );

        let err = copilot.chat("hello").await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::Completion(CompletionError::ProviderUnavailable(_))
        ));
        assert_eq!(copilot.transcript().len(), 1);

        assert_eq!(copilot.chat("hello").await.unwrap(), "back again");
        assert_eq!(copilot.transcript().len(), 3);
    }

    #[tokio::test]
    async fn test_loop_bound_fails_the_chat() {
        let create = || {
            ModelReply::ToolCalls(vec![ToolCallRequest {
                id: "call".into(),
                name: "create_maintenance_request".into(),
                arguments: serde_json::json!({
                    "hotel_id": 1,
                    "hotel": "Harbor Lodge",
                    "details": "Broken lamp"
                }),
            }])
        };
        let model = Arc::new(ScriptedModel::new(vec![create(), create()]));
        let mut copilot = copilot_with(
            model,
            Arc::new(InMemoryRequestStore::new()),
            CompletionConfig::default().with_max_rounds(1),
        );

        let err = copilot.chat("lamp is broken").await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::Completion(CompletionError::LoopBoundExceeded { max_rounds: 1 })
        ));
        assert_eq!(roles(&copilot), vec![Role::System, Role::User, Role::Tool]);
    }

    #[tokio::test]
    async fn test_save_survives_a_failed_chat() {
        let store = Arc::new(InMemoryRequestStore::new());
        let save = ModelReply::ToolCalls(vec![ToolCallRequest {
            id: "call_save".into(),
            name: "save_maintenance_request".into(),
            arguments: serde_json::json!({
                "hotel_id": 7,
                "hotel": "Cedar Court",
                "details": "Elevator stuck between floors"
            }),
        }]);
        let again = ModelReply::ToolCalls(vec![ToolCallRequest {
            id: "call_create".into(),
            name: "create_maintenance_request".into(),
            arguments: serde_json::json!({
                "hotel_id": 7,
                "hotel": "Cedar Court",
                "details": "Elevator stuck between floors"
            }),
        }]);
        let model = Arc::new(ScriptedModel::new(vec![
            save,
            again,
            ModelReply::Answer("The request was already saved.".into()),
        ]));
        let mut copilot = copilot_with(
            model.clone(),
            store.clone(),
            CompletionConfig::default().with_max_rounds(1),
        );

        let err = copilot.chat("Yes, save it").await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::Completion(CompletionError::LoopBoundExceeded { .. })
        ));
        assert_eq!(store.list().await.unwrap().len(), 1);
        assert_eq!(roles(&copilot), vec![Role::System, Role::User, Role::Tool]);
        let tool_turn = &copilot.transcript().turns()[2];
        assert!(tool_turn.content.contains("\"status\":\"saved\""));

        let reply = copilot.chat("Did it go through?").await.unwrap();

        assert_eq!(reply, "The request was already saved.");
        assert_eq!(store.list().await.unwrap().len(), 1);
        // The retry is sent with the earlier save in its history.
        let retry = &model.requests()[2];
        assert_eq!(retry.len(), 4);
        assert_eq!(retry[2].role, Role::Tool);
        assert_eq!(
            roles(&copilot),
            vec![
                Role::System,
                Role::User,
                Role::Tool,
                Role::User,
                Role::Assistant,
            ]
        );
    }
}

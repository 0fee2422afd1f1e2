//! OpenAI chat-completions backend.
//!
//! Works against api.openai.com and Azure OpenAI deployments; both speak the
//! same message format and differ only in URL and auth header.

use std::time::Duration;

use async_trait::async_trait;
use copilot_tools::ToolDescriptor;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CompletionError, Result};
use crate::message::{ConversationTurn, Role, ToolCallRequest};
use crate::model::{ChatModel, ModelReply};

/// Where chat completions are sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatEndpoint {
    /// api.openai.com or a compatible server.
    OpenAi { base_url: String, model: String },

    /// An Azure OpenAI chat deployment.
    Azure {
        endpoint: String,
        deployment: String,
        api_version: String,
    },
}

impl ChatEndpoint {
    fn url(&self) -> String {
        match self {
            Self::OpenAi { base_url, .. } => {
                format!("{}/chat/completions", base_url.trim_end_matches('/'))
            }
            Self::Azure {
                endpoint,
                deployment,
                api_version,
            } => format!(
                "{}/openai/deployments/{deployment}/chat/completions?api-version={api_version}",
                endpoint.trim_end_matches('/')
            ),
        }
    }

    fn model(&self) -> &str {
        match self {
            Self::OpenAi { model, .. } => model,
            Self::Azure { deployment, .. } => deployment,
        }
    }
}

impl Default for ChatEndpoint {
    fn default() -> Self {
        Self::OpenAi {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
        }
    }
}

/// Chat model backed by the chat-completions HTTP API.
pub struct OpenAiChatModel {
    /// API key.
    api_key: Option<String>,

    /// Target of the requests.
    endpoint: ChatEndpoint,

    /// HTTP client.
    client: reqwest::Client,

    /// Upper bound for a single request.
    timeout: Duration,
}

impl OpenAiChatModel {
    /// Create a model for `endpoint`, reading the key from `OPENAI_API_KEY`.
    pub fn new(endpoint: ChatEndpoint) -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            endpoint,
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check if the model is usable (API key set).
    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn map_send_error(&self, err: reqwest::Error) -> CompletionError {
        if err.is_timeout() {
            CompletionError::Timeout {
                after_ms: self.timeout.as_millis() as u64,
            }
        } else {
            CompletionError::ProviderUnavailable(err.to_string())
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn name(&self) -> &str {
        match self.endpoint {
            ChatEndpoint::OpenAi { .. } => "openai",
            ChatEndpoint::Azure { .. } => "azure-openai",
        }
    }

    async fn respond(
        &self,
        history: &[ConversationTurn],
        tools: &[ToolDescriptor],
    ) -> Result<ModelReply> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(CompletionError::ProviderNotConfigured)?;

        let mut body = serde_json::json!({
            "model": self.endpoint.model(),
            "messages": to_wire_messages(history),
        });
        if !tools.is_empty() {
            let functions: Vec<serde_json::Value> =
                tools.iter().map(ToolDescriptor::function_schema).collect();
            body["tools"] = serde_json::Value::Array(functions);
            body["tool_choice"] = serde_json::json!("auto");
        }

        debug!(
            "Requesting completion from {} with {} turns and {} tools",
            self.name(),
            history.len(),
            tools.len()
        );

        let builder = self
            .client
            .post(self.endpoint.url())
            .timeout(self.timeout)
            .json(&body);
        let builder = match self.endpoint {
            ChatEndpoint::Azure { .. } => builder.header("api-key", api_key),
            ChatEndpoint::OpenAi { .. } => builder.bearer_auth(api_key),
        };

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(CompletionError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CompletionError::ProviderUnavailable(format!(
                "API error ({status}): {error_text}"
            )));
        }

        let result: WireResponse = response.json().await.map_err(|e| self.map_send_error(e))?;
        let reply = parse_reply(result)?;

        match &reply {
            ModelReply::Answer(text) => info!("Model answered with {} characters", text.len()),
            ModelReply::ToolCalls(calls) => info!("Model requested {} tool calls", calls.len()),
        }

        Ok(reply)
    }
}

/// Convert a transcript into chat-completions messages.
///
/// Consecutive tool turns of the same round are preceded by one synthesised
/// assistant message carrying their `tool_calls`, which is how the API
/// expects tool results to be introduced.
pub fn to_wire_messages(history: &[ConversationTurn]) -> Vec<serde_json::Value> {
    let mut messages = Vec::with_capacity(history.len());
    let mut i = 0;

    while i < history.len() {
        let turn = &history[i];
        let Some(invocation) = turn.invocation.as_ref().filter(|_| turn.role == Role::Tool) else {
            messages.push(serde_json::json!({
                "role": turn.role.as_str(),
                "content": turn.content,
            }));
            i += 1;
            continue;
        };

        let round = invocation.round;
        let group: Vec<&ConversationTurn> = history[i..]
            .iter()
            .take_while(|t| {
                t.role == Role::Tool && t.invocation.as_ref().is_some_and(|inv| inv.round == round)
            })
            .collect();

        let tool_calls: Vec<serde_json::Value> = group
            .iter()
            .filter_map(|t| t.invocation.as_ref())
            .map(|inv| {
                serde_json::json!({
                    "id": inv.call_id,
                    "type": "function",
                    "function": {
                        "name": inv.name,
                        "arguments": inv.arguments.to_string(),
                    }
                })
            })
            .collect();

        messages.push(serde_json::json!({
            "role": "assistant",
            "content": null,
            "tool_calls": tool_calls,
        }));

        for t in &group {
            if let Some(inv) = &t.invocation {
                messages.push(serde_json::json!({
                    "role": "tool",
                    "tool_call_id": inv.call_id,
                    "content": t.content,
                }));
            }
        }

        i += group.len();
    }

    messages
}

fn parse_reply(response: WireResponse) -> Result<ModelReply> {
    let message = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::InvalidResponse("No choices in response".to_string()))?
        .message;

    let calls = message.tool_calls.unwrap_or_default();
    if !calls.is_empty() {
        let requests = calls
            .into_iter()
            .map(|call| ToolCallRequest {
                // Unparseable arguments are passed on as a string so the
                // tool's validation reports the problem back to the model.
                arguments: serde_json::from_str(&call.function.arguments)
                    .unwrap_or(serde_json::Value::String(call.function.arguments)),
                id: call.id,
                name: call.function.name,
            })
            .collect();
        return Ok(ModelReply::ToolCalls(requests));
    }

    message
        .content
        .map(ModelReply::Answer)
        .ok_or_else(|| {
            CompletionError::InvalidResponse(
                "Response has neither content nor tool calls".to_string(),
            )
        })
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

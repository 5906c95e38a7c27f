//! LLM senders for the two personas.
//!
//! A [`Sender`] makes one model call over the conversation so far and
//! reports either final text or the tool calls the model wants run.

use super::prompts::{taskmaster_system_prompt, QUARTERMASTER_PROMPT};
use super::tools::GadgetTools;
use crate::conversation::{ConversationLog, ToolCallRequest};
use crate::mission::GameState;
use async_trait::async_trait;
use claude::{Claude, Request, Tool};
use thiserror::Error;

/// Errors from a single model call.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("Claude API error: {0}")]
    Api(#[from] claude::Error),
}

impl SendError {
    /// Whether the turn can be retried as-is.
    pub fn is_retryable(&self) -> bool {
        match self {
            SendError::Api(e) => e.is_retryable(),
        }
    }
}

/// Outcome of one model call.
#[derive(Debug, Clone, PartialEq)]
pub enum SenderReply {
    /// The model answered; the turn is over.
    Text(String),
    /// The model wants tools run before it continues.
    ToolCalls {
        /// Any text the model produced alongside the calls.
        text: String,
        calls: Vec<ToolCallRequest>,
    },
}

/// One call to a language model persona.
#[async_trait]
pub trait Sender: Send + Sync {
    /// Adjust the conversation before the first call of a turn.
    fn prepare(&self, _log: &mut ConversationLog) {}

    /// Send the conversation (and, for mission-aware personas, the game state).
    async fn send(
        &self,
        log: &ConversationLog,
        state: Option<&GameState>,
    ) -> Result<SenderReply, SendError>;
}

/// Generation settings shared by the Claude-backed senders.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    pub model: Option<String>,
    pub max_tokens: usize,
    pub temperature: Option<f32>,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 1024,
            temperature: Some(0.8),
        }
    }
}

impl SenderConfig {
    fn request(&self, system: String, log: &ConversationLog, tools: Vec<Tool>) -> Request {
        let (_, messages) = log.to_claude();
        let mut request = Request::new(messages)
            .with_system(system)
            .with_max_tokens(self.max_tokens)
            .with_tools(tools);

        if let Some(ref model) = self.model {
            request = request.with_model(model);
        }
        if let Some(temp) = self.temperature {
            request = request.with_temperature(temp);
        }
        request
    }
}

async fn call(client: &Claude, request: Request) -> Result<SenderReply, SendError> {
    let response = client.complete(request).await?;
    tracing::debug!(
        stop_reason = ?response.stop_reason,
        input_tokens = response.usage.input_tokens,
        output_tokens = response.usage.output_tokens,
        "model replied"
    );

    let text = response.text();
    if !response.wants_tools() {
        return Ok(SenderReply::Text(text));
    }

    let calls = response
        .tool_uses()
        .into_iter()
        .map(|tool_use| ToolCallRequest {
            id: tool_use.id,
            name: tool_use.name,
            arguments: tool_use.input,
        })
        .collect();
    Ok(SenderReply::ToolCalls { text, calls })
}

/// Mission-aware sender: phase instructions and state go into the system prompt.
pub struct TaskmasterSender {
    client: Claude,
    config: SenderConfig,
}

impl TaskmasterSender {
    pub fn new(client: Claude, config: SenderConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl Sender for TaskmasterSender {
    async fn send(
        &self,
        log: &ConversationLog,
        state: Option<&GameState>,
    ) -> Result<SenderReply, SendError> {
        let fallback = GameState::default();
        let state = state.unwrap_or(&fallback);
        let phase = state.current_mission.phase;
        tracing::debug!(%phase, messages = log.len(), "sending to Taskmaster");

        // Quartermaster preambles in the shared log are ignored; the
        // Taskmaster prompt is rebuilt from state on every call.
        let system = taskmaster_system_prompt(state);
        let request = self.config.request(system, log, GadgetTools::taskmaster());
        call(&self.client, request).await
    }
}

/// General-purpose sender for chat outside missions.
pub struct QuartermasterSender {
    client: Claude,
    config: SenderConfig,
}

impl QuartermasterSender {
    pub fn new(client: Claude, config: SenderConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl Sender for QuartermasterSender {
    fn prepare(&self, log: &mut ConversationLog) {
        log.ensure_system_preamble(QUARTERMASTER_PROMPT);
    }

    async fn send(
        &self,
        log: &ConversationLog,
        _state: Option<&GameState>,
    ) -> Result<SenderReply, SendError> {
        tracing::debug!(messages = log.len(), "sending to Quartermaster");
        let (system, _) = log.to_claude();
        let system = system.unwrap_or_else(|| QUARTERMASTER_PROMPT.to_string());
        let request = self.config.request(system, log, GadgetTools::quartermaster());
        call(&self.client, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quartermaster_prepare_adds_preamble_once() {
        let sender = QuartermasterSender::new(Claude::new("test-key"), SenderConfig::default());
        let mut log = ConversationLog::starting_with("Any news?");
        sender.prepare(&mut log);
        sender.prepare(&mut log);
        assert_eq!(log.len(), 2);
        assert_eq!(log.messages()[0].role(), "system");
    }

    #[test]
    fn test_taskmaster_prepare_is_noop() {
        let sender = TaskmasterSender::new(Claude::new("test-key"), SenderConfig::default());
        let mut log = ConversationLog::starting_with("Go.");
        sender.prepare(&mut log);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_request_carries_config() {
        let config = SenderConfig {
            model: Some("claude-test".into()),
            max_tokens: 256,
            temperature: None,
        };
        let log = ConversationLog::starting_with("hello");
        let request = config.request("sys".into(), &log, GadgetTools::quartermaster());
        assert_eq!(request.model.as_deref(), Some("claude-test"));
        assert_eq!(request.max_tokens, 256);
        assert_eq!(request.system.as_deref(), Some("sys"));
        assert!(request.temperature.is_none());
        assert_eq!(request.tools.map(|t| t.len()), Some(2));
        assert_eq!(request.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_network_failure_is_retryable() {
        let client = Claude::new("test-key").with_base_url("http://127.0.0.1:9");
        let sender = QuartermasterSender::new(client, SenderConfig::default());
        let log = ConversationLog::starting_with("hello");

        let err = sender.send(&log, None).await.unwrap_err();
        assert!(err.is_retryable());
    }
}

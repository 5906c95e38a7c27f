//! The tool-calling loop.
//!
//! Sends the conversation, runs any tools the model asks for, feeds the
//! results back and repeats until the model answers in plain text.

use super::sender::{SendError, Sender, SenderReply};
use super::tools::ToolExecutor;
use crate::conversation::{ChatMessage, ConversationLog};
use crate::mission::GameState;
use std::sync::Arc;
use thiserror::Error;

/// Default number of tool rounds allowed in one turn.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 10;

/// Errors that end a turn.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("Model call failed: {0}")]
    Send(#[from] SendError),

    #[error("Model kept calling tools after {limit} rounds")]
    ToolLoopExceeded { limit: usize },
}

impl TurnError {
    /// Whether the player can simply try the turn again.
    pub fn is_retryable(&self) -> bool {
        match self {
            TurnError::Send(e) => e.is_retryable(),
            TurnError::ToolLoopExceeded { .. } => false,
        }
    }
}

/// Drives one persona through a turn.
pub struct ToolLoop {
    sender: Arc<dyn Sender>,
    executor: ToolExecutor,
    max_rounds: usize,
}

impl ToolLoop {
    pub fn new(sender: Arc<dyn Sender>, executor: ToolExecutor) -> Self {
        Self {
            sender,
            executor,
            max_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Run the turn to a final answer.
    ///
    /// `state` is `None` for stateless personas. When present it is threaded
    /// through every tool call in order and updated in place, so tools that
    /// ran before a failure stay applied. The final text is appended to the
    /// log as an assistant message.
    pub async fn run(
        &self,
        log: &mut ConversationLog,
        state: &mut Option<GameState>,
    ) -> Result<String, TurnError> {
        self.sender.prepare(log);

        let mut rounds = 0;
        loop {
            tracing::debug!(round = rounds, messages = log.len(), "tool loop round");
            let reply = self.sender.send(log, state.as_ref()).await?;

            let (text, calls) = match reply {
                SenderReply::Text(text) => {
                    log.push(ChatMessage::assistant(text.clone()));
                    return Ok(text);
                }
                SenderReply::ToolCalls { text, calls } => (text, calls),
            };

            if rounds == self.max_rounds {
                tracing::warn!(limit = self.max_rounds, "tool loop bound exceeded");
                return Err(TurnError::ToolLoopExceeded {
                    limit: self.max_rounds,
                });
            }
            rounds += 1;

            log.push(ChatMessage::Assistant {
                content: text,
                tool_calls: calls.clone(),
            });

            for call in calls {
                let (result, updated) = self
                    .executor
                    .execute(&call.name, &call.arguments, state.clone())
                    .await;
                // Stateless personas still get tool results but never keep state.
                if state.is_some() {
                    *state = Some(updated);
                }
                log.push(ChatMessage::tool(call.id, result));
            }
        }
    }
}

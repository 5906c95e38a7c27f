//! Conversation log shared by both personas.
//!
//! The log is provider-neutral: role-tagged entries that the Claude
//! senders translate into Messages API turns on every call.

use claude::{ContentBlock, Message, Role, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// One entry in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ChatMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(default)]
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        ChatMessage::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }

    /// Role name as it appears on the wire.
    pub fn role(&self) -> &'static str {
        match self {
            ChatMessage::System { .. } => "system",
            ChatMessage::User { .. } => "user",
            ChatMessage::Assistant { .. } => "assistant",
            ChatMessage::Tool { .. } => "tool",
        }
    }
}

/// Ordered, append-only history of a session's conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationLog {
    messages: Vec<ChatMessage>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a log with a single user message.
    pub fn starting_with(user_text: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::user(user_text)],
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::user(content));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Insert `preamble` as the first message unless a system message exists.
    pub fn ensure_system_preamble(&mut self, preamble: &str) {
        let has_system = self
            .messages
            .iter()
            .any(|m| matches!(m, ChatMessage::System { .. }));
        if !has_system {
            self.messages.insert(0, ChatMessage::system(preamble));
        }
    }

    /// Translate into a Messages API system prompt and turn list.
    ///
    /// System entries are joined into the system prompt. Consecutive tool
    /// entries fold into a single user turn of `tool_result` blocks.
    pub fn to_claude(&self) -> (Option<String>, Vec<Message>) {
        let mut system: Vec<&str> = Vec::new();
        let mut turns: Vec<Message> = Vec::new();

        for message in &self.messages {
            match message {
                ChatMessage::System { content } => system.push(content),
                ChatMessage::User { content } => turns.push(Message::user(content)),
                ChatMessage::Assistant {
                    content,
                    tool_calls,
                } => {
                    let mut blocks = Vec::new();
                    if !content.is_empty() {
                        blocks.push(ContentBlock::Text {
                            text: content.clone(),
                        });
                    }
                    blocks.extend(tool_calls.iter().map(|call| ContentBlock::ToolUse {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        input: call.arguments.clone(),
                    }));
                    // Empty assistant turns are rejected by the API.
                    if !blocks.is_empty() {
                        turns.push(Message {
                            role: Role::Assistant,
                            content: blocks,
                        });
                    }
                }
                ChatMessage::Tool {
                    tool_call_id,
                    content,
                } => {
                    let block =
                        ContentBlock::tool_result(tool_call_id, ToolResult::success(content));
                    match turns.last_mut() {
                        Some(last) if is_tool_result_turn(last) => last.content.push(block),
                        _ => turns.push(Message::tool_results(vec![block])),
                    }
                }
            }
        }

        let system = (!system.is_empty()).then(|| system.join("\n\n"));
        (system, turns)
    }
}

fn is_tool_result_turn(message: &Message) -> bool {
    message.role == Role::User
        && !message.content.is_empty()
        && message
            .content
            .iter()
            .all(|block| matches!(block, ContentBlock::ToolResult { .. }))
}

//! AI personas and the machinery that drives them.
//!
//! Contains the tool definitions and executor, prompt assembly, the
//! Claude-backed senders, mission generation and the tool-calling loop.

pub mod generator;
mod orchestrator;
pub mod prompts;
mod sender;
pub mod tools;

pub use generator::{
    ClaudeMissionGenerator, GenerateError, MissionGenerator, OfflineMissionGenerator,
    MISSION_COUNT,
};
pub use orchestrator::{ToolLoop, TurnError, DEFAULT_MAX_TOOL_ROUNDS};
pub use sender::{
    QuartermasterSender, SendError, Sender, SenderConfig, SenderReply, TaskmasterSender,
};
pub use tools::{GadgetCall, GadgetTools, ToolExecutor, UNKNOWN_TOOL};

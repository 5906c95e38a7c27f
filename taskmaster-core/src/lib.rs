//! Spy mission game engine with an AI Taskmaster.
//!
//! This crate provides:
//! - A four-phase mission state machine (travel, briefing, crack_code, complete)
//! - Taskmaster and Quartermaster personas driven by Claude tool calling
//! - Weather and Caesar-cipher gadgets
//! - Per-phase player actions, including the decryptor puzzle
//! - Session management with optional file-backed state and mission log
//!
//! # Quick Start
//!
//! ```ignore
//! use taskmaster_core::{GameConfig, GameSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GameConfig::from_env().with_state_file("game_state.json");
//!     let mut session = GameSession::new(config).await?;
//!
//!     let reply = session.new_game().await?;
//!     println!("{}", reply.content);
//!
//!     let reply = session.choose_option(2).await?;
//!     println!("{}", reply.content);
//!     Ok(())
//! }
//! ```

pub mod affordance;
pub mod agent;
pub mod config;
pub mod conversation;
pub mod gadgets;
pub mod mission;
pub mod persist;
pub mod registry;
pub mod session;
pub mod testing;

// Re-export for convenience
pub use gadget_macros::Tool;

// Primary public API
pub use affordance::{Action, Choice};
pub use config::GameConfig;
pub use conversation::{ChatMessage, ConversationLog};
pub use mission::{GameState, MissionOption, MissionState, Phase, Transition};
pub use registry::{DispatchError, SessionId, SessionRegistry};
pub use session::{Collaborators, Command, GameSession, Reply, SessionError};
pub use testing::{ScriptedSender, TestHarness};

//! Concurrent access to many sessions.
//!
//! Each session sits behind its own async mutex. A dispatched command runs
//! on its own task and holds that lock for the whole turn, so turns for one
//! session never interleave while other sessions carry on.

use crate::config::GameConfig;
use crate::session::{Command, GameSession, Reply, SessionError};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Identifier handed out for each registered session.
pub type SessionId = Uuid;

/// A session shared between tasks.
pub type SharedSession = Arc<Mutex<GameSession>>;

/// Errors from dispatching a command.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unknown session: {0}")]
    UnknownSession(SessionId),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Turn task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// All live sessions, keyed by id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SharedSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a new Claude-backed session and register it.
    pub async fn create(&self, config: GameConfig) -> Result<SessionId, SessionError> {
        let session = GameSession::new(config).await?;
        Ok(self.insert(session).await)
    }

    /// Register a session under a fresh id.
    pub async fn insert(&self, session: GameSession) -> SessionId {
        let id = Uuid::new_v4();
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        tracing::debug!(session = %id, "session registered");
        id
    }

    pub async fn get(&self, id: SessionId) -> Option<SharedSession> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Drop a session. A turn already running keeps its handle until done.
    pub async fn remove(&self, id: SessionId) -> Option<SharedSession> {
        let removed = self.sessions.write().await.remove(&id);
        if removed.is_some() {
            tracing::debug!(session = %id, "session removed");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Run a command on its own task, one turn per session at a time.
    pub async fn dispatch(&self, id: SessionId, command: Command) -> Result<Reply, DispatchError> {
        let session = self.get(id).await.ok_or(DispatchError::UnknownSession(id))?;

        let handle = tokio::spawn(async move {
            let mut session = session.lock().await;
            command.execute(&mut session).await
        });

        Ok(handle.await??)
    }
}

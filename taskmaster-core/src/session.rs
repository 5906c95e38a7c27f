//! GameSession - the primary public API for playing a mission.
//!
//! A session owns one player's conversation and game state together with
//! the personas, gadgets and stores that act on them. Every operation
//! returns a [`Reply`]: the text to show and the actions now available.

use crate::affordance::{
    available_actions, decryptor_actions, interpret_choice, Action, Choice,
};
use crate::agent::{
    ClaudeMissionGenerator, GenerateError, MissionGenerator, OfflineMissionGenerator,
    QuartermasterSender, Sender, TaskmasterSender, ToolExecutor, ToolLoop, TurnError,
};
use crate::config::GameConfig;
use crate::conversation::ConversationLog;
use crate::gadgets::{OpenWeather, WeatherService};
use crate::mission::{GameState, Phase};
use crate::persist::{MissionLog, PersistError, StateFile};
use claude::Claude;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

const WELCOME: &str =
    "Welcome, Agent. Your mission awaits. Start a new game to receive your briefing.";

const START_MISSION: &str = "Start the mission. Present the available mission options.";

const DECRYPTOR_ARMED: &str = "Decryptor armed.\n\nBefore you proceed, re-read your briefing carefully. \
The Taskmaster never wastes words. Something in that message holds the key.\n\nSelect the shift:";

const DECRYPTOR_SIGNAL_LOST: &str =
    "Decryptor signal lost. Please choose a valid shift and try again.";

const DECRYPTION_FAILED: &str =
    "DECRYPTION FAILED: Incorrect shift. The signal remains scrambled. Try again.";

const DEBRIEF_INTERRUPTED: &str = "The line to the Taskmaster dropped before the debrief";

const DEBRIEF_RESUMABLE: &str = "Reconnect to receive it.";

/// Errors from GameSession operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No API key configured - set ANTHROPIC_API_KEY environment variable")]
    NoApiKey,

    #[error("No mission is in progress")]
    NoActiveMission,

    #[error("No destination has been confirmed yet")]
    NoDestination,

    #[error("Only available during {expected}; the mission is in {actual}")]
    WrongPhase { expected: Phase, actual: Phase },

    #[error("Choice {position} is not available during {phase}")]
    InvalidChoice { position: usize, phase: Phase },

    #[error("The last turn was interrupted; resume it before continuing")]
    TurnPending,

    #[error("There is no interrupted turn to resume")]
    NothingToResume,

    #[error("Turn failed: {0}")]
    Turn(#[from] TurnError),

    #[error("Mission generation failed: {0}")]
    Generate(#[from] GenerateError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),
}

impl SessionError {
    /// Whether trying again could succeed.
    ///
    /// A retryable turn failure is finished with [`GameSession::resume`], never
    /// by repeating the original operation. A retryable generation failure
    /// left the session untouched, so `new_game` can simply be repeated.
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::Turn(e) => e.is_retryable(),
            SessionError::Generate(GenerateError::Api(e)) => e.is_retryable(),
            _ => false,
        }
    }
}

/// What to show the player after an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub content: String,
    pub actions: Vec<Action>,
}

impl Reply {
    pub fn new(content: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            content: content.into(),
            actions,
        }
    }
}

/// The external services a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub taskmaster: Arc<dyn Sender>,
    pub quartermaster: Arc<dyn Sender>,
    pub generator: Arc<dyn MissionGenerator>,
    pub weather: Arc<dyn WeatherService>,
}

/// A player request, as a front end would issue it.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Welcome,
    NewGame,
    Message(String),
    Choose(usize),
    Weather,
    Decryptor,
    /// A decryptor sub-selection; `None` when it could not be read.
    Shift(Option<u8>),
    Status,
    /// Finish an interrupted turn.
    Resume,
}

impl Command {
    /// Run this command against a session.
    pub async fn execute(self, session: &mut GameSession) -> Result<Reply, SessionError> {
        match self {
            Command::Welcome => Ok(session.welcome()),
            Command::NewGame => session.new_game().await,
            Command::Message(text) => session.send_message(&text).await,
            Command::Choose(position) => session.choose_option(position).await,
            Command::Weather => session.weather_intel().await,
            Command::Decryptor => session.use_decryptor(),
            Command::Shift(shift) => session.submit_shift(shift).await,
            Command::Status => Ok(session.status()),
            Command::Resume => session.resume().await,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Persona {
    Taskmaster,
    Quartermaster,
}

/// A turn whose persona call failed after the player's input was logged
/// and any tools it triggered were applied.
#[derive(Debug, Clone)]
struct PendingTurn {
    persona: Persona,
    user: String,
}

/// One player's game.
pub struct GameSession {
    config: GameConfig,
    state: GameState,
    log: ConversationLog,
    executor: ToolExecutor,
    taskmaster: ToolLoop,
    quartermaster: ToolLoop,
    generator: Arc<dyn MissionGenerator>,
    state_file: Option<StateFile>,
    mission_log: Option<MissionLog>,
    pending: Option<PendingTurn>,
}

impl GameSession {
    /// Create a session backed by Claude.
    ///
    /// Requires `ANTHROPIC_API_KEY`. Restores saved state when a state file
    /// is configured.
    pub async fn new(config: GameConfig) -> Result<Self, SessionError> {
        let mut client = Claude::from_env().map_err(|_| SessionError::NoApiKey)?;
        if let Some(ref model) = config.model {
            client = client.with_model(model);
        }

        let generator: Arc<dyn MissionGenerator> = if config.offline_missions {
            Arc::new(OfflineMissionGenerator::new())
        } else {
            Arc::new(ClaudeMissionGenerator::new(client.clone()))
        };

        let collaborators = Collaborators {
            taskmaster: Arc::new(TaskmasterSender::new(client.clone(), config.sender_config())),
            quartermaster: Arc::new(QuartermasterSender::new(client, config.sender_config())),
            generator,
            weather: Arc::new(OpenWeather::new(config.weather_api_key.clone())),
        };

        let mut session = Self::with_collaborators(config, collaborators);
        session.restore().await;
        Ok(session)
    }

    /// Create a session over explicit collaborators. Starts with empty state.
    pub fn with_collaborators(config: GameConfig, collaborators: Collaborators) -> Self {
        let executor = ToolExecutor::new(collaborators.weather);
        let taskmaster = ToolLoop::new(collaborators.taskmaster, executor.clone())
            .with_max_rounds(config.max_tool_rounds);
        let quartermaster = ToolLoop::new(collaborators.quartermaster, executor.clone())
            .with_max_rounds(config.max_tool_rounds);

        Self {
            state_file: config.state_file.clone().map(StateFile::new),
            mission_log: config.mission_log.clone().map(MissionLog::new),
            config,
            state: GameState::default(),
            log: ConversationLog::new(),
            executor,
            taskmaster,
            quartermaster,
            generator: collaborators.generator,
            pending: None,
        }
    }

    /// Reload game state from the state file, if one is configured.
    pub async fn restore(&mut self) {
        if let Some(ref file) = self.state_file {
            self.state = file.load().await;
            tracing::info!(
                path = %file.path().display(),
                phase = %self.state.current_mission.phase,
                active = self.state.current_mission.active,
                "restored game state"
            );
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn conversation(&self) -> &ConversationLog {
        &self.log
    }

    /// Whether a turn was interrupted and is waiting for [`Self::resume`].
    pub fn has_pending_turn(&self) -> bool {
        self.pending.is_some()
    }

    /// Actions valid right now.
    pub fn actions(&self) -> Vec<Action> {
        if self.pending.is_some() {
            return vec![Action::resume_turn()];
        }
        available_actions(&self.state.current_mission)
    }

    /// Greeting shown when a player connects.
    pub fn welcome(&self) -> Reply {
        Reply::new(WELCOME, self.actions())
    }

    /// Start a fresh mission: new catalogue, new conversation, opening turn.
    pub async fn new_game(&mut self) -> Result<Reply, SessionError> {
        let options = self.generator.generate().await?;
        self.state = GameState::new_mission(options);
        self.log = ConversationLog::starting_with(START_MISSION);
        self.pending = None;
        tracing::info!(
            options = self.state.mission_options.len(),
            "new mission started"
        );
        self.persist_state().await;

        let briefing = self.run_turn(Persona::Taskmaster, START_MISSION).await?;
        Ok(Reply::new(briefing, self.actions()))
    }

    /// Relay free text to the active persona.
    pub async fn send_message(&mut self, text: &str) -> Result<Reply, SessionError> {
        self.ensure_no_pending()?;
        self.log.push_user(text);

        let persona = if self.state.current_mission.active {
            Persona::Taskmaster
        } else {
            Persona::Quartermaster
        };
        let content = self.run_turn(persona, text).await?;
        Ok(Reply::new(content, self.actions()))
    }

    /// Finish a turn that failed with a retryable error.
    ///
    /// The player's input is already in the conversation and the tools that
    /// ran stay applied, so the same persona is asked again without the input
    /// being repeated or reinterpreted.
    pub async fn resume(&mut self) -> Result<Reply, SessionError> {
        let turn = self.pending.take().ok_or(SessionError::NothingToResume)?;
        tracing::info!(persona = ?turn.persona, "resuming interrupted turn");
        let content = self.run_turn(turn.persona, &turn.user).await?;
        Ok(Reply::new(content, self.actions()))
    }

    /// Pick a numbered option: a mission in `travel`, a disguise in `briefing`.
    ///
    /// Picking a disguise moves the mission to `crack_code` before the
    /// choice is relayed.
    pub async fn choose_option(&mut self, position: usize) -> Result<Reply, SessionError> {
        self.ensure_no_pending()?;
        let mission = &self.state.current_mission;
        if !mission.active {
            return Err(SessionError::NoActiveMission);
        }
        let phase = mission.phase;
        let choice = interpret_choice(phase, position)
            .ok_or(SessionError::InvalidChoice { position, phase })?;

        let message = match choice {
            Choice::Mission(n) => match self.state.option_at(n) {
                Some(option) => format!("I choose mission option {n}: {}.", option.location),
                None => choice.message(),
            },
            Choice::Disguise(_) => {
                self.apply_tool("update_game_phase", json!({ "phase": Phase::CrackCode }))
                    .await;
                choice.message()
            }
        };

        self.send_message(&message).await
    }

    /// Weather report for the confirmed destination. Does not involve a persona.
    pub async fn weather_intel(&self) -> Result<Reply, SessionError> {
        let mission = &self.state.current_mission;
        if !mission.active {
            return Err(SessionError::NoActiveMission);
        }
        if !mission.has_location() {
            return Err(SessionError::NoDestination);
        }

        let location = mission.location.clone();
        let (report, _) = self
            .executor
            .execute("weather", &json!({ "city": location }), Some(self.state.clone()))
            .await;

        Ok(Reply::new(
            format!("Weather intelligence for {location}:\n{report}"),
            self.actions(),
        ))
    }

    /// Arm the decryptor and offer the shift choices.
    pub fn use_decryptor(&self) -> Result<Reply, SessionError> {
        self.require_phase(Phase::CrackCode)?;
        Ok(Reply::new(DECRYPTOR_ARMED, decryptor_actions()))
    }

    /// Try a shift against the intercepted cipher.
    ///
    /// A wrong or unreadable shift changes nothing and offers the decryptor
    /// again. The right one decrypts the cipher, completes the mission and
    /// has the Taskmaster debrief the agent. The decrypted message is shown
    /// even when the debrief fails.
    pub async fn submit_shift(&mut self, shift: Option<u8>) -> Result<Reply, SessionError> {
        self.ensure_no_pending()?;
        self.require_phase(Phase::CrackCode)?;
        let retry = || vec![Action::use_decryptor()];

        let Some(guess) = shift else {
            return Ok(Reply::new(DECRYPTOR_SIGNAL_LOST, retry()));
        };

        let mission = &self.state.current_mission;
        if mission.shift != Some(guess) {
            tracing::info!(guess, "decryption attempt failed");
            return Ok(Reply::new(DECRYPTION_FAILED, retry()));
        }

        let cipher = mission.cipher.clone();
        let decrypted = self
            .apply_tool("decrypt_message", json!({ "ciphertext": cipher, "shift": guess }))
            .await;
        self.apply_tool("update_game_phase", json!({ "phase": Phase::Complete }))
            .await;
        self.persist_state().await;

        let report = format!("The message has been decrypted: {decrypted}. Mission complete.");
        self.log.push_user(&report);
        let headline = format!("DECRYPTION SUCCESSFUL:\n\n> {decrypted}");

        let content = match self.run_turn(Persona::Taskmaster, &report).await {
            Ok(debrief) => format!("{headline}\n\n{debrief}"),
            Err(e) => {
                tracing::warn!(error = %e, "debrief failed after decryption");
                let mut notice = format!("{headline}\n\n{DEBRIEF_INTERRUPTED} ({e}).");
                if self.pending.is_some() {
                    notice.push(' ');
                    notice.push_str(DEBRIEF_RESUMABLE);
                }
                notice
            }
        };
        Ok(Reply::new(content, self.actions()))
    }

    /// Mission summary for the player. Never shows the shift.
    pub fn status(&self) -> Reply {
        let mission = &self.state.current_mission;
        let content = if mission.active || mission.phase.is_terminal() {
            let completed: Vec<&str> = mission.completed_phases.iter().map(|p| p.as_str()).collect();
            format!(
                "Phase: {}\nDestination: {}\nCompleted phases: {}",
                mission.phase,
                mission.location,
                if completed.is_empty() {
                    "none".to_string()
                } else {
                    completed.join(", ")
                }
            )
        } else {
            "No mission in progress.".to_string()
        };
        Reply::new(content, self.actions())
    }

    fn ensure_no_pending(&self) -> Result<(), SessionError> {
        match self.pending {
            Some(_) => Err(SessionError::TurnPending),
            None => Ok(()),
        }
    }

    fn require_phase(&self, expected: Phase) -> Result<(), SessionError> {
        let mission = &self.state.current_mission;
        if !mission.active {
            return Err(SessionError::NoActiveMission);
        }
        if mission.phase != expected {
            return Err(SessionError::WrongPhase {
                expected,
                actual: mission.phase,
            });
        }
        Ok(())
    }

    /// Run a tool outside the model loop, keeping the resulting state.
    async fn apply_tool(&mut self, name: &str, parameters: serde_json::Value) -> String {
        let state = std::mem::take(&mut self.state);
        let (result, state) = self.executor.execute(name, &parameters, Some(state)).await;
        self.state = state;
        result
    }

    /// Taskmaster turn over the session's log and state.
    ///
    /// The state is written back even when the turn fails, so tools that
    /// already ran stay applied.
    async fn run_taskmaster(&mut self) -> Result<String, TurnError> {
        let mut slot = Some(std::mem::take(&mut self.state));
        let result = self.taskmaster.run(&mut self.log, &mut slot).await;
        self.state = slot.unwrap_or_default();
        if result.is_err() {
            self.persist_state().await;
        }
        result
    }

    /// Run one persona turn over the log as it stands.
    ///
    /// A retryable failure is remembered so [`Self::resume`] can finish it.
    async fn run_turn(&mut self, persona: Persona, user: &str) -> Result<String, SessionError> {
        let result = match persona {
            Persona::Taskmaster => self.run_taskmaster().await,
            Persona::Quartermaster => {
                let mut no_state = None;
                self.quartermaster.run(&mut self.log, &mut no_state).await
            }
        };

        match result {
            Ok(content) => {
                self.pending = None;
                self.finish_turn(user, &content).await;
                Ok(content)
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::warn!(?persona, error = %e, "turn interrupted");
                    self.pending = Some(PendingTurn {
                        persona,
                        user: user.to_string(),
                    });
                }
                Err(e.into())
            }
        }
    }

    async fn finish_turn(&self, user: &str, agent: &str) {
        self.persist_state().await;
        if let Some(ref log) = self.mission_log {
            if let Err(e) = log.append(user, agent).await {
                tracing::warn!(path = %log.path().display(), error = %e, "failed to append mission log");
            }
        }
    }

    async fn persist_state(&self) {
        if let Some(ref file) = self.state_file {
            if let Err(e) = file.save(&self.state).await {
                tracing::warn!(path = %file.path().display(), error = %e, "failed to save game state");
            }
        }
    }
}

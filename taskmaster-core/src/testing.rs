//! Testing utilities for the mission engine.
//!
//! This module provides tools for integration testing:
//! - `ScriptedSender` for deterministic persona replies without API calls
//! - `FixedMissionGenerator` and `StaticWeather` for the other collaborators
//! - `TestHarness` for scripted game scenarios
//! - Assertion helpers for verifying game state

use crate::affordance::Action;
use crate::agent::{
    prompts::QUARTERMASTER_PROMPT, GenerateError, MissionGenerator, SendError, Sender,
    SenderReply,
};
use crate::config::GameConfig;
use crate::conversation::{ConversationLog, ToolCallRequest};
use crate::gadgets::WeatherService;
use crate::mission::{GameState, MissionOption, Phase};
use crate::session::{Collaborators, GameSession, Reply};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Scripted sender
// ============================================================================

/// One scripted model reply.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    /// Tool calls as (name, arguments); ids are assigned when sent.
    Tools(Vec<(String, Value)>),
    /// A retryable network failure.
    Fail,
}

/// A sender that replays scripted replies in order.
///
/// When the queue runs dry the `always` reply is used, if set; otherwise a
/// fixed text. Every call records the conversation and state it was given.
#[derive(Default)]
pub struct ScriptedSender {
    queue: Mutex<VecDeque<ScriptedReply>>,
    always: Mutex<Option<ScriptedReply>>,
    preamble: Option<String>,
    next_id: AtomicUsize,
    calls: Mutex<Vec<(ConversationLog, Option<GameState>)>>,
}

impl ScriptedSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `preamble` as a system message on the first call of each turn,
    /// the way the Quartermaster does.
    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    pub fn then_text(self, text: impl Into<String>) -> Self {
        self.push_text(text);
        self
    }

    pub fn then_tools(self, calls: Vec<(&str, Value)>) -> Self {
        self.push_tools(calls);
        self
    }

    pub fn then_fail(self) -> Self {
        self.push(ScriptedReply::Fail);
        self
    }

    pub fn always_text(self, text: impl Into<String>) -> Self {
        *lock(&self.always) = Some(ScriptedReply::Text(text.into()));
        self
    }

    pub fn always_tools(self, calls: Vec<(&str, Value)>) -> Self {
        *lock(&self.always) = Some(ScriptedReply::Tools(owned(calls)));
        self
    }

    pub fn push(&self, reply: ScriptedReply) {
        lock(&self.queue).push_back(reply);
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.push(ScriptedReply::Text(text.into()));
    }

    pub fn push_tools(&self, calls: Vec<(&str, Value)>) {
        self.push(ScriptedReply::Tools(owned(calls)));
    }

    /// Number of replies still queued.
    pub fn remaining(&self) -> usize {
        lock(&self.queue).len()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Game state passed to each call, in order.
    pub fn states_seen(&self) -> Vec<Option<GameState>> {
        lock(&self.calls).iter().map(|(_, s)| s.clone()).collect()
    }

    /// Conversation passed to each call, in order.
    pub fn logs_seen(&self) -> Vec<ConversationLog> {
        lock(&self.calls).iter().map(|(l, _)| l.clone()).collect()
    }

    fn next_reply(&self) -> ScriptedReply {
        if let Some(reply) = lock(&self.queue).pop_front() {
            return reply;
        }
        lock(&self.always)
            .clone()
            .unwrap_or_else(|| ScriptedReply::Text("No more scripted replies.".to_string()))
    }
}

fn owned(calls: Vec<(&str, Value)>) -> Vec<(String, Value)> {
    calls
        .into_iter()
        .map(|(name, args)| (name.to_string(), args))
        .collect()
}

#[async_trait]
impl Sender for ScriptedSender {
    fn prepare(&self, log: &mut ConversationLog) {
        if let Some(ref preamble) = self.preamble {
            log.ensure_system_preamble(preamble);
        }
    }

    async fn send(
        &self,
        log: &ConversationLog,
        state: Option<&GameState>,
    ) -> Result<SenderReply, SendError> {
        lock(&self.calls).push((log.clone(), state.cloned()));

        match self.next_reply() {
            ScriptedReply::Text(text) => Ok(SenderReply::Text(text)),
            ScriptedReply::Tools(calls) => Ok(SenderReply::ToolCalls {
                text: String::new(),
                calls: calls
                    .into_iter()
                    .map(|(name, arguments)| ToolCallRequest {
                        id: format!("call_{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
                        name,
                        arguments,
                    })
                    .collect(),
            }),
            ScriptedReply::Fail => Err(SendError::Api(claude::Error::Network(
                "scripted failure".to_string(),
            ))),
        }
    }
}

// ============================================================================
// Other collaborators
// ============================================================================

/// The catalogue used throughout the tests: shifts 2, 5 and 1.
pub fn standard_catalogue() -> Vec<MissionOption> {
    vec![
        MissionOption::from_plaintext(
            "Lisbon",
            "Fog rolls up from the Tagus and a courier has gone silent.",
            "MEET AT THE DOCKS",
            2,
            "Two trams rattled past before the signal came.",
        ),
        MissionOption::from_plaintext(
            "Prague",
            "Snow on the Charles Bridge hides footprints fast.",
            "THE EAGLE LANDS TONIGHT",
            5,
            "Five black cars circled the square that night.",
        ),
        MissionOption::from_plaintext(
            "Oslo",
            "The harbour ice is cracking and so is a double agent's cover.",
            "NORTH GATE AT NOON",
            1,
            "A single lamp burned in the safehouse window.",
        ),
    ]
}

/// A generator that always returns the same catalogue.
pub struct FixedMissionGenerator {
    options: Vec<MissionOption>,
}

impl FixedMissionGenerator {
    pub fn new(options: Vec<MissionOption>) -> Self {
        Self { options }
    }

    pub fn standard() -> Self {
        Self::new(standard_catalogue())
    }
}

#[async_trait]
impl MissionGenerator for FixedMissionGenerator {
    async fn generate(&self) -> Result<Vec<MissionOption>, GenerateError> {
        Ok(self.options.clone())
    }
}

/// Weather that is the same everywhere. Records every city asked about.
pub struct StaticWeather {
    conditions: String,
    lookups: Mutex<Vec<String>>,
}

impl StaticWeather {
    pub fn new(conditions: impl Into<String>) -> Self {
        Self {
            conditions: conditions.into(),
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn lookups(&self) -> Vec<String> {
        lock(&self.lookups).clone()
    }
}

#[async_trait]
impl WeatherService for StaticWeather {
    async fn lookup(&self, city: &str) -> String {
        lock(&self.lookups).push(city.to_string());
        format!("Weather in {city}: {}", self.conditions)
    }
}

// ============================================================================
// Test harness
// ============================================================================

/// A session wired to scripted collaborators.
pub struct TestHarness {
    pub session: GameSession,
    pub taskmaster: Arc<ScriptedSender>,
    pub quartermaster: Arc<ScriptedSender>,
    pub weather: Arc<StaticWeather>,
}

impl TestHarness {
    /// Harness with default config and the standard catalogue.
    pub fn new() -> Self {
        Self::with_config(GameConfig::default())
    }

    pub fn with_config(config: GameConfig) -> Self {
        Self::with_catalogue(config, standard_catalogue())
    }

    pub fn with_catalogue(config: GameConfig, options: Vec<MissionOption>) -> Self {
        let taskmaster = Arc::new(ScriptedSender::new());
        let quartermaster = Arc::new(ScriptedSender::new().with_preamble(QUARTERMASTER_PROMPT));
        let weather = Arc::new(StaticWeather::new("light rain, 11.5°C"));

        let collaborators = Collaborators {
            taskmaster: taskmaster.clone(),
            quartermaster: quartermaster.clone(),
            generator: Arc::new(FixedMissionGenerator::new(options)),
            weather: weather.clone(),
        };

        Self {
            session: GameSession::with_collaborators(config, collaborators),
            taskmaster,
            quartermaster,
            weather,
        }
    }

    /// Script the Taskmaster's reply to the agent picking the mission at
    /// `position`: confirm it, move to briefing, then brief.
    pub fn expect_mission_pick(&self, position: usize, briefing: impl Into<String>) {
        let option = self
            .session
            .state()
            .option_at(position)
            .cloned()
            .unwrap_or_else(|| panic!("no mission option at position {position}"));

        self.taskmaster.push_tools(vec![
            (
                "select_mission",
                json!({
                    "location": option.location,
                    "cipher": option.cipher,
                    "shift": option.shift,
                }),
            ),
            ("update_game_phase", json!({ "phase": "briefing" })),
        ]);
        self.taskmaster.push_text(briefing);
    }

    pub fn phase(&self) -> Phase {
        self.session.state().current_mission.phase
    }

    pub fn is_active(&self) -> bool {
        self.session.state().current_mission.active
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the mission is in the given phase.
#[track_caller]
pub fn assert_phase(harness: &TestHarness, expected: Phase) {
    let actual = harness.phase();
    assert_eq!(actual, expected, "Expected phase {expected}, got {actual}");
}

/// Assert the exact list of exited phases.
#[track_caller]
pub fn assert_completed_phases(harness: &TestHarness, expected: &[Phase]) {
    let actual = &harness.session.state().current_mission.completed_phases;
    assert_eq!(
        actual.as_slice(),
        expected,
        "Expected completed phases {expected:?}, got {actual:?}"
    );
}

/// Assert the reply offers exactly these action names, in order.
#[track_caller]
pub fn assert_actions(reply: &Reply, expected: &[&str]) {
    let actual: Vec<&str> = reply.actions.iter().map(|a: &Action| a.name.as_str()).collect();
    assert_eq!(actual, expected, "Unexpected actions in reply");
}

/// Assert the reply text does not mention the shift value.
#[track_caller]
pub fn assert_shift_hidden(reply: &Reply, shift: u8) {
    assert!(
        !reply.content.contains(&shift.to_string()),
        "Reply reveals shift {shift}: {}",
        reply.content
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_sender_replays_in_order() {
        let sender = ScriptedSender::new()
            .then_text("one")
            .then_tools(vec![("weather", json!({"city": "Oslo"}))])
            .then_fail();
        let log = ConversationLog::starting_with("hi");

        assert_eq!(sender.send(&log, None).await.unwrap(), SenderReply::Text("one".into()));
        match sender.send(&log, None).await.unwrap() {
            SenderReply::ToolCalls { calls, .. } => {
                assert_eq!(calls[0].id, "call_1");
                assert_eq!(calls[0].name, "weather");
            }
            other => panic!("expected tool calls, got {other:?}"),
        }
        assert!(sender.send(&log, None).await.is_err());
        assert_eq!(
            sender.send(&log, None).await.unwrap(),
            SenderReply::Text("No more scripted replies.".into())
        );
        assert_eq!(sender.call_count(), 4);
    }

    #[tokio::test]
    async fn test_static_weather_records_lookups() {
        let weather = StaticWeather::new("sunny");
        assert_eq!(weather.lookup("Rome").await, "Weather in Rome: sunny");
        assert_eq!(weather.lookups(), vec!["Rome".to_string()]);
    }

    #[test]
    fn test_standard_catalogue_shifts() {
        let shifts: Vec<u8> = standard_catalogue().iter().map(|o| o.shift).collect();
        assert_eq!(shifts, vec![2, 5, 1]);
    }

    #[tokio::test]
    async fn test_harness_starts_idle() {
        let harness = TestHarness::new();
        assert!(!harness.is_active());
        assert_phase(&harness, Phase::Travel);
        assert_completed_phases(&harness, &[]);
    }
}

//! Player-facing actions offered for each phase.
//!
//! Every action carries a fresh id so a front end can tell a re-issued
//! button apart from a stale one.

use crate::mission::{MissionState, Phase, MAX_SHIFT, MIN_SHIFT};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

pub const NEW_GAME: &str = "new_game";
pub const GET_WEATHER: &str = "get_weather";
pub const USE_DECRYPTOR: &str = "use_decryptor";
pub const CHOOSE_OPTION: &str = "choose_option";
pub const RESUME_TURN: &str = "resume_turn";

/// Number of numbered choices offered in `travel` and `briefing`.
pub const CHOICE_COUNT: usize = 3;

/// A selectable action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: Uuid,
    pub name: String,
    pub value: String,
    pub label: String,
    #[serde(default)]
    pub payload: Value,
}

impl Action {
    fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        label: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            value: value.into(),
            label: label.into(),
            payload,
        }
    }

    pub fn new_game() -> Self {
        Self::new(NEW_GAME, NEW_GAME, "New Game", json!({}))
    }

    pub fn get_weather() -> Self {
        Self::new(GET_WEATHER, GET_WEATHER, "Get Weather Intel", json!({}))
    }

    pub fn use_decryptor() -> Self {
        Self::new(USE_DECRYPTOR, USE_DECRYPTOR, "Use Decryptor Gadget", json!({}))
    }

    /// Ask the persona again after an interrupted turn.
    pub fn resume_turn() -> Self {
        Self::new(RESUME_TURN, RESUME_TURN, "Reconnect", json!({}))
    }

    /// Numbered choice; `position` is 1-based.
    pub fn choose_option(position: usize) -> Self {
        Self::new(
            CHOOSE_OPTION,
            position.to_string(),
            position.to_string(),
            json!({ "choice": position }),
        )
    }

    /// Decryptor sub-choice for one shift value.
    pub fn shift(shift: u8) -> Self {
        Self::new(
            format!("shift_{shift}"),
            shift.to_string(),
            shift.to_string(),
            json!({}),
        )
    }
}

/// Actions valid for a phase.
pub fn phase_actions(phase: Phase) -> Vec<Action> {
    let choices = || (1..=CHOICE_COUNT).map(Action::choose_option);
    match phase {
        Phase::Travel => choices().collect(),
        Phase::Briefing => choices().chain(std::iter::once(Action::get_weather())).collect(),
        Phase::CrackCode => vec![Action::use_decryptor()],
        Phase::Complete => Vec::new(),
    }
}

/// Actions valid for the mission as it stands. Without an active
/// mission only a new game can be started.
pub fn available_actions(mission: &MissionState) -> Vec<Action> {
    if !mission.active {
        return vec![Action::new_game()];
    }
    phase_actions(mission.phase)
}

/// The shift sub-choices shown when the decryptor is armed.
pub fn decryptor_actions() -> Vec<Action> {
    (MIN_SHIFT..=MAX_SHIFT).map(Action::shift).collect()
}

/// Read a shift selection from an action's value, name suffix or label,
/// in that order. Only "1" to "5" are accepted.
pub fn parse_selected_shift(value: Option<&str>, name: Option<&str>, label: Option<&str>) -> Option<u8> {
    let name_suffix = name.and_then(|n| n.rsplit('_').next());
    let raw = [value, name_suffix, label]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())?;

    match raw.trim().parse::<u8>() {
        Ok(shift) if (MIN_SHIFT..=MAX_SHIFT).contains(&shift) => Some(shift),
        _ => None,
    }
}

/// What a numbered choice means in the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// Pick the mission option at this 1-based position.
    Mission(usize),
    /// Pick the cover identity at this 1-based position.
    Disguise(usize),
}

impl Choice {
    /// Text relayed to the Taskmaster for this choice.
    pub fn message(&self) -> String {
        match self {
            Choice::Mission(n) => format!("I choose mission option {n}."),
            Choice::Disguise(n) => format!("I choose disguise {n}."),
        }
    }
}

/// Interpret a numbered choice, or `None` if numbered choices do not
/// apply in `phase` or `position` is out of range.
pub fn interpret_choice(phase: Phase, position: usize) -> Option<Choice> {
    if !(1..=CHOICE_COUNT).contains(&position) {
        return None;
    }
    match phase {
        Phase::Travel => Some(Choice::Mission(position)),
        Phase::Briefing => Some(Choice::Disguise(position)),
        Phase::CrackCode | Phase::Complete => None,
    }
}

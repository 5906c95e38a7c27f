//! Mission state: phases, the mission catalogue and the live mission.
//!
//! The mission moves through a fixed, linear sequence of phases:
//! `travel -> briefing -> crack_code -> complete`. State changes only
//! through [`GameState::select_mission`] and [`MissionState::advance`];
//! fields are public for reading and serialization.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Placeholder for mission fields that have not been chosen yet.
pub const PENDING: &str = "pending";

/// Smallest legal Caesar shift for a mission.
pub const MIN_SHIFT: u8 = 1;

/// Largest legal Caesar shift for a mission.
pub const MAX_SHIFT: u8 = 5;

/// Clamp any integer into the legal shift range.
pub fn clamp_shift(raw: i64) -> u8 {
    raw.clamp(MIN_SHIFT as i64, MAX_SHIFT as i64) as u8
}

fn deserialize_shift<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    i64::deserialize(deserializer).map(clamp_shift)
}

fn deserialize_optional_shift<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u8>, D::Error> {
    Ok(Option::<i64>::deserialize(deserializer)?.map(clamp_shift))
}

// ============================================================================
// Phases
// ============================================================================

/// A mission stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Travel,
    Briefing,
    CrackCode,
    Complete,
}

impl Phase {
    /// Every phase in play order.
    pub const ORDER: [Phase; 4] = [
        Phase::Travel,
        Phase::Briefing,
        Phase::CrackCode,
        Phase::Complete,
    ];

    /// Wire name of the phase.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Travel => "travel",
            Phase::Briefing => "briefing",
            Phase::CrackCode => "crack_code",
            Phase::Complete => "complete",
        }
    }

    /// The phase that legally follows this one.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Travel => Some(Phase::Briefing),
            Phase::Briefing => Some(Phase::CrackCode),
            Phase::CrackCode => Some(Phase::Complete),
            Phase::Complete => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Phase::Complete
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A phase name that is not one of the four mission stages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown phase '{0}'")]
pub struct UnknownPhase(pub String);

impl FromStr for Phase {
    type Err = UnknownPhase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ORDER
            .into_iter()
            .find(|phase| phase.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownPhase(s.to_string()))
    }
}

/// Outcome of asking the mission to move to a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Moved forward by exactly one phase.
    Advanced { from: Phase, to: Phase },
    /// Already in the requested phase; nothing changed.
    Unchanged(Phase),
    /// Skip, regression, or movement after completion; nothing changed.
    Refused { from: Phase, requested: Phase },
}

// ============================================================================
// Mission catalogue
// ============================================================================

/// One generated mission the agent can pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionOption {
    pub location: String,
    #[serde(default)]
    pub description: String,
    /// Caesar-encrypted mission text. The plaintext is never stored.
    pub cipher: String,
    /// Always within [`MIN_SHIFT`]..=[`MAX_SHIFT`], including when loaded.
    #[serde(deserialize_with = "deserialize_shift")]
    pub shift: u8,
    /// Narrative hint whose single countable element equals the shift.
    #[serde(default)]
    pub shift_hint: String,
}

impl MissionOption {
    /// Build an option from plaintext, clamping the shift and discarding
    /// the plaintext once it is encrypted.
    pub fn from_plaintext(
        location: impl Into<String>,
        description: impl Into<String>,
        plaintext: &str,
        shift: i64,
        shift_hint: impl Into<String>,
    ) -> Self {
        let shift = clamp_shift(shift);
        Self {
            location: location.into(),
            description: description.into(),
            cipher: crate::gadgets::encrypt(plaintext, shift as i64),
            shift,
            shift_hint: shift_hint.into(),
        }
    }
}

// ============================================================================
// Live mission
// ============================================================================

/// State of the mission in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionState {
    pub active: bool,
    pub phase: Phase,
    pub location: String,
    pub cipher: String,
    /// `None` until a mission is selected.
    #[serde(deserialize_with = "deserialize_optional_shift")]
    pub shift: Option<u8>,
    pub shift_hint: String,
    /// Every phase that has been exited, in order, without duplicates.
    pub completed_phases: Vec<Phase>,
}

impl Default for MissionState {
    fn default() -> Self {
        Self {
            active: false,
            phase: Phase::Travel,
            location: PENDING.to_string(),
            cipher: PENDING.to_string(),
            shift: None,
            shift_hint: String::new(),
            completed_phases: Vec::new(),
        }
    }
}

impl MissionState {
    /// A freshly started mission, waiting in `travel`.
    pub fn begin() -> Self {
        Self {
            active: true,
            ..Self::default()
        }
    }

    /// Whether a destination has been confirmed.
    pub fn has_location(&self) -> bool {
        self.location != PENDING && !self.location.is_empty()
    }

    /// Move to `target` if it is the current phase or its direct successor.
    ///
    /// Exiting a phase records it in `completed_phases` (once). Reaching
    /// `complete` deactivates the mission.
    pub fn advance(&mut self, target: Phase) -> Transition {
        let from = self.phase;
        if target == from {
            return Transition::Unchanged(from);
        }
        if from.next() != Some(target) {
            return Transition::Refused {
                from,
                requested: target,
            };
        }

        if !self.completed_phases.contains(&from) {
            self.completed_phases.push(from);
        }
        self.phase = target;
        if target.is_terminal() {
            self.active = false;
        }

        Transition::Advanced { from, to: target }
    }
}

// ============================================================================
// Game state
// ============================================================================

/// Why `select_mission` did not change anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectionRefused {
    #[error("the mission is already complete")]
    MissionComplete,
}

/// Everything the Taskmaster needs to know about the current game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameState {
    pub mission_options: Vec<MissionOption>,
    pub current_mission: MissionState,
}

impl GameState {
    /// Start a new mission over the given catalogue.
    pub fn new_mission(options: Vec<MissionOption>) -> Self {
        Self {
            mission_options: options,
            current_mission: MissionState::begin(),
        }
    }

    /// The catalogue entry at a 1-based display position.
    pub fn option_at(&self, position: usize) -> Option<&MissionOption> {
        position
            .checked_sub(1)
            .and_then(|index| self.mission_options.get(index))
    }

    /// Shift hint of the first catalogue entry at `location`, or "".
    pub fn shift_hint_for(&self, location: &str) -> &str {
        let wanted = location.trim();
        self.mission_options
            .iter()
            .find(|option| option.location.trim().eq_ignore_ascii_case(wanted))
            .map(|option| option.shift_hint.as_str())
            .unwrap_or("")
    }

    /// Record the chosen mission: location, cipher, clamped shift and the
    /// catalogue's hint for that location.
    pub fn select_mission(
        &mut self,
        location: &str,
        cipher: &str,
        shift: i64,
    ) -> Result<(), SelectionRefused> {
        if self.current_mission.phase.is_terminal() {
            return Err(SelectionRefused::MissionComplete);
        }

        let shift_hint = self.shift_hint_for(location).to_string();
        let mission = &mut self.current_mission;
        mission.location = location.to_string();
        mission.cipher = cipher.to_string();
        mission.shift = Some(clamp_shift(shift));
        mission.shift_hint = shift_hint;
        Ok(())
    }
}

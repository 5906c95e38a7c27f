//! System prompt assembly for both personas.

use crate::mission::{GameState, Phase, PENDING};
use std::fmt::Write;

/// Persona preamble for free chat outside missions.
pub const QUARTERMASTER_PROMPT: &str = include_str!("prompts/quartermaster.txt");

/// Persona preamble for the mission runner.
pub const TASKMASTER_PROMPT: &str = include_str!("prompts/taskmaster.txt");

/// Instructions for the one-shot mission catalogue request.
pub const MISSION_GENERATION_PROMPT: &str = include_str!("prompts/mission_generation.txt");

/// What the Taskmaster must accomplish in `phase`, and which tools to call.
pub fn phase_instructions(phase: Phase) -> &'static str {
    match phase {
        Phase::Travel => include_str!("prompts/phase_travel.txt"),
        Phase::Briefing => include_str!("prompts/phase_briefing.txt"),
        Phase::CrackCode => include_str!("prompts/phase_crack_code.txt"),
        Phase::Complete => include_str!("prompts/phase_complete.txt"),
    }
}

/// Render the mission catalogue and live mission for the model.
///
/// During `crack_code` every shift and the shift hint are left out, so the
/// Taskmaster cannot restate the key the agent has to work out.
pub fn state_summary(state: &GameState) -> String {
    let mission = &state.current_mission;
    let hide_key = mission.phase == Phase::CrackCode;
    let mut out = String::from("Mission catalogue:\n");

    if state.mission_options.is_empty() {
        out.push_str("- (none)\n");
    }
    for (i, option) in state.mission_options.iter().enumerate() {
        let _ = write!(out, "{}. {} (Cipher: {}", i + 1, option.location, option.cipher);
        if !hide_key {
            let _ = write!(out, ", Shift: {}", option.shift);
        }
        out.push_str(")\n");
        if !option.description.is_empty() {
            let _ = writeln!(out, "   Description: {}", option.description);
        }
    }

    let completed: Vec<&str> = mission.completed_phases.iter().map(|p| p.as_str()).collect();

    out.push_str("\nCurrent mission:\n");
    let _ = writeln!(out, "  Phase: {}", mission.phase);
    let _ = writeln!(out, "  Location: {}", mission.location);
    let _ = writeln!(out, "  Cipher: {}", mission.cipher);
    if !hide_key {
        match mission.shift {
            Some(shift) => {
                let _ = writeln!(out, "  Shift: {shift}");
            }
            None => {
                let _ = writeln!(out, "  Shift: {PENDING}");
            }
        }
        let hint = if mission.shift_hint.is_empty() {
            PENDING
        } else {
            mission.shift_hint.as_str()
        };
        let _ = writeln!(out, "  Shift hint: {hint}");
    }
    let _ = write!(out, "  Completed phases: [{}]", completed.join(", "));

    out
}

/// Full Taskmaster system prompt: persona, phase instructions, state.
pub fn taskmaster_system_prompt(state: &GameState) -> String {
    format!(
        "{}\n{}\n\n{}",
        TASKMASTER_PROMPT,
        phase_instructions(state.current_mission.phase),
        state_summary(state)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::MissionOption;

    fn state() -> GameState {
        let mut state = GameState::new_mission(vec![
            MissionOption::from_plaintext("Lisbon", "Fog on the Tagus.", "MEET AT THE DOCKS", 2, "Two trams passed."),
            MissionOption::from_plaintext("Prague", "", "THE EAGLE LANDS", 5, "Five bells rang."),
        ]);
        let cipher = state.mission_options[1].cipher.clone();
        state.select_mission("Prague", &cipher, 5).unwrap();
        state
    }

    #[test]
    fn test_every_phase_has_instructions() {
        for phase in Phase::ORDER {
            assert!(phase_instructions(phase).contains(phase.as_str()));
        }
    }

    #[test]
    fn test_summary_shows_key_before_crack_code() {
        let mut state = state();
        state.current_mission.advance(Phase::Briefing);
        let summary = state_summary(&state);

        assert!(summary.contains("Shift: 5"));
        assert!(summary.contains("Shift hint: Five bells rang."));
        assert!(summary.contains("Description: Fog on the Tagus."));
        assert!(summary.contains("Completed phases: [travel]"));
    }

    #[test]
    fn test_summary_withholds_key_during_crack_code() {
        let mut state = state();
        state.current_mission.advance(Phase::Briefing);
        state.current_mission.advance(Phase::CrackCode);
        let summary = state_summary(&state);

        assert!(!summary.contains("Shift"));
        assert!(!summary.contains("Five bells"));
        assert!(summary.contains(&state.current_mission.cipher));
        assert!(summary.contains("Phase: crack_code"));
    }

    #[test]
    fn test_pending_mission_summary() {
        let summary = state_summary(&GameState::new_mission(Vec::new()));
        assert!(summary.contains("- (none)"));
        assert!(summary.contains("Location: pending"));
        assert!(summary.contains("Shift: pending"));
    }

    #[test]
    fn test_system_prompt_uses_current_phase() {
        let prompt = taskmaster_system_prompt(&state());
        assert!(prompt.starts_with(TASKMASTER_PROMPT));
        assert!(prompt.contains("CURRENT PHASE: travel"));
        assert!(!prompt.contains("CURRENT PHASE: briefing"));
    }
}

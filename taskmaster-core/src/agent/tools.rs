//! Gadget tools for the Taskmaster and Quartermaster.
//!
//! Tool definitions come from `#[derive(Tool)]` argument structs. Incoming
//! tool calls are parsed into the closed [`GadgetCall`] enum and run by the
//! [`ToolExecutor`] against the game state.

use crate::gadgets::{decrypt, WeatherService};
use crate::mission::{GameState, Phase, Transition};
use claude::Tool as ToolDefinition;
use gadget_macros::Tool;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Result text for tool names nobody implements.
pub const UNKNOWN_TOOL: &str = "Unknown tool requested.";

/// Get the current weather for a city.
#[derive(Debug, Tool, Deserialize)]
#[tool(name = "weather")]
pub struct WeatherArgs {
    /// City to report on
    pub city: String,
}

/// Decrypt a Caesar-cipher encoded message.
#[derive(Debug, Tool, Deserialize)]
#[tool(name = "decrypt_message")]
pub struct DecryptMessageArgs {
    /// The encrypted text
    pub ciphertext: String,
    /// Number of alphabet positions the text was shifted by
    pub shift: i64,
}

/// Confirm the selected mission and save its details to the game state.
#[derive(Debug, Tool, Deserialize)]
#[tool(name = "select_mission")]
pub struct SelectMissionArgs {
    /// Location of the chosen mission option
    pub location: String,
    /// Cipher of the chosen mission option
    pub cipher: String,
    /// Shift of the chosen mission option
    #[tool(min = 1, max = 5)]
    pub shift: i64,
}

/// Advance the mission to the next phase once the player has completed the current one.
#[derive(Debug, Tool, Deserialize)]
#[tool(name = "update_game_phase")]
pub struct UpdateGamePhaseArgs {
    /// The phase to move to
    #[tool(one_of = "briefing|crack_code|complete")]
    pub phase: String,
}

/// Tool sets for each persona.
pub struct GadgetTools;

impl GadgetTools {
    /// Tools for the free-form Quartermaster.
    pub fn quartermaster() -> Vec<ToolDefinition> {
        vec![WeatherArgs::as_tool(), DecryptMessageArgs::as_tool()]
    }

    /// Tools for the mission-running Taskmaster.
    pub fn taskmaster() -> Vec<ToolDefinition> {
        let mut tools = Self::quartermaster();
        tools.push(UpdateGamePhaseArgs::as_tool());
        tools.push(SelectMissionArgs::as_tool());
        tools
    }
}

/// A parsed tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum GadgetCall {
    Weather {
        city: String,
    },
    DecryptMessage {
        ciphertext: String,
        shift: i64,
    },
    SelectMission {
        location: String,
        cipher: String,
        shift: i64,
    },
    UpdateGamePhase {
        phase: Phase,
    },
    /// A known tool whose arguments did not parse.
    Invalid {
        name: String,
        reason: String,
    },
    /// A tool name no gadget answers to.
    Unrecognized {
        name: String,
    },
}

impl GadgetCall {
    /// Parse a tool call by name and JSON arguments.
    pub fn parse(name: &str, input: &Value) -> Self {
        if name == WeatherArgs::tool_name() {
            match WeatherArgs::from_input(input) {
                Ok(args) => GadgetCall::Weather { city: args.city },
                Err(e) => invalid(name, e),
            }
        } else if name == DecryptMessageArgs::tool_name() {
            match DecryptMessageArgs::from_input(input) {
                Ok(args) => GadgetCall::DecryptMessage {
                    ciphertext: args.ciphertext,
                    shift: args.shift,
                },
                Err(e) => invalid(name, e),
            }
        } else if name == SelectMissionArgs::tool_name() {
            match SelectMissionArgs::from_input(input) {
                Ok(args) => GadgetCall::SelectMission {
                    location: args.location,
                    cipher: args.cipher,
                    shift: args.shift,
                },
                Err(e) => invalid(name, e),
            }
        } else if name == UpdateGamePhaseArgs::tool_name() {
            match UpdateGamePhaseArgs::from_input(input) {
                Ok(args) => match args.phase.parse::<Phase>() {
                    Ok(phase) => GadgetCall::UpdateGamePhase { phase },
                    Err(e) => invalid(name, e),
                },
                Err(e) => invalid(name, e),
            }
        } else {
            GadgetCall::Unrecognized {
                name: name.to_string(),
            }
        }
    }
}

fn invalid(name: &str, reason: impl std::fmt::Display) -> GadgetCall {
    GadgetCall::Invalid {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Runs tool calls against gadgets and the game state.
#[derive(Clone)]
pub struct ToolExecutor {
    weather: Arc<dyn WeatherService>,
}

impl ToolExecutor {
    pub fn new(weather: Arc<dyn WeatherService>) -> Self {
        Self { weather }
    }

    /// Execute a named tool and return its result text with the updated state.
    ///
    /// A missing state is replaced by an empty one. Bad tool names and bad
    /// arguments are answered with text; nothing here fails.
    pub async fn execute(
        &self,
        tool_name: &str,
        parameters: &Value,
        state: Option<GameState>,
    ) -> (String, GameState) {
        let mut state = state.unwrap_or_default();

        tracing::info!(tool = tool_name, parameters = %parameters, "executing tool");
        let call = GadgetCall::parse(tool_name, parameters);
        let result = self.run(call, &mut state).await;
        tracing::info!(tool = tool_name, result = %result, "tool returned");

        (result, state)
    }

    async fn run(&self, call: GadgetCall, state: &mut GameState) -> String {
        match call {
            GadgetCall::Weather { city } => self.weather.lookup(&city).await,
            GadgetCall::DecryptMessage { ciphertext, shift } => decrypt(&ciphertext, shift),
            GadgetCall::SelectMission {
                location,
                cipher,
                shift,
            } => match state.select_mission(&location, &cipher, shift) {
                Ok(()) => format!("Mission confirmed for {location}."),
                Err(refused) => format!("Selection refused: {refused}."),
            },
            GadgetCall::UpdateGamePhase { phase } => {
                match state.current_mission.advance(phase) {
                    Transition::Advanced { to, .. } => format!("Phase advanced to: {to}"),
                    Transition::Unchanged(current) => format!("Phase already at: {current}"),
                    Transition::Refused { from, requested } => match from.next() {
                        Some(next) => format!(
                            "Cannot move from {from} to {requested}. The next phase is {next}."
                        ),
                        None => format!("Mission is {from}; the phase can no longer change."),
                    },
                }
            }
            GadgetCall::Invalid { name, reason } => {
                tracing::warn!(tool = %name, %reason, "malformed tool arguments");
                format!("Invalid arguments for {name}: {reason}")
            }
            GadgetCall::Unrecognized { name } => {
                tracing::warn!(tool = %name, "unknown tool requested");
                UNKNOWN_TOOL.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::MissionOption;
    use crate::testing::StaticWeather;
    use serde_json::json;

    fn executor() -> ToolExecutor {
        ToolExecutor::new(Arc::new(StaticWeather::new("clear skies, 18°C")))
    }

    fn state() -> GameState {
        GameState::new_mission(vec![
            MissionOption::from_plaintext("Lisbon", "", "MEET AT THE DOCKS", 2, "Two trams passed."),
            MissionOption::from_plaintext("Prague", "", "THE EAGLE LANDS", 5, "Five bells rang."),
        ])
    }

    #[test]
    fn test_tool_sets() {
        let names = |tools: Vec<ToolDefinition>| -> Vec<String> {
            tools.into_iter().map(|t| t.name).collect()
        };
        assert_eq!(names(GadgetTools::quartermaster()), ["weather", "decrypt_message"]);
        assert_eq!(
            names(GadgetTools::taskmaster()),
            ["weather", "decrypt_message", "update_game_phase", "select_mission"]
        );
    }

    #[test]
    fn test_all_tools_have_valid_schemas() {
        for tool in GadgetTools::taskmaster() {
            assert!(!tool.description.is_empty(), "{} needs a description", tool.name);
            assert_eq!(tool.input_schema["type"], "object");
        }
    }

    #[test]
    fn test_update_game_phase_schema_restricts_phases() {
        let schema = UpdateGamePhaseArgs::input_schema();
        assert_eq!(
            schema["properties"]["phase"]["enum"],
            json!(["briefing", "crack_code", "complete"])
        );
        assert_eq!(schema["required"], json!(["phase"]));
    }

    #[test]
    fn test_select_mission_schema_bounds_shift() {
        let schema = SelectMissionArgs::input_schema();
        assert_eq!(schema["properties"]["shift"]["type"], "integer");
        assert_eq!(schema["properties"]["shift"]["minimum"], 1);
        assert_eq!(schema["properties"]["shift"]["maximum"], 5);
    }

    #[test]
    fn test_parse_known_and_unknown_calls() {
        assert_eq!(
            GadgetCall::parse("update_game_phase", &json!({"phase": "crack_code"})),
            GadgetCall::UpdateGamePhase { phase: Phase::CrackCode }
        );
        assert_eq!(
            GadgetCall::parse("launch_missiles", &json!({})),
            GadgetCall::Unrecognized { name: "launch_missiles".into() }
        );
        assert!(matches!(
            GadgetCall::parse("decrypt_message", &json!({"ciphertext": "KHOOR", "shift": "three"})),
            GadgetCall::Invalid { .. }
        ));
        assert!(matches!(
            GadgetCall::parse("update_game_phase", &json!({"phase": "debrief"})),
            GadgetCall::Invalid { .. }
        ));
    }

    #[tokio::test]
    async fn test_decrypt_message_does_not_touch_state() {
        let before = state();
        let (result, after) = executor()
            .execute("decrypt_message", &json!({"ciphertext": "KHOOR", "shift": 3}), Some(before.clone()))
            .await;
        assert_eq!(result, "Unencrypted message: HELLO");
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_weather_delegates_to_service() {
        let (result, _) = executor()
            .execute("weather", &json!({"city": "Lisbon"}), None)
            .await;
        assert_eq!(result, "Weather in Lisbon: clear skies, 18°C");
    }

    #[tokio::test]
    async fn test_missing_state_is_synthesized() {
        let (result, state) = executor()
            .execute("update_game_phase", &json!({"phase": "briefing"}), None)
            .await;
        assert_eq!(result, "Phase advanced to: briefing");
        assert_eq!(state.current_mission.completed_phases, vec![Phase::Travel]);
        assert!(state.mission_options.is_empty());
    }

    #[tokio::test]
    async fn test_select_mission_then_advance() {
        let exec = executor();
        let start = state();
        let cipher = start.mission_options[1].cipher.clone();

        let (result, state) = exec
            .execute(
                "select_mission",
                &json!({"location": "Prague", "cipher": cipher, "shift": 5}),
                Some(start),
            )
            .await;
        assert_eq!(result, "Mission confirmed for Prague.");
        assert_eq!(state.current_mission.shift_hint, "Five bells rang.");

        let (result, state) = exec
            .execute("update_game_phase", &json!({"phase": "briefing"}), Some(state))
            .await;
        assert_eq!(result, "Phase advanced to: briefing");
        assert_eq!(state.current_mission.phase, Phase::Briefing);
    }

    #[tokio::test]
    async fn test_repeated_phase_update_keeps_completed_unique() {
        let exec = executor();
        let (_, state) = exec
            .execute("update_game_phase", &json!({"phase": "briefing"}), Some(state()))
            .await;
        let (result, state) = exec
            .execute("update_game_phase", &json!({"phase": "briefing"}), Some(state))
            .await;
        assert_eq!(result, "Phase already at: briefing");
        assert_eq!(state.current_mission.completed_phases, vec![Phase::Travel]);
    }

    #[tokio::test]
    async fn test_phase_skip_is_refused_inline() {
        let (result, state) = executor()
            .execute("update_game_phase", &json!({"phase": "complete"}), Some(state()))
            .await;
        assert_eq!(result, "Cannot move from travel to complete. The next phase is briefing.");
        assert_eq!(state.current_mission.phase, Phase::Travel);
        assert!(state.current_mission.active);
    }

    #[tokio::test]
    async fn test_unknown_tool_leaves_state_alone() {
        let before = state();
        let (result, after) = executor()
            .execute("self_destruct", &json!({}), Some(before.clone()))
            .await;
        assert_eq!(result, UNKNOWN_TOOL);
        assert_eq!(after, before);
    }
}

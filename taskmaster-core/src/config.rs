//! Game configuration.

use crate::agent::{SenderConfig, DEFAULT_MAX_TOOL_ROUNDS};
use std::path::PathBuf;

/// Settings for a [`GameSession`](crate::GameSession).
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Model override for every Claude call.
    pub model: Option<String>,

    /// Maximum tokens per persona reply.
    pub max_tokens: usize,

    /// Temperature for persona replies.
    pub temperature: Option<f32>,

    /// Tool rounds allowed per turn before the turn fails.
    pub max_tool_rounds: usize,

    /// OpenWeatherMap key; without it weather lookups report failure.
    pub weather_api_key: Option<String>,

    /// Store game state in this file instead of memory only.
    pub state_file: Option<PathBuf>,

    /// Append every exchange to this file.
    pub mission_log: Option<PathBuf>,

    /// Use the built-in mission catalogue instead of asking Claude.
    pub offline_missions: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 1024,
            temperature: Some(0.8),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            weather_api_key: None,
            state_file: None,
            mission_log: None,
            offline_missions: false,
        }
    }
}

impl GameConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read settings from the environment.
    ///
    /// | variable | field |
    /// |---|---|
    /// | `TASKMASTER_MODEL` | `model` |
    /// | `TASKMASTER_MAX_TOOL_ROUNDS` | `max_tool_rounds` |
    /// | `OPENWEATHER_API_KEY` | `weather_api_key` |
    /// | `TASKMASTER_STATE_FILE` | `state_file` |
    /// | `TASKMASTER_MISSION_LOG` | `mission_log` |
    ///
    /// `ANTHROPIC_API_KEY` is read separately when the session connects.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.model = var("TASKMASTER_MODEL");
        if let Some(raw) = var("TASKMASTER_MAX_TOOL_ROUNDS") {
            match raw.trim().parse() {
                Ok(rounds) => config.max_tool_rounds = rounds,
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid TASKMASTER_MAX_TOOL_ROUNDS"),
            }
        }
        config.weather_api_key = var("OPENWEATHER_API_KEY");
        config.state_file = var("TASKMASTER_STATE_FILE").map(PathBuf::from);
        config.mission_log = var("TASKMASTER_MISSION_LOG").map(PathBuf::from);
        config
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn with_weather_api_key(mut self, key: impl Into<String>) -> Self {
        self.weather_api_key = Some(key.into());
        self
    }

    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = Some(path.into());
        self
    }

    pub fn with_mission_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.mission_log = Some(path.into());
        self
    }

    pub fn with_offline_missions(mut self, offline: bool) -> Self {
        self.offline_missions = offline;
        self
    }

    /// Generation settings for the persona senders.
    pub fn sender_config(&self) -> SenderConfig {
        SenderConfig {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> GameConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GameConfig::from_vars(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_map(&[]);
        assert_eq!(config.max_tool_rounds, 10);
        assert!(config.model.is_none());
        assert!(config.state_file.is_none());
        assert!(!config.offline_missions);
    }

    #[test]
    fn test_reads_environment() {
        let config = from_map(&[
            ("TASKMASTER_MODEL", "claude-test"),
            ("TASKMASTER_MAX_TOOL_ROUNDS", "4"),
            ("OPENWEATHER_API_KEY", "wx"),
            ("TASKMASTER_STATE_FILE", "game_state.json"),
            ("TASKMASTER_MISSION_LOG", "mission_log.json"),
        ]);
        assert_eq!(config.model.as_deref(), Some("claude-test"));
        assert_eq!(config.max_tool_rounds, 4);
        assert_eq!(config.weather_api_key.as_deref(), Some("wx"));
        assert_eq!(config.state_file, Some(PathBuf::from("game_state.json")));
        assert_eq!(config.mission_log, Some(PathBuf::from("mission_log.json")));
    }

    #[test]
    fn test_blank_and_invalid_values_are_ignored() {
        let config = from_map(&[
            ("TASKMASTER_MODEL", "  "),
            ("TASKMASTER_MAX_TOOL_ROUNDS", "lots"),
        ]);
        assert!(config.model.is_none());
        assert_eq!(config.max_tool_rounds, DEFAULT_MAX_TOOL_ROUNDS);
    }

    #[test]
    fn test_builder_and_sender_config() {
        let config = GameConfig::new()
            .with_model("claude-x")
            .with_max_tokens(512)
            .with_temperature(0.2)
            .with_max_tool_rounds(2)
            .with_offline_missions(true);
        let sender = config.sender_config();
        assert_eq!(sender.model.as_deref(), Some("claude-x"));
        assert_eq!(sender.max_tokens, 512);
        assert_eq!(sender.temperature, Some(0.2));
        assert_eq!(config.max_tool_rounds, 2);
        assert!(config.offline_missions);
    }
}

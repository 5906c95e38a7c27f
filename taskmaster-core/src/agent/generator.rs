//! Mission catalogue generation.

use super::prompts::MISSION_GENERATION_PROMPT;
use crate::mission::{clamp_shift, MissionOption, MAX_SHIFT, MIN_SHIFT};
use async_trait::async_trait;
use claude::{Claude, Message, Request};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Mutex;
use thiserror::Error;

/// Number of options in every catalogue.
pub const MISSION_COUNT: usize = 3;

/// Errors from mission generation.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Claude API error: {0}")]
    Api(#[from] claude::Error),

    #[error("Mission catalogue is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Expected 3 mission options, got {0}")]
    TooFewOptions(usize),

    #[error("Duplicate mission location: {0}")]
    DuplicateLocation(String),
}

/// Produces the catalogue for a new game.
#[async_trait]
pub trait MissionGenerator: Send + Sync {
    async fn generate(&self) -> Result<Vec<MissionOption>, GenerateError>;
}

#[derive(Debug, Deserialize)]
struct Catalogue {
    options: Vec<RawOption>,
}

#[derive(Debug, Deserialize)]
struct RawOption {
    location: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    plaintext: String,
    #[serde(default)]
    shift: Value,
    #[serde(default)]
    shift_hint: String,
}

/// Read an integer shift from a number or numeric string. Anything else is 1.
fn coerce_shift(raw: &Value) -> i64 {
    match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(MIN_SHIFT as i64),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
                .unwrap_or(MIN_SHIFT as i64)
        }
        _ => MIN_SHIFT as i64,
    }
}

/// Remove a surrounding Markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a model-written catalogue into exactly [`MISSION_COUNT`] options.
///
/// Shifts are coerced and clamped; plaintext is encrypted and dropped.
pub fn parse_catalogue(text: &str) -> Result<Vec<MissionOption>, GenerateError> {
    let catalogue: Catalogue = serde_json::from_str(strip_code_fence(text))?;
    if catalogue.options.len() < MISSION_COUNT {
        return Err(GenerateError::TooFewOptions(catalogue.options.len()));
    }

    let mut seen = HashSet::new();
    let mut options = Vec::with_capacity(MISSION_COUNT);
    for raw in catalogue.options.into_iter().take(MISSION_COUNT) {
        let location = raw.location.trim().to_string();
        if !seen.insert(location.to_lowercase()) {
            return Err(GenerateError::DuplicateLocation(location));
        }
        let shift = coerce_shift(&raw.shift);
        if shift != clamp_shift(shift) as i64 {
            tracing::warn!(%location, shift, "generated shift out of range; clamping");
        }
        options.push(MissionOption::from_plaintext(
            location,
            raw.description,
            &raw.plaintext,
            shift,
            raw.shift_hint,
        ));
    }
    Ok(options)
}

/// Asks Claude for a fresh catalogue.
///
/// Uses the client's model.
pub struct ClaudeMissionGenerator {
    client: Claude,
}

impl ClaudeMissionGenerator {
    pub fn new(client: Claude) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MissionGenerator for ClaudeMissionGenerator {
    async fn generate(&self) -> Result<Vec<MissionOption>, GenerateError> {
        let request = Request::new(vec![Message::user("Generate 3 new mission options.")])
            .with_system(MISSION_GENERATION_PROMPT)
            .with_max_tokens(2048)
            .with_temperature(1.0);

        let response = self.client.complete(request).await?;
        let options = parse_catalogue(&response.text())?;
        tracing::info!(
            locations = ?options.iter().map(|o| o.location.as_str()).collect::<Vec<_>>(),
            "generated mission catalogue"
        );
        Ok(options)
    }
}

// ============================================================================
// Offline generation
// ============================================================================

struct Destination {
    city: &'static str,
    description: &'static str,
    plaintext: &'static str,
}

const DESTINATIONS: &[Destination] = &[
    Destination {
        city: "Lisbon",
        description: "Fog rolls up from the Tagus and a courier has gone silent. Someone on the waterfront knows why.",
        plaintext: "MEET AT THE DOCKS",
    },
    Destination {
        city: "Prague",
        description: "Snow on the Charles Bridge hides footprints fast. A defector wants out before dawn.",
        plaintext: "THE EAGLE LANDS TONIGHT",
    },
    Destination {
        city: "Istanbul",
        description: "The Grand Bazaar is loud enough to cover any conversation. A ledger changes hands at noon.",
        plaintext: "LEDGER UNDER THE CARPET",
    },
    Destination {
        city: "Vienna",
        description: "Old empires left old tunnels. A rival service is using them to move stolen plans.",
        plaintext: "FOLLOW THE THIRD TRAM",
    },
    Destination {
        city: "Marrakesh",
        description: "Heat shimmers over the medina. An informant will talk once, and only once.",
        plaintext: "ASK FOR THE BLUE DOOR",
    },
    Destination {
        city: "Helsinki",
        description: "The harbour ice is cracking and so is a double agent's cover. Get there first.",
        plaintext: "ICEBREAKER LEAVES AT SIX",
    },
];

/// Hints with exactly one countable element, indexed by shift - 1.
const SHIFT_HINTS: [&[&str]; MAX_SHIFT as usize] = [
    &[
        "A single lamp burned in the safehouse window.",
        "Our contact knocked once and walked away.",
    ],
    &[
        "Two trams rattled past before the signal came.",
        "The courier wore a pair of mismatched gloves.",
    ],
    &[
        "Three church bells rang as the handler left.",
        "The drop was marked with three chalk lines.",
    ],
    &[
        "Four pigeons waited on the embassy ledge.",
        "The ferry horn sounded four times at dusk.",
    ],
    &[
        "Five black cars circled the square that night.",
        "The lookout counted five steps to the door.",
    ],
];

/// Builds catalogues from a built-in list of cities. Needs no API key.
pub struct OfflineMissionGenerator {
    rng: Mutex<StdRng>,
}

impl OfflineMissionGenerator {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic catalogues for tests and replays.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn draw(&self) -> Vec<MissionOption> {
        let mut rng = match self.rng.lock() {
            Ok(rng) => rng,
            Err(poisoned) => poisoned.into_inner(),
        };

        DESTINATIONS
            .choose_multiple(&mut *rng, MISSION_COUNT)
            .map(|destination| {
                let shift = rng.gen_range(MIN_SHIFT..=MAX_SHIFT);
                let hints = SHIFT_HINTS[(shift - MIN_SHIFT) as usize];
                let hint = hints.choose(&mut *rng).copied().unwrap_or_default();
                MissionOption::from_plaintext(
                    destination.city,
                    destination.description,
                    destination.plaintext,
                    shift as i64,
                    hint,
                )
            })
            .collect()
    }
}

impl Default for OfflineMissionGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MissionGenerator for OfflineMissionGenerator {
    async fn generate(&self) -> Result<Vec<MissionOption>, GenerateError> {
        Ok(self.draw())
    }
}

//! Weather gadget.
//!
//! Looks up current conditions through OpenWeatherMap. Failures never
//! escape as errors: the agent just hears a generic apology.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const OPENWEATHER_URL: &str = "http://api.openweathermap.org/data/2.5/weather";

/// Text returned when the lookup itself fails (transport, decoding).
pub const WEATHER_ERROR: &str = "Error retrieving weather data.";

/// A source of formatted weather reports.
#[async_trait]
pub trait WeatherService: Send + Sync {
    /// Report the weather for a city. Never fails; failures become text.
    async fn lookup(&self, city: &str) -> String;
}

/// Text returned when the service answers but has no report for the city.
pub fn unavailable(city: &str) -> String {
    format!("Could not retrieve weather for {city}.")
}

/// OpenWeatherMap-backed weather service.
#[derive(Clone)]
pub struct OpenWeather {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenWeather {
    /// Create a service with an optional API key.
    ///
    /// Without a key every lookup reports the city as unavailable.
    pub fn new(api_key: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_key,
            base_url: OPENWEATHER_URL.to_string(),
        }
    }

    /// Override the endpoint (used against local fakes).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn fetch(&self, city: &str, api_key: &str) -> Result<Value, reqwest::Error> {
        self.http
            .get(&self.base_url)
            .query(&[("q", city), ("appid", api_key), ("units", "metric")])
            .send()
            .await?
            .json::<Value>()
            .await
    }
}

#[async_trait]
impl WeatherService for OpenWeather {
    async fn lookup(&self, city: &str) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!(city, "weather lookup without OPENWEATHER_API_KEY");
            return unavailable(city);
        };

        match self.fetch(city, api_key).await {
            Ok(body) => format_report(city, &body).unwrap_or_else(|| {
                tracing::warn!(city, cod = %body["cod"], "weather service had no report");
                unavailable(city)
            }),
            Err(e) => {
                tracing::warn!(city, error = %e, "weather lookup failed");
                WEATHER_ERROR.to_string()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    weather: Vec<Conditions>,
    main: Readings,
    /// Offset from UTC in seconds.
    timezone: i32,
    /// Observation time, unix seconds.
    dt: i64,
}

#[derive(Debug, Deserialize)]
struct Conditions {
    description: String,
}

#[derive(Debug, Deserialize)]
struct Readings {
    temp: f64,
}

/// Format a current-weather payload, or `None` if it is not a success.
///
/// OpenWeatherMap reports `cod` as the number 200 on success and as a
/// string on failure.
fn format_report(city: &str, body: &Value) -> Option<String> {
    if body["cod"].as_i64() != Some(200) {
        return None;
    }

    let current: CurrentWeather = serde_json::from_value(body.clone()).ok()?;
    let description = &current.weather.first()?.description;
    let offset = FixedOffset::east_opt(current.timezone)?;
    let local_time = DateTime::from_timestamp(current.dt, 0)?.with_timezone(&offset);

    Some(format!(
        "Weather in {city}: {description}, {}°C — {} (local time)",
        current.main.temp,
        local_time.format("%A, %B %d, %Y %I:%M %p")
    ))
}

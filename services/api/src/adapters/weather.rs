//! services/api/src/adapters/weather.rs
//!
//! This module contains the adapter for the OpenWeather current-conditions API.
//! It implements the `WeatherService` port from the `core` crate.

use async_trait::async_trait;
use mood_journal_core::domain::{Coordinates, WeatherReport};
use mood_journal_core::ports::{PortError, PortResult, WeatherService};
use mood_journal_core::weather::classify;
use serde::Deserialize;
use tracing::info;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `WeatherService` port using OpenWeather.
#[derive(Clone)]
pub struct OpenWeatherAdapter {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
}

impl OpenWeatherAdapter {
    /// Creates a new `OpenWeatherAdapter`. Without an API key every lookup fails
    /// and callers fall back to the default descriptor.
    pub fn new(client: reqwest::Client, api_base: String, api_key: Option<String>) -> Self {
        Self {
            client,
            api_base,
            api_key,
        }
    }
}

//=========================================================================================
// API Response Structs
//=========================================================================================

#[derive(Deserialize)]
struct CurrentWeather {
    weather: Vec<Condition>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    main: Option<MainReadings>,
}

#[derive(Deserialize)]
struct Condition {
    main: String,
    description: String,
}

#[derive(Deserialize)]
struct MainReadings {
    temp: Option<f64>,
}

impl CurrentWeather {
    fn to_domain(self) -> PortResult<WeatherReport> {
        let condition = self
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| PortError::Unexpected("Weather response has no conditions".to_string()))?;
        Ok(WeatherReport {
            kind: classify(&condition.main),
            description: condition.description,
        })
    }
}

//=========================================================================================
// `WeatherService` Trait Implementation
//=========================================================================================

#[async_trait]
impl WeatherService for OpenWeatherAdapter {
    async fn current_conditions(&self, location: Coordinates) -> PortResult<WeatherReport> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PortError::Unexpected("OPENWEATHER_API_KEY is not set".to_string()))?;

        let response = self
            .client
            .get(format!("{}/data/2.5/weather", self.api_base))
            .query(&[
                ("lat", location.latitude.to_string()),
                ("lon", location.longitude.to_string()),
                ("appid", api_key.to_string()),
                ("lang", "ja".to_string()),
            ])
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PortError::Unexpected(format!(
                "Weather API returned {}",
                response.status()
            )));
        }

        let body: CurrentWeather = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        info!(
            location = body.name.as_deref().unwrap_or("unknown"),
            temp = ?body.main.as_ref().and_then(|m| m.temp),
            "Weather lookup succeeded"
        );

        body.to_domain()
    }
}

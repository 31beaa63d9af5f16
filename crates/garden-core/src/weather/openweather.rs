//! OpenWeatherMap One Call client (daily forecast only).

use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{Coordinates, ForecastDay, WeatherError, WeatherSource};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/onecall";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherClient {
    /// Client for the One Call API using `api_key`.
    pub fn new(api_key: impl Into<String>) -> Result<Self, WeatherError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        })
    }

    /// Point the client at another endpoint (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    fn name(&self) -> &str {
        "openweather"
    }

    async fn daily_forecast(&self, at: Coordinates) -> Result<Vec<ForecastDay>, WeatherError> {
        debug!(lat = at.latitude, lon = at.longitude, "requesting daily forecast");
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("lat", at.latitude.to_string()),
                ("lon", at.longitude.to_string()),
                ("exclude", "current,minutely,hourly,alerts".to_string()),
                ("units", "metric".to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WeatherError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        parse_onecall(&body)
    }
}

#[derive(Deserialize)]
struct OneCallResponse {
    daily: Vec<DailyEntry>,
}

#[derive(Deserialize)]
struct DailyEntry {
    dt: i64,
    temp: DailyTemp,
    weather: Vec<WeatherCondition>,
}

#[derive(Deserialize)]
struct DailyTemp {
    day: f64,
}

#[derive(Deserialize)]
struct WeatherCondition {
    description: String,
}

/// Convert a One Call JSON body into forecast days.
///
/// Dates are taken in UTC. A day with no weather condition gets an empty
/// description.
pub fn parse_onecall(body: &str) -> Result<Vec<ForecastDay>, WeatherError> {
    let parsed: OneCallResponse =
        serde_json::from_str(body).map_err(|e| WeatherError::Format(e.to_string()))?;

    parsed
        .daily
        .into_iter()
        .map(|entry| {
            let date = DateTime::from_timestamp(entry.dt, 0)
                .ok_or_else(|| WeatherError::Format(format!("timestamp out of range: {}", entry.dt)))?
                .date_naive();
            let description = entry
                .weather
                .into_iter()
                .next()
                .map(|w| w.description)
                .unwrap_or_default();
            Ok(ForecastDay {
                date: date.format("%Y-%m-%d").to_string(),
                temperature: entry.temp.day,
                description,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_daily_entries() {
        // 1740830400 = 2025-03-01T12:00:00Z
        let body = r#"{
            "lat": 9.9, "lon": 76.3,
            "daily": [
                { "dt": 1740830400, "temp": { "day": 31.2, "min": 25.0 },
                  "weather": [ { "id": 500, "main": "Rain", "description": "light rain" } ] },
                { "dt": 1740916800, "temp": { "day": 30.0 },
                  "weather": [] }
            ]
        }"#;
        let days = parse_onecall(body).unwrap();
        assert_eq!(
            days,
            vec![
                ForecastDay {
                    date: "2025-03-01".to_string(),
                    temperature: 31.2,
                    description: "light rain".to_string(),
                },
                ForecastDay {
                    date: "2025-03-02".to_string(),
                    temperature: 30.0,
                    description: String::new(),
                },
            ]
        );
    }

    #[test]
    fn missing_daily_is_a_format_error() {
        let err = parse_onecall(r#"{ "cod": 401, "message": "Invalid API key" }"#).unwrap_err();
        assert!(matches!(err, WeatherError::Format(_)));
    }
}

//! Daily forecast collaborator.
//!
//! The planner only needs a date and a short description per day. Where the
//! data comes from is behind [`WeatherSource`]; [`OpenWeatherClient`] is the
//! production implementation.

pub mod openweather;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use openweather::OpenWeatherClient;

/// One day of forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    /// `YYYY-MM-DD`.
    pub date: String,
    /// Daytime temperature in °C.
    pub temperature: f64,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Both values must be present and nonzero; a request with either
    /// missing (or left at 0) gets no forecast.
    pub fn from_optional(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) if latitude != 0.0 && longitude != 0.0 => {
                Some(Self {
                    latitude,
                    longitude,
                })
            }
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("weather request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("weather service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected weather response: {0}")]
    Format(String),
}

/// Source of daily forecasts for a location.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    fn name(&self) -> &str;

    async fn daily_forecast(&self, at: Coordinates) -> Result<Vec<ForecastDay>, WeatherError>;
}

/// A forecast source that may not be configured.
#[derive(Clone, Default)]
pub enum WeatherProvider {
    #[default]
    Unavailable,
    Available(Arc<dyn WeatherSource>),
}

impl WeatherProvider {
    /// Provider backed by `source`.
    pub fn available(source: impl WeatherSource + 'static) -> Self {
        Self::Available(Arc::new(source))
    }

    /// OpenWeather provider when an API key is configured.
    pub fn from_api_key(api_key: Option<&str>) -> Self {
        match api_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => match OpenWeatherClient::new(key) {
                Ok(client) => Self::available(client),
                Err(e) => {
                    warn!(error = %e, "failed to build weather client, forecasts disabled");
                    Self::Unavailable
                }
            },
            None => Self::Unavailable,
        }
    }

    /// Whether a forecast source is configured.
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// Forecast for `at`, or `None` when there is no provider, no location,
    /// or the fetch fails. Failures are logged, never propagated.
    pub async fn forecast_for(&self, at: Option<Coordinates>) -> Option<Vec<ForecastDay>> {
        let Self::Available(source) = self else {
            debug!("no weather provider configured");
            return None;
        };
        let at = at?;
        match source.daily_forecast(at).await {
            Ok(days) => {
                debug!(source = source.name(), days = days.len(), "fetched forecast");
                Some(days)
            }
            Err(e) => {
                warn!(source = source.name(), error = %e, "weather fetch failed");
                None
            }
        }
    }
}

impl fmt::Debug for WeatherProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => f.write_str("WeatherProvider::Unavailable"),
            Self::Available(source) => write!(f, "WeatherProvider::Available({})", source.name()),
        }
    }
}

// ---------------------------------------------------------------------------
// Summary for the allocation model
// ---------------------------------------------------------------------------

pub const DEFAULT_TEMPERATURE: f64 = 20.0;
pub const DEFAULT_RAIN_PROBABILITY: f64 = 0.2;

/// Two-number weather digest fed to the allocation model and the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherSummary {
    /// °C.
    pub temperature: f64,
    /// 0.0 to 1.0.
    pub rain_probability: f64,
}

impl Default for WeatherSummary {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            rain_probability: DEFAULT_RAIN_PROBABILITY,
        }
    }
}

impl WeatherSummary {
    /// Temperature of the first day; rain probability is the share of days
    /// whose description mentions rain. Empty forecast gives the defaults.
    pub fn from_forecast(days: &[ForecastDay]) -> Self {
        let Some(first) = days.first() else {
            return Self::default();
        };
        let rainy = days
            .iter()
            .filter(|d| d.description.to_lowercase().contains("rain"))
            .count();
        Self {
            temperature: first.temperature,
            rain_probability: rainy as f64 / days.len() as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource(Result<Vec<ForecastDay>, ()>);

    #[async_trait]
    impl WeatherSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn daily_forecast(&self, _at: Coordinates) -> Result<Vec<ForecastDay>, WeatherError> {
            self.0
                .clone()
                .map_err(|()| WeatherError::Format("boom".to_string()))
        }
    }

    fn day(date: &str, temperature: f64, description: &str) -> ForecastDay {
        ForecastDay {
            date: date.to_string(),
            temperature,
            description: description.to_string(),
        }
    }

    const HERE: Coordinates = Coordinates {
        latitude: 9.9,
        longitude: 76.3,
    };

    #[test]
    fn coordinates_need_both_nonzero_values() {
        assert_eq!(Coordinates::from_optional(Some(9.9), Some(76.3)), Some(HERE));
        assert_eq!(Coordinates::from_optional(None, Some(76.3)), None);
        assert_eq!(Coordinates::from_optional(Some(9.9), None), None);
        assert_eq!(Coordinates::from_optional(Some(0.0), Some(76.3)), None);
    }

    #[test]
    fn blank_api_key_means_unavailable() {
        assert!(!WeatherProvider::from_api_key(None).is_available());
        assert!(!WeatherProvider::from_api_key(Some("  ")).is_available());
        assert!(WeatherProvider::from_api_key(Some("abc123")).is_available());
    }

    #[tokio::test]
    async fn unavailable_provider_returns_none() {
        assert_eq!(WeatherProvider::Unavailable.forecast_for(Some(HERE)).await, None);
    }

    #[tokio::test]
    async fn missing_coordinates_return_none() {
        let provider = WeatherProvider::available(FixedSource(Ok(vec![day("2025-03-01", 20.0, "sun")])));
        assert_eq!(provider.forecast_for(None).await, None);
    }

    #[tokio::test]
    async fn fetch_failure_degrades_to_none() {
        let provider = WeatherProvider::available(FixedSource(Err(())));
        assert_eq!(provider.forecast_for(Some(HERE)).await, None);
    }

    #[tokio::test]
    async fn successful_fetch_is_passed_through() {
        let days = vec![day("2025-03-01", 20.0, "sun")];
        let provider = WeatherProvider::available(FixedSource(Ok(days.clone())));
        assert_eq!(provider.forecast_for(Some(HERE)).await, Some(days));
        assert_eq!(format!("{provider:?}"), "WeatherProvider::Available(fixed)");
    }

    #[test]
    fn summary_uses_first_day_and_rain_share() {
        let summary = WeatherSummary::from_forecast(&[
            day("2025-03-01", 24.5, "light rain"),
            day("2025-03-02", 22.0, "clear sky"),
            day("2025-03-03", 21.0, "moderate rain"),
            day("2025-03-04", 23.0, "few clouds"),
        ]);
        assert_eq!(summary.temperature, 24.5);
        assert_eq!(summary.rain_probability, 0.5);
    }

    #[test]
    fn summary_defaults_without_forecast() {
        let summary = WeatherSummary::from_forecast(&[]);
        assert_eq!(summary.temperature, 20.0);
        assert_eq!(summary.rain_probability, 0.2);
    }
}

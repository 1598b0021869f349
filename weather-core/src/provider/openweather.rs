use async_trait::async_trait;
use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Number;

use crate::{config::ProviderConfig, model::WeatherReport};

use super::{ProviderError, WeatherProvider};

/// OpenWeatherMap "current weather by city name" client.
///
/// Built without a credential it never touches the network.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: Option<String>,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build OpenWeather HTTP client")?;

        let api_key = config.api_key().map(str::to_string);

        Ok(Self { api_key, base_url: config.base_url.clone(), http })
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch_current(&self, api_key: &str, city: &str) -> Result<WeatherReport, ProviderError> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&[("q", city), ("appid", api_key), ("units", "metric")])
            .send()
            .await
            .map_err(|e| ProviderError::transport(e.without_url()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| ProviderError::transport(e.without_url()))?;

        match status {
            s if s.is_success() => parse_current(&body, city),
            StatusCode::UNAUTHORIZED => Err(ProviderError::auth_failed()),
            StatusCode::NOT_FOUND => Err(ProviderError::NotFound(city.to_string())),
            other => Err(ProviderError::Upstream { status: other.as_u16(), body }),
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current_weather(&self, city: &str) -> Result<WeatherReport, ProviderError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ProviderError::missing_credential());
        };

        tracing::debug!(city, "requesting current weather from OpenWeather");

        let result = self.fetch_current(api_key, city).await;
        if let Err(err) = &result {
            tracing::warn!(city, error = %err, "OpenWeather lookup failed");
        }
        result
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: Number,
    humidity: Number,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: Option<String>,
    main: OwMain,
    #[serde(default)]
    weather: Option<Vec<OwWeather>>,
}

/// Reshape a 2xx payload. Numbers keep the form the provider wrote them in.
fn parse_current(body: &str, city: &str) -> Result<WeatherReport, ProviderError> {
    let parsed: OwCurrentResponse = serde_json::from_str(body).map_err(|e| {
        tracing::debug!(error = %e, "unexpected OpenWeather payload");
        ProviderError::malformed_payload()
    })?;

    let condition = parsed
        .weather
        .and_then(|list| list.into_iter().next())
        .map(|w| w.description)
        .unwrap_or_else(|| "N/A".to_string());

    Ok(WeatherReport {
        location: parsed.name.unwrap_or_else(|| city.to_string()),
        temperature: format!("{}°C", parsed.main.temp),
        humidity: format!("{}%", parsed.main.humidity),
        condition: Some(condition),
    })
}

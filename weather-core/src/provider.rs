use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;

use crate::model::WeatherReport;

pub mod openweather;

/// Normalized failure of an upstream lookup.
///
/// The `Display` text is the message shown to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Weather data not found for location: {0}")]
    NotFound(String),

    /// Missing or rejected credential, or the provider could not be reached.
    #[error("{0}")]
    ServiceUnavailable(String),

    /// Any other non-2xx answer; `status` is passed through to the client.
    #[error("Error fetching weather data: {body}")]
    Upstream { status: u16, body: String },

    #[error("{0}")]
    Internal(String),
}

impl ProviderError {
    pub fn missing_credential() -> Self {
        Self::ServiceUnavailable("Weather service unavailable: API key not configured.".into())
    }

    pub fn auth_failed() -> Self {
        Self::ServiceUnavailable("Weather service authentication failed. Check API key.".into())
    }

    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::ServiceUnavailable(format!("Weather service request failed: {err}"))
    }

    pub fn malformed_payload() -> Self {
        Self::Internal("Error parsing weather data from provider.".into())
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Current conditions for `city`. Exactly one upstream attempt per call.
    async fn current_weather(&self, city: &str) -> Result<WeatherReport, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_messages() {
        assert_eq!(
            ProviderError::NotFound("Atlantis".into()).to_string(),
            "Weather data not found for location: Atlantis"
        );
        assert_eq!(
            ProviderError::Upstream { status: 429, body: "slow down".into() }.to_string(),
            "Error fetching weather data: slow down"
        );
        assert!(ProviderError::auth_failed().to_string().contains("authentication failed"));
        assert!(ProviderError::missing_credential().to_string().contains("API key not configured"));
        assert_eq!(
            ProviderError::transport("connection refused").to_string(),
            "Weather service request failed: connection refused"
        );
    }
}

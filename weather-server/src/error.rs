use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use weather_core::ProviderError;

use crate::rate_limit::Quota;

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Rate limit exceeded: {quota}")]
    RateLimited { quota: Quota, retry_after: Duration },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Provider(ProviderError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Provider(ProviderError::ServiceUnavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Provider(ProviderError::Upstream { status, .. }) => {
                StatusCode::from_u16(*status)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::Provider(ProviderError::Internal(_)) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        }

        let retry_after = match &self {
            ApiError::RateLimited { retry_after, .. } => Some(retry_after.as_secs().max(1)),
            _ => None,
        };

        let mut response = (status, Json(ErrorBody { detail: self.to_string() })).into_response();
        if let Some(secs) = retry_after {
            response.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn provider_failures_map_to_statuses() {
        let cases = [
            (ProviderError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ProviderError::missing_credential(), StatusCode::SERVICE_UNAVAILABLE),
            (ProviderError::auth_failed(), StatusCode::SERVICE_UNAVAILABLE),
            (ProviderError::transport("timed out"), StatusCode::SERVICE_UNAVAILABLE),
            (ProviderError::malformed_payload(), StatusCode::INTERNAL_SERVER_ERROR),
            (
                ProviderError::Upstream { status: 429, body: String::new() },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                ProviderError::Upstream { status: 502, body: String::new() },
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn non_error_upstream_status_becomes_bad_gateway() {
        let err = ApiError::from(ProviderError::Upstream { status: 304, body: String::new() });
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn rate_limited_response_has_detail_and_retry_after() {
        let err = ApiError::RateLimited {
            quota: Quota::per_minute(5),
            retry_after: Duration::from_millis(12_400),
        };
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "12");
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"detail": "Rate limit exceeded: 5 per 1 minute"})
        );
    }

    #[tokio::test]
    async fn upstream_body_is_surfaced_in_detail() {
        let err = ApiError::from(ProviderError::Upstream { status: 500, body: "boom".into() });
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"detail": "Error fetching weather data: boom"})
        );
    }
}

//! Health check endpoints for the sequence generation API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use seqgen_engine::EngineConfig;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Health status
    pub status: String,
}

/// Detailed health check response for the API.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiHealthResponse {
    /// Overall health status
    pub status: String,

    /// Server name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,

    /// Server uptime in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<u64>,

    /// Server version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Limits applied to every generation request
    pub limits: EngineConfig,
}

/// Basic health check endpoint.
///
/// `GET /health`
///
/// Suitable for load balancer checks as it returns immediately.
pub async fn health_check() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "ok".to_string(),
    })
}

/// Detailed API health check endpoint.
///
/// `GET /api/health`
///
/// Reports uptime, version and the engine limits in effect.
pub async fn api_health(State(state): State<AppState>) -> Json<ApiHealthResponse> {
    Json(ApiHealthResponse {
        status: "ok".to_string(),
        server_name: Some(state.config.server_name.clone()),
        uptime_seconds: Some(state.uptime_seconds()),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
        limits: *state.engine.config(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[tokio::test]
    async fn test_health_check() {
        let response = health_check().await;
        assert_eq!(response.status, "ok");
    }

    #[tokio::test]
    async fn test_api_health_reports_limits() {
        let config = AppConfig {
            sequence_atom_limit: 42,
            ..AppConfig::default()
        };
        let response = api_health(State(AppState::new(config))).await;
        assert_eq!(response.status, "ok");
        assert_eq!(response.limits.sequence_atom_limit, 42);
        assert_eq!(response.version.as_deref(), Some(env!("CARGO_PKG_VERSION")));
    }
}

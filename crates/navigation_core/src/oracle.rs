use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared::protocol::{OptimizeRouteRequest, OptimizeRouteResponse};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::Settings;

/// Opaque route computation. One call produces one route.
#[async_trait]
pub trait RouteOracle: Send + Sync {
    async fn optimize_route(&self, request: OptimizeRouteRequest) -> Result<OptimizeRouteResponse>;
}

pub struct MissingRouteOracle;

#[async_trait]
impl RouteOracle for MissingRouteOracle {
    async fn optimize_route(
        &self,
        _request: OptimizeRouteRequest,
    ) -> Result<OptimizeRouteResponse> {
        Err(anyhow!("route oracle is unavailable"))
    }
}

#[derive(Debug, Error)]
pub enum OracleHttpError {
    #[error("route oracle responded with status {0}")]
    Status(StatusCode),
}

pub struct HttpRouteOracle {
    http: Client,
    endpoint: Url,
}

impl HttpRouteOracle {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build route oracle http client")?;
        Ok(Self { http, endpoint })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.oracle_endpoint()?, settings.oracle_timeout())
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl RouteOracle for HttpRouteOracle {
    async fn optimize_route(&self, request: OptimizeRouteRequest) -> Result<OptimizeRouteResponse> {
        debug!(endpoint = %self.endpoint, preferences = %request.user_preferences, "oracle: sending route request");
        let res = self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .with_context(|| format!("failed to reach route oracle at {}", self.endpoint))?;

        let status = res.status();
        if !status.is_success() {
            return Err(OracleHttpError::Status(status).into());
        }

        res.json::<OptimizeRouteResponse>()
            .await
            .context("route oracle returned a malformed response")
    }
}

#[cfg(test)]
#[path = "tests/oracle_tests.rs"]
mod tests;

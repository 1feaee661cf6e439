//! Shared outbound HTTP plumbing: one [`ExternalService`] per third-party API,
//! each with its own circuit breaker and a hard bound on call duration.

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::circuit_breaker::CircuitBreaker;
use crate::config::RecoveryConfig;
use crate::errors::RelayError;

/// Longest error body we keep in a `RelayError::Status` detail
const MAX_ERROR_DETAIL: usize = 300;

#[derive(Debug)]
pub struct ExternalService {
    name: &'static str,
    http: reqwest::Client,
    breaker: CircuitBreaker,
    timeout: Duration,
}

impl ExternalService {
    pub fn new(name: &'static str, http: reqwest::Client, recovery: &RecoveryConfig) -> Self {
        Self {
            name,
            http,
            breaker: CircuitBreaker::new(name, recovery),
            timeout: recovery.operation_timeout(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Send a request, returning the raw response whatever its status
    ///
    /// The call is abandoned once the operation timeout elapses. Transport
    /// failures, timeouts and 5xx answers count against the breaker.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response, RelayError> {
        if self.breaker.is_open() {
            tracing::warn!(service = self.name, "Circuit open, failing fast");
            return Err(RelayError::CircuitOpen { service: self.name });
        }

        let outcome = match tokio::time::timeout(self.timeout, request.send()).await {
            Err(_) => Err(RelayError::Timeout {
                service: self.name,
                secs: self.timeout.as_secs(),
            }),
            Ok(Err(e)) => Err(RelayError::from_reqwest(self.name, e, self.timeout.as_secs())),
            Ok(Ok(response)) => Ok(response),
        };

        match &outcome {
            Ok(response) if response.status().is_server_error() => self.breaker.record_failure(),
            Ok(_) => self.breaker.record_success(),
            Err(e) => {
                tracing::error!(service = self.name, error = %e, "Outbound call failed");
                if e.is_service_fault() {
                    self.breaker.record_failure();
                }
            }
        }
        outcome
    }

    /// Send a request and decode a JSON body from a 2xx answer
    pub async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RelayError> {
        let response = self.execute(request).await?;
        let response = self.ensure_success(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| RelayError::decode(self.name, e.to_string()))
    }

    /// Turn a non-2xx response into `RelayError::Status`, keeping a bounded
    /// slice of the body for the logs
    pub async fn ensure_success(&self, response: Response) -> Result<Response, RelayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail: String = body.chars().take(MAX_ERROR_DETAIL).collect();
        tracing::error!(
            service = self.name,
            status = status.as_u16(),
            detail = %detail,
            "External service returned an error status"
        );
        Err(RelayError::Status {
            service: self.name,
            status: status.as_u16(),
            detail,
        })
    }
}

/// Build the reqwest client shared by every service
pub fn build_http_client(recovery: &RecoveryConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(recovery.operation_timeout())
        .user_agent(concat!("jimbot/", env!("CARGO_PKG_VERSION")))
        .build()
}

//! Async execution of an [`HttpRequest`].
//!
//! # Design
//! `Transport` is the only place where network I/O happens. The client keeps
//! an `Arc<dyn Transport>`, so embedders can swap in their own HTTP stack and
//! tests can count or script calls without a socket. Failures are reduced to
//! the three classes the dispatcher distinguishes: timeout, connection
//! failure, anything else.

use async_trait::async_trait;

use crate::error::{ApiError, ConfigError};
use crate::http::{HttpRequest, HttpResponse};

/// Failure to obtain any HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    /// The remote end could not be reached (refused, unresolvable, reset
    /// during connect).
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("{0}")]
    Other(String),
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => ApiError::Timeout,
            TransportError::Connect(_) => ApiError::Unavailable,
            TransportError::Other(message) => ApiError::Transport(message),
        }
    }
}

/// Executes one HTTP round-trip.
///
/// Non-2xx statuses are responses, not errors: implementations must return
/// them as `Ok(HttpResponse)` so the dispatcher can look for an envelope.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Default transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { http })
    }

    /// Reuse an existing client (proxy, TLS roots, connection pool).
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.http.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let response = builder.send().await.map_err(classify)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(classify)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    // The URL carries the API key.
    let err = err.without_url();
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_map_onto_api_errors() {
        assert!(matches!(ApiError::from(TransportError::Timeout), ApiError::Timeout));
        assert!(matches!(
            ApiError::from(TransportError::Connect("refused".to_string())),
            ApiError::Unavailable
        ));
        let err = ApiError::from(TransportError::Other("connection reset".to_string()));
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.to_string(), "connection reset");
    }
}

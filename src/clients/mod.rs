//! Read-only clients for the backends the audit cross-references.
//!
//! Each backend sits behind an async trait so the pipelines can run against
//! in-memory fakes.

pub mod alertmanager;
pub mod grafana;
pub mod prometheus;

pub use alertmanager::{AlertmanagerClient, extract_promql_expression};
pub use grafana::{DashboardSummary, GrafanaClient, SearchHits, extract_queries};
pub use prometheus::PrometheusClient;

use crate::datamodel::{SeriesObservation, TopMetric};
use crate::error::BackendError;
use async_trait::async_trait;
use reqwest::RequestBuilder;
use reqwest::header::{AUTHORIZATION, COOKIE};
use serde::de::DeserializeOwned;
use std::time::Duration;

#[async_trait]
pub trait MonitoringBackend: Send + Sync {
    async fn health_check(&self) -> Result<(), BackendError>;
    /// Metrics with the most series, highest first.
    async fn top_metrics(&self, limit: usize) -> Result<Vec<TopMetric>, BackendError>;
    async fn series(&self, metric: &str) -> Result<Vec<SeriesObservation>, BackendError>;
}

#[async_trait]
pub trait DashboardBackend: Send + Sync {
    /// Raw search results, persisted as is.
    async fn search_dashboards(&self) -> Result<Vec<serde_json::Value>, BackendError>;
    async fn dashboard(&self, uid: &str) -> Result<serde_json::Value, BackendError>;
}

#[async_trait]
pub trait AlertBackend: Send + Sync {
    async fn alerts(&self) -> Result<Vec<serde_json::Value>, BackendError>;
}

/// Static credentials attached to every request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    #[default]
    None,
    SessionCookie {
        cookie_name: &'static str,
        value: String,
    },
    BearerToken(String),
}

impl Credentials {
    /// A session cookie wins over an API token. Empty values are ignored.
    pub fn from_settings(
        cookie_name: &'static str,
        session_cookie: Option<&str>,
        api_token: Option<&str>,
    ) -> Self {
        let session_cookie = session_cookie.filter(|value| !value.is_empty());
        let api_token = api_token.filter(|value| !value.is_empty());
        match (session_cookie, api_token) {
            (Some(value), _) => Credentials::SessionCookie {
                cookie_name,
                value: value.to_string(),
            },
            (None, Some(token)) => Credentials::BearerToken(token.to_string()),
            (None, None) => Credentials::None,
        }
    }

    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Credentials::None => request,
            Credentials::SessionCookie { cookie_name, value } => {
                request.header(COOKIE, format!("{}={}", cookie_name, value))
            }
            Credentials::BearerToken(token) => {
                request.header(AUTHORIZATION, format!("Bearer {}", token))
            }
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Credentials::None)
    }
}

pub(crate) fn build_http_client(
    backend: &'static str,
    timeout: Duration,
) -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("cardaudit/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|source| BackendError::request(backend, "<client>", source))
}

pub(crate) fn normalize_base_url(backend: &'static str, url: &str) -> Result<String, BackendError> {
    let trimmed = url.trim().trim_end_matches('/');
    let parsed = url::Url::parse(trimmed).map_err(|err| BackendError::InvalidUrl {
        backend,
        url: url.to_string(),
        message: err.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(BackendError::InvalidUrl {
            backend,
            url: url.to_string(),
            message: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(trimmed.to_string())
}

/// Send the request and decode a JSON body, mapping every failure to a `BackendError`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    backend: &'static str,
    url: &str,
    request: RequestBuilder,
) -> Result<T, BackendError> {
    let response = request
        .send()
        .await
        .map_err(|source| BackendError::request(backend, url, source))?;

    let status = response.status();
    if !status.is_success() {
        return Err(BackendError::Status {
            backend,
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let payload = response
        .bytes()
        .await
        .map_err(|source| BackendError::request(backend, url, source))?;
    serde_json::from_slice(&payload).map_err(|err| BackendError::decode(backend, url, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_from_settings() {
        assert_eq!(
            Credentials::from_settings("grafana_session", None, None),
            Credentials::None
        );
        assert_eq!(
            Credentials::from_settings("grafana_session", Some(""), Some("t")),
            Credentials::BearerToken("t".to_string())
        );
        assert_eq!(
            Credentials::from_settings("grafana_session", Some("c"), Some("t")),
            Credentials::SessionCookie {
                cookie_name: "grafana_session",
                value: "c".to_string()
            }
        );
        assert!(Credentials::default().is_anonymous());
    }

    #[test]
    fn test_credentials_headers() {
        let client = reqwest::Client::new();

        let request = Credentials::SessionCookie {
            cookie_name: "grafana_session",
            value: "abc".to_string(),
        }
        .apply(client.get("http://localhost/"))
        .build()
        .unwrap();
        assert_eq!(request.headers()[COOKIE], "grafana_session=abc");

        let request = Credentials::BearerToken("tok".to_string())
            .apply(client.get("http://localhost/"))
            .build()
            .unwrap();
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer tok");

        let request = Credentials::None
            .apply(client.get("http://localhost/"))
            .build()
            .unwrap();
        assert!(request.headers().is_empty());
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("Grafana", "http://localhost:3000/").unwrap(),
            "http://localhost:3000"
        );
        assert!(normalize_base_url("Grafana", "localhost:3000").is_err());
        assert!(normalize_base_url("Grafana", "not a url").is_err());
    }
}

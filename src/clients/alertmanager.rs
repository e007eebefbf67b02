use super::{AlertBackend, Credentials, build_http_client, normalize_base_url, send_json};
use crate::error::BackendError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::warn;
use url::form_urlencoded;

const BACKEND: &str = "Alertmanager";

/// Query parameter of a Prometheus graph link holding the first expression.
const EXPRESSION_PARAM: &str = "g0.expr";

/// The URL-decoded `g0.expr` parameter of an alert generator URL.
///
/// Relative links such as `/graph?g0.expr=...` are accepted as well.
pub fn extract_promql_expression(generator_url: &str) -> Option<String> {
    let (_, query) = generator_url.split_once('?')?;
    let query = query.split('#').next().unwrap_or_default();
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == EXPRESSION_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|expr| !expr.trim().is_empty())
}

/// Distinct expressions of the given alerts, sorted.
///
/// Alerts without a recoverable expression are logged and skipped.
pub fn unique_expressions(alerts: &[Value]) -> Vec<String> {
    let mut expressions = BTreeSet::new();
    for alert in alerts {
        let generator_url = alert["generatorURL"].as_str().unwrap_or_default();
        match extract_promql_expression(generator_url) {
            Some(expr) => {
                expressions.insert(expr);
            }
            None => warn!(
                alertname = alert["labels"]["alertname"].as_str().unwrap_or_default(),
                generator_url, "Skipping alert without a PromQL expression"
            ),
        }
    }
    expressions.into_iter().collect()
}

#[derive(Debug, Clone)]
pub struct AlertmanagerClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl AlertmanagerClient {
    pub fn new(
        base_url: &str,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            client: build_http_client(BACKEND, timeout)?,
            base_url: normalize_base_url(BACKEND, base_url)?,
            credentials,
        })
    }
}

#[async_trait]
impl AlertBackend for AlertmanagerClient {
    async fn alerts(&self) -> Result<Vec<Value>, BackendError> {
        let url = format!("{}/api/v2/alerts", self.base_url);
        let request = self.credentials.apply(self.client.get(&url));
        send_json(BACKEND, &url, request).await
    }
}

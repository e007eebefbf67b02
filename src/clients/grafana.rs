use super::{Credentials, DashboardBackend, build_http_client, normalize_base_url, send_json};
use crate::error::BackendError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

const BACKEND: &str = "Grafana";

/// The fields of a search hit needed to fetch the full dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DashboardSummary {
    pub uid: String,
    #[serde(default)]
    pub title: String,
}

/// Search hits split into fetchable dashboards and a count of unusable hits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHits {
    pub dashboards: Vec<DashboardSummary>,
    pub skipped: usize,
}

impl DashboardSummary {
    /// Search hits without a string uid cannot be fetched; each one is logged and counted.
    pub fn from_search_results(results: &[Value]) -> SearchHits {
        let mut hits = SearchHits::default();
        for hit in results {
            match serde_json::from_value::<DashboardSummary>(hit.clone()) {
                Ok(summary) => hits.dashboards.push(summary),
                Err(err) => {
                    hits.skipped += 1;
                    warn!(hit = %hit, "Skipping search hit without uid: {}", err);
                }
            }
        }
        hits
    }
}

/// Query lines of one dashboard, formatted as `<dashboard title>: <expr>`.
///
/// Panels nested in collapsed rows are included.
pub fn extract_queries(dashboard_json: &Value) -> Vec<String> {
    let dashboard = &dashboard_json["dashboard"];
    let title = dashboard["title"].as_str().unwrap_or_default();
    let mut queries = Vec::new();
    if let Some(panels) = dashboard["panels"].as_array() {
        collect_panel_queries(panels, title, &mut queries);
    }
    queries
}

fn collect_panel_queries(panels: &[Value], title: &str, queries: &mut Vec<String>) {
    for panel in panels {
        if let Some(targets) = panel["targets"].as_array() {
            for target in targets {
                match target["expr"].as_str() {
                    Some(expr) if !expr.is_empty() => {
                        queries.push(format!("{}: {}", title, expr));
                    }
                    _ => {}
                }
            }
        }
        if let Some(nested) = panel["panels"].as_array() {
            collect_panel_queries(nested, title, queries);
        }
    }
}

#[derive(Debug, Clone)]
pub struct GrafanaClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl GrafanaClient {
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
impl DashboardBackend for GrafanaClient {
    async fn search_dashboards(&self) -> Result<Vec<Value>, BackendError> {
        let url = format!("{}/api/search", self.base_url);
        let request = self
            .credentials
            .apply(self.client.get(&url).query(&[("type", "dash-db")]));
        send_json(BACKEND, &url, request).await
    }

    async fn dashboard(&self, uid: &str) -> Result<Value, BackendError> {
        let url = format!(
            "{}/api/dashboards/uid/{}",
            self.base_url,
            urlencoding::encode(uid)
        );
        let request = self.credentials.apply(self.client.get(&url));
        send_json(BACKEND, &url, request).await
    }
}

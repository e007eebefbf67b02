//! In-memory backends for pipeline tests.
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration tests under `tests/`.

use crate::clients::{AlertBackend, DashboardBackend, MonitoringBackend};
use crate::datamodel::{SeriesObservation, TopMetric};
use crate::error::BackendError;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// A Prometheus stand-in serving fixed rankings and series.
#[derive(Debug, Default)]
pub struct FakeMonitoringBackend {
    pub unhealthy: bool,
    pub top: Vec<TopMetric>,
    pub series: HashMap<String, Vec<SeriesObservation>>,
    /// Metrics whose series request fails
    pub failing: HashSet<String>,
    /// Metrics whose series request is delayed
    pub delays: HashMap<String, Duration>,
}

impl FakeMonitoringBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metric(mut self, metric: &str, series: Vec<SeriesObservation>) -> Self {
        self.top
            .push(TopMetric::new(metric, series.len() as u64));
        self.series.insert(metric.to_string(), series);
        self
    }

    /// Rank a metric with an explicit series count, without series data.
    pub fn with_ranked_metric(mut self, metric: &str, series_count: u64) -> Self {
        self.top.push(TopMetric::new(metric, series_count));
        self
    }

    pub fn with_failing_metric(mut self, metric: &str) -> Self {
        self.failing.insert(metric.to_string());
        self
    }

    pub fn with_delay(mut self, metric: &str, delay: Duration) -> Self {
        self.delays.insert(metric.to_string(), delay);
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.unhealthy = true;
        self
    }
}

#[async_trait]
impl MonitoringBackend for FakeMonitoringBackend {
    async fn health_check(&self) -> Result<(), BackendError> {
        if self.unhealthy {
            return Err(BackendError::Unhealthy {
                backend: "Prometheus",
                reason: "fake backend is down".to_string(),
            });
        }
        Ok(())
    }

    async fn top_metrics(&self, limit: usize) -> Result<Vec<TopMetric>, BackendError> {
        Ok(self.top.iter().take(limit).cloned().collect())
    }

    async fn series(&self, metric: &str) -> Result<Vec<SeriesObservation>, BackendError> {
        if let Some(delay) = self.delays.get(metric) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(metric) {
            return Err(BackendError::decode(
                "Prometheus",
                "fake://series",
                format!("no series for {}", metric),
            ));
        }
        Ok(self.series.get(metric).cloned().unwrap_or_default())
    }
}

/// Series where `label` takes `count` distinct values.
pub fn series_with_distinct_label(
    metric: &str,
    label: &str,
    count: usize,
) -> Vec<SeriesObservation> {
    (0..count)
        .map(|i| {
            SeriesObservation::from([
                ("__name__".to_string(), metric.to_string()),
                (label.to_string(), format!("{}-{}", label, i)),
                ("job".to_string(), "api".to_string()),
            ])
        })
        .collect()
}

/// A Grafana stand-in keyed by dashboard uid.
#[derive(Debug, Default)]
pub struct FakeDashboardBackend {
    pub dashboards: Vec<(String, Value)>,
    pub failing: HashSet<String>,
    /// Raw hits appended to the search results as-is
    pub extra_hits: Vec<Value>,
    pub search_fails: bool,
}

impl FakeDashboardBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dashboard with one panel per expression.
    pub fn with_dashboard(mut self, uid: &str, title: &str, exprs: &[&str]) -> Self {
        let panels: Vec<Value> = exprs
            .iter()
            .map(|expr| json!({"targets": [{"expr": expr}]}))
            .collect();
        self.dashboards.push((
            uid.to_string(),
            json!({"dashboard": {"title": title, "panels": panels}}),
        ));
        self
    }

    pub fn with_failing_dashboard(mut self, uid: &str, title: &str) -> Self {
        self.failing.insert(uid.to_string());
        self.dashboards
            .push((uid.to_string(), json!({"dashboard": {"title": title}})));
        self
    }

    pub fn with_search_hit(mut self, hit: Value) -> Self {
        self.extra_hits.push(hit);
        self
    }
}

#[async_trait]
impl DashboardBackend for FakeDashboardBackend {
    async fn search_dashboards(&self) -> Result<Vec<Value>, BackendError> {
        if self.search_fails {
            return Err(BackendError::Status {
                backend: "Grafana",
                url: "fake://search".to_string(),
                status: 401,
            });
        }
        Ok(self
            .dashboards
            .iter()
            .enumerate()
            .map(|(id, (uid, dashboard))| {
                json!({
                    "id": id + 1,
                    "uid": uid,
                    "title": dashboard["dashboard"]["title"],
                    "type": "dash-db"
                })
            })
            .chain(self.extra_hits.iter().cloned())
            .collect())
    }

    async fn dashboard(&self, uid: &str) -> Result<Value, BackendError> {
        if self.failing.contains(uid) {
            return Err(BackendError::Status {
                backend: "Grafana",
                url: format!("fake://dashboards/uid/{}", uid),
                status: 500,
            });
        }
        self.dashboards
            .iter()
            .find(|(candidate, _)| candidate == uid)
            .map(|(_, dashboard)| dashboard.clone())
            .ok_or_else(|| BackendError::Status {
                backend: "Grafana",
                url: format!("fake://dashboards/uid/{}", uid),
                status: 404,
            })
    }
}

/// An Alertmanager stand-in whose alerts carry the given expressions.
#[derive(Debug, Default)]
pub struct FakeAlertBackend {
    pub alerts: Vec<Value>,
}

impl FakeAlertBackend {
    pub fn with_expressions(exprs: &[&str]) -> Self {
        let alerts = exprs
            .iter()
            .map(|expr| {
                json!({
                    "generatorURL": format!(
                        "http://prometheus:9090/graph?g0.expr={}&g0.tab=1",
                        urlencoding::encode(expr)
                    )
                })
            })
            .collect();
        Self { alerts }
    }
}

#[async_trait]
impl AlertBackend for FakeAlertBackend {
    async fn alerts(&self) -> Result<Vec<Value>, BackendError> {
        Ok(self.alerts.clone())
    }
}

use super::{MonitoringBackend, build_http_client, normalize_base_url, send_json};
use crate::datamodel::{SeriesObservation, TopMetric};
use crate::error::BackendError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const BACKEND: &str = "Prometheus";

/// Envelope shared by the Prometheus HTTP API responses.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    status: String,
    data: Option<T>,
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_data(self, url: &str) -> Result<T, BackendError> {
        if self.status != "success" {
            return Err(BackendError::decode(
                BACKEND,
                url,
                self.error.unwrap_or_else(|| format!("status '{}'", self.status)),
            ));
        }
        self.data
            .ok_or_else(|| BackendError::decode(BACKEND, url, "missing data"))
    }
}

#[derive(Debug, Deserialize)]
struct VectorData {
    result: Vec<VectorSample>,
}

#[derive(Debug, Deserialize)]
struct VectorSample {
    metric: HashMap<String, String>,
    /// `[timestamp, "value"]`
    value: (f64, String),
}

/// PromQL ranking metric names by number of series.
pub fn top_metrics_query(limit: usize) -> String {
    format!("topk({}, count by (__name__)({{__name__!=\"\"}}))", limit)
}

#[derive(Debug, Clone)]
pub struct PrometheusClient {
    client: reqwest::Client,
    base_url: String,
}

impl PrometheusClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        Ok(Self {
            client: build_http_client(BACKEND, timeout)?,
            base_url: normalize_base_url(BACKEND, base_url)?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn parse_top_metrics(data: VectorData, url: &str) -> Result<Vec<TopMetric>, BackendError> {
    data.result
        .into_iter()
        .map(|sample| {
            let metric = sample
                .metric
                .get("__name__")
                .cloned()
                .ok_or_else(|| BackendError::decode(BACKEND, url, "sample without __name__"))?;
            let series_count = sample.value.1.parse::<f64>().map_err(|err| {
                BackendError::decode(
                    BACKEND,
                    url,
                    format!("invalid series count '{}': {}", sample.value.1, err),
                )
            })?;
            Ok(TopMetric::new(metric, series_count as u64))
        })
        .collect()
}

#[async_trait]
impl MonitoringBackend for PrometheusClient {
    async fn health_check(&self) -> Result<(), BackendError> {
        let url = self.url("/-/healthy");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| BackendError::Unhealthy {
                backend: BACKEND,
                reason: err.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(BackendError::Unhealthy {
                backend: BACKEND,
                reason: format!("HTTP {} from {}", response.status().as_u16(), url),
            });
        }
        Ok(())
    }

    async fn top_metrics(&self, limit: usize) -> Result<Vec<TopMetric>, BackendError> {
        let url = self.url("/api/v1/query");
        let request = self
            .client
            .get(&url)
            .query(&[("query", top_metrics_query(limit))]);
        let response: ApiResponse<VectorData> = send_json(BACKEND, &url, request).await?;
        parse_top_metrics(response.into_data(&url)?, &url)
    }

    async fn series(&self, metric: &str) -> Result<Vec<SeriesObservation>, BackendError> {
        let url = self.url("/api/v1/series");
        let request = self.client.get(&url).query(&[("match[]", metric)]);
        let response: ApiResponse<Vec<SeriesObservation>> =
            send_json(BACKEND, &url, request).await?;
        response.into_data(&url)
    }
}

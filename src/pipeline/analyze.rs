use crate::analysis::{QueryFile, analyze_labels, extract_from_files, reconcile};
use crate::artifacts::{ArtifactStore, SUMMARY_FILE};
use crate::clients::MonitoringBackend;
use crate::datamodel::{LabelCardinality, MetricReport, QueryUsage, TopMetric};
use crate::report::{Summary, SummaryConverter};
use anyhow::{Context, Result};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub top_metrics: usize,
    /// Metrics whose series are fetched and analyzed at the same time
    pub concurrency: usize,
    /// Upper bound for fetching and analyzing one metric
    pub metric_timeout: Duration,
    pub query_files: Vec<QueryFile>,
}

impl AnalyzeOptions {
    pub fn new(store: &ArtifactStore, top_metrics: usize, metric_timeout: Duration) -> Self {
        Self {
            top_metrics,
            concurrency: 1,
            metric_timeout,
            query_files: QueryFile::defaults_in(store.dir()),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// Label cardinality of one metric. Any failure degrades to an empty result.
async fn metric_cardinality(
    backend: &dyn MonitoringBackend,
    metric: &str,
    timeout: Duration,
) -> LabelCardinality {
    match tokio::time::timeout(timeout, backend.series(metric)).await {
        Ok(Ok(series)) => {
            info!(metric, series = series.len(), "Analyzing labels");
            let cardinality = analyze_labels(&series);
            info!(metric, labels = cardinality.len(), "Found unique labels");
            cardinality
        }
        Ok(Err(err)) => {
            warn!(metric, "Could not fetch series, skipping labels: {}", err);
            LabelCardinality::new()
        }
        Err(_) => {
            warn!(
                metric,
                timeout_seconds = timeout.as_secs_f64(),
                "Timed out fetching series, skipping labels"
            );
            LabelCardinality::new()
        }
    }
}

/// Reports for the given metrics, analyzed on a bounded pool.
///
/// Completion order is discarded: reports come back in ranking order, then
/// `Summary` sorts them by series count.
pub async fn analyze_metrics(
    backend: &dyn MonitoringBackend,
    usage: &QueryUsage,
    metrics: &[TopMetric],
    options: &AnalyzeOptions,
) -> Summary {
    let mut reports: Vec<(usize, MetricReport)> = futures::stream::iter(metrics.iter().enumerate())
        .map(|(rank, metric)| async move {
            let cardinality =
                metric_cardinality(backend, &metric.metric, options.metric_timeout).await;
            (rank, reconcile(metric, usage, &cardinality))
        })
        .buffer_unordered(options.concurrency.max(1))
        .collect()
        .await;

    reports.sort_by_key(|(rank, _)| *rank);
    Summary::from_reports(reports.into_iter().map(|(_, report)| report).collect())
}

/// Health check, top-N ranking, usage extraction and per-metric analysis.
///
/// Only the health check and the ranking query abort the run.
pub async fn run_analysis(
    backend: &dyn MonitoringBackend,
    options: &AnalyzeOptions,
) -> Result<Summary> {
    backend
        .health_check()
        .await
        .context("Monitoring backend is not healthy")?;
    info!("Prometheus is healthy, proceeding with cardinality analysis");

    info!(limit = options.top_metrics, "Fetching top high-cardinality metrics");
    let top_metrics = backend
        .top_metrics(options.top_metrics)
        .await
        .context("Failed to fetch top high-cardinality metrics")?;
    if top_metrics.is_empty() {
        warn!("The monitoring backend returned no metrics");
    }

    let usage = extract_from_files(&options.query_files).await;
    if usage.is_empty() {
        warn!("No query usage found, every metric will be reported as unused");
    }

    Ok(analyze_metrics(backend, &usage, &top_metrics, options).await)
}

/// Run the analysis and persist the summary artifact.
pub async fn analyze_and_persist(
    backend: &dyn MonitoringBackend,
    store: &ArtifactStore,
    options: &AnalyzeOptions,
) -> Result<(Summary, PathBuf)> {
    let summary = run_analysis(backend, options).await?;
    let json = SummaryConverter::to_json(&summary)?;
    let path = store
        .write(SUMMARY_FILE, json.as_bytes())
        .await
        .context("Failed to save metric summary")?;
    info!(path = %path.display(), metrics = summary.len(), "Saved metric summary");
    Ok((summary, path))
}

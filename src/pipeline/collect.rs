use crate::artifacts::{ArtifactStore, DASHBOARDS_FILE};
use crate::clients::alertmanager::unique_expressions;
use crate::clients::{AlertBackend, DashboardBackend, DashboardSummary, extract_queries};
use crate::datamodel::QuerySource;
use anyhow::{Context, Result};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    /// Also export the queries mentioning this metric name
    pub metric_filter: Option<String>,
    /// Also export the alert expressions
    pub alerts: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectOutcome {
    pub dashboards: usize,
    pub failed_dashboards: usize,
    pub queries: usize,
    pub filtered_queries: Option<usize>,
    pub alert_expressions: Option<usize>,
}

/// Queries containing `metric` as a substring.
pub fn filter_queries<'a>(queries: &'a [String], metric: &str) -> Vec<&'a str> {
    queries
        .iter()
        .filter(|query| query.contains(metric))
        .map(String::as_str)
        .collect()
}

/// Fetch every dashboard and write its query lines.
///
/// The dashboard search must succeed. A search hit without a uid, or a single dashboard that
/// cannot be fetched, is logged, counted as failed and skipped.
pub async fn collect_dashboard_queries(
    grafana: &dyn DashboardBackend,
    store: &ArtifactStore,
    outcome: &mut CollectOutcome,
) -> Result<Vec<String>> {
    let search_results = grafana
        .search_dashboards()
        .await
        .context("Failed to list dashboards")?;
    store
        .write_json(DASHBOARDS_FILE, &search_results)
        .await
        .context("Failed to save dashboards metadata")?;
    info!(file = DASHBOARDS_FILE, "Saved dashboards metadata");

    let hits = DashboardSummary::from_search_results(&search_results);
    outcome.dashboards = search_results.len();
    outcome.failed_dashboards = hits.skipped;

    let mut queries = Vec::new();
    for dashboard in &hits.dashboards {
        info!(title = %dashboard.title, uid = %dashboard.uid, "Fetching dashboard");
        match grafana.dashboard(&dashboard.uid).await {
            Ok(dashboard_json) => queries.extend(extract_queries(&dashboard_json)),
            Err(err) => {
                outcome.failed_dashboards += 1;
                error!(title = %dashboard.title, "Failed to fetch dashboard: {}", err);
            }
        }
    }

    let file_name = QuerySource::Dashboard.file_name();
    store
        .write_lines(file_name, &queries, "\n")
        .await
        .context("Failed to save dashboard queries")?;
    outcome.queries = queries.len();
    info!(queries = queries.len(), file = file_name, "Extracted PromQL queries");

    Ok(queries)
}

/// Write the queries that mention `metric`. Nothing is written when none match.
pub async fn export_filtered_queries(
    queries: &[String],
    metric: &str,
    store: &ArtifactStore,
) -> Result<usize> {
    let filtered = filter_queries(queries, metric);
    if filtered.is_empty() {
        warn!(metric, "No queries found with metric");
        return Ok(0);
    }

    let file_name = QuerySource::Filtered.file_name();
    store
        .write_lines(file_name, &filtered, "\n")
        .await
        .context("Failed to save filtered queries")?;
    info!(metric, queries = filtered.len(), file = file_name, "Saved filtered queries");
    Ok(filtered.len())
}

/// Write the distinct, sorted alert expressions separated by blank lines.
pub async fn collect_alert_expressions(
    alertmanager: &dyn AlertBackend,
    store: &ArtifactStore,
) -> Result<usize> {
    let alerts = alertmanager
        .alerts()
        .await
        .context("Failed to fetch alerts")?;
    let expressions = unique_expressions(&alerts);
    if expressions.is_empty() {
        warn!(alerts = alerts.len(), "No PromQL expressions found in alerts");
        return Ok(0);
    }

    let file_name = QuerySource::Alert.file_name();
    store
        .write_lines(file_name, &expressions, "\n\n")
        .await
        .context("Failed to save alert expressions")?;
    info!(
        expressions = expressions.len(),
        file = file_name,
        "Saved PromQL expressions from alerts"
    );
    Ok(expressions.len())
}

/// Dashboards first, then the optional filtered export and alert extraction.
pub async fn run_collect(
    grafana: &dyn DashboardBackend,
    alertmanager: Option<&dyn AlertBackend>,
    store: &ArtifactStore,
    options: &CollectOptions,
) -> Result<CollectOutcome> {
    let mut outcome = CollectOutcome::default();
    let queries = collect_dashboard_queries(grafana, store, &mut outcome).await?;

    if let Some(metric) = options.metric_filter.as_deref() {
        outcome.filtered_queries = Some(export_filtered_queries(&queries, metric, store).await?);
    }

    if options.alerts {
        let alertmanager =
            alertmanager.context("Alert extraction requested without an alert backend")?;
        outcome.alert_expressions = Some(collect_alert_expressions(alertmanager, store).await?);
    }

    Ok(outcome)
}

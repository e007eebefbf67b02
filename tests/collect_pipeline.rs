mod common;

use anyhow::Result;
use cardaudit::analysis::{QueryFile, extract_from_files};
use cardaudit::artifacts::DASHBOARDS_FILE;
use cardaudit::clients::AlertBackend;
use cardaudit::datamodel::QuerySource;
use cardaudit::pipeline::{CollectOptions, run_collect};
use cardaudit::test_utils::{FakeAlertBackend, FakeDashboardBackend};
use common::temp_store;

fn grafana() -> FakeDashboardBackend {
    FakeDashboardBackend::new()
        .with_dashboard(
            "api",
            "API Overview",
            &[
                "sum(rate(http_requests_total{code=~\"5..\"}[5m]))",
                "histogram_quantile(0.99, rate(http_request_duration_seconds_bucket[5m]))",
            ],
        )
        .with_dashboard("nodes", "Nodes", &["node_load1{instance=\"a\"}"])
}

#[tokio::test]
async fn test_collect_dashboard_queries() -> Result<()> {
    let (_dir, store) = temp_store();

    let outcome = run_collect(&grafana(), None, &store, &CollectOptions::default()).await?;

    assert_eq!(outcome.dashboards, 2);
    assert_eq!(outcome.queries, 3);
    assert_eq!(outcome.failed_dashboards, 0);
    assert_eq!(outcome.filtered_queries, None);
    assert_eq!(outcome.alert_expressions, None);

    let queries = std::fs::read_to_string(store.path(QuerySource::Dashboard.file_name()))?;
    assert_eq!(
        queries.lines().collect::<Vec<_>>(),
        vec![
            "API Overview: sum(rate(http_requests_total{code=~\"5..\"}[5m]))",
            "API Overview: histogram_quantile(0.99, rate(http_request_duration_seconds_bucket[5m]))",
            "Nodes: node_load1{instance=\"a\"}",
        ]
    );

    let metadata: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.path(DASHBOARDS_FILE))?)?;
    assert_eq!(metadata.as_array().map(Vec::len), Some(2));
    assert!(!store.path(QuerySource::Filtered.file_name()).exists());
    Ok(())
}

#[tokio::test]
async fn test_failing_dashboard_is_skipped() -> Result<()> {
    let (_dir, store) = temp_store();
    let backend = grafana().with_failing_dashboard("broken", "Broken");

    let outcome = run_collect(&backend, None, &store, &CollectOptions::default()).await?;

    assert_eq!(outcome.dashboards, 3);
    assert_eq!(outcome.failed_dashboards, 1);
    assert_eq!(outcome.queries, 3);
    Ok(())
}

#[tokio::test]
async fn test_search_hit_without_uid_is_counted_as_failed() -> Result<()> {
    let (_dir, store) = temp_store();
    let backend = grafana().with_search_hit(serde_json::json!({"id": 9, "title": "Legacy"}));

    let outcome = run_collect(&backend, None, &store, &CollectOptions::default()).await?;

    assert_eq!(outcome.dashboards, 3);
    assert_eq!(outcome.failed_dashboards, 1);
    assert_eq!(outcome.queries, 3);
    Ok(())
}

#[tokio::test]
async fn test_failing_search_aborts() {
    let (_dir, store) = temp_store();
    let mut backend = grafana();
    backend.search_fails = true;

    let result = run_collect(&backend, None, &store, &CollectOptions::default()).await;

    assert!(result.is_err());
    assert!(!store.path(DASHBOARDS_FILE).exists());
}

#[tokio::test]
async fn test_metric_filter_export() -> Result<()> {
    let (_dir, store) = temp_store();
    let options = CollectOptions {
        metric_filter: Some("http_request".to_string()),
        alerts: false,
    };

    let outcome = run_collect(&grafana(), None, &store, &options).await?;

    assert_eq!(outcome.filtered_queries, Some(2));
    let filtered = std::fs::read_to_string(store.path(QuerySource::Filtered.file_name()))?;
    assert_eq!(filtered.lines().count(), 2);
    assert!(filtered.lines().all(|line| line.starts_with("API Overview: ")));
    Ok(())
}

#[tokio::test]
async fn test_metric_filter_without_match_writes_nothing() -> Result<()> {
    let (_dir, store) = temp_store();
    let options = CollectOptions {
        metric_filter: Some("does_not_exist".to_string()),
        alerts: false,
    };

    let outcome = run_collect(&grafana(), None, &store, &options).await?;

    assert_eq!(outcome.filtered_queries, Some(0));
    assert!(!store.path(QuerySource::Filtered.file_name()).exists());
    Ok(())
}

#[tokio::test]
async fn test_alert_expressions_are_deduplicated_and_sorted() -> Result<()> {
    let (_dir, store) = temp_store();
    let alerts = FakeAlertBackend::with_expressions(&[
        "up == 0",
        "rate(kube_pod_container_status_restarts_total{pod=~\"api-.*\"}[15m]) > 0",
        "up == 0",
    ]);
    let options = CollectOptions {
        metric_filter: None,
        alerts: true,
    };

    let outcome = run_collect(
        &grafana(),
        Some(&alerts as &dyn AlertBackend),
        &store,
        &options,
    )
    .await?;

    assert_eq!(outcome.alert_expressions, Some(2));
    let content = std::fs::read_to_string(store.path(QuerySource::Alert.file_name()))?;
    assert_eq!(
        content,
        "rate(kube_pod_container_status_restarts_total{pod=~\"api-.*\"}[15m]) > 0\n\nup == 0"
    );
    Ok(())
}

#[tokio::test]
async fn test_alerts_requested_without_backend() {
    let (_dir, store) = temp_store();
    let options = CollectOptions {
        metric_filter: None,
        alerts: true,
    };

    assert!(run_collect(&grafana(), None, &store, &options).await.is_err());
}

#[tokio::test]
async fn test_collected_files_feed_the_extractor() -> Result<()> {
    let (_dir, store) = temp_store();
    let alerts = FakeAlertBackend::with_expressions(&["node_load1{instance=\"b\"} > 4"]);
    let options = CollectOptions {
        metric_filter: Some("node_load1".to_string()),
        alerts: true,
    };
    run_collect(&grafana(), Some(&alerts as &dyn AlertBackend), &store, &options).await?;

    let usage = extract_from_files(&QueryFile::defaults_in(store.dir())).await;

    assert_eq!(
        usage.sources_for("node_load1"),
        vec![
            QuerySource::Dashboard,
            QuerySource::Alert,
            QuerySource::Filtered
        ]
    );
    assert_eq!(
        usage.sources_for("http_requests_total"),
        vec![QuerySource::Dashboard]
    );
    assert!(usage.is_label_used("instance"));
    assert!(usage.is_label_used("code"));
    Ok(())
}

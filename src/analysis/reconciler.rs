use crate::datamodel::{LabelCardinality, LabelUsage, MetricReport, QueryUsage, TopMetric};

/// Join a ranked metric and its label cardinality against the query usage.
///
/// Label usage is global: a label counts as used if any query references it,
/// whatever metric the query selects. Query text rarely tells which metric a
/// label filter binds to, so a label shared by several metrics gets one verdict.
pub fn reconcile(
    metric: &TopMetric,
    usage: &QueryUsage,
    label_cardinality: &LabelCardinality,
) -> MetricReport {
    let labels = label_cardinality
        .iter()
        .map(|(label, cardinality)| {
            (
                label.clone(),
                LabelUsage {
                    cardinality: *cardinality,
                    in_use: usage.is_label_used(label),
                },
            )
        })
        .collect();

    MetricReport {
        metric: metric.metric.clone(),
        series_count: metric.series_count,
        in_use: usage.is_metric_used(&metric.metric),
        used_in: usage.sources_for(&metric.metric),
        labels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::extractor::extract_from_lines;
    use crate::datamodel::QuerySource;

    #[test]
    fn test_used_metric() {
        let usage = extract_from_lines(
            ["Overview: sum(rate(http_requests_total[5m]))"],
            QuerySource::Dashboard,
        );
        let report = reconcile(
            &TopMetric::new("http_requests_total", 500),
            &usage,
            &LabelCardinality::new(),
        );
        assert!(report.in_use);
        assert_eq!(report.used_in, vec![QuerySource::Dashboard]);
        assert_eq!(report.series_count, 500);
    }

    #[test]
    fn test_unused_metric() {
        let usage = extract_from_lines(["up"], QuerySource::Alert);
        let report = reconcile(
            &TopMetric::new("debug_probe_total", 50),
            &usage,
            &LabelCardinality::new(),
        );
        assert!(!report.in_use);
        assert!(report.used_in.is_empty());
    }

    #[test]
    fn test_membership_is_exact() {
        let usage = extract_from_lines(["http_requests_total_bucket"], QuerySource::Dashboard);
        let report = reconcile(
            &TopMetric::new("http_requests_total", 10),
            &usage,
            &LabelCardinality::new(),
        );
        assert!(!report.in_use);
    }

    #[test]
    fn test_label_usage_is_global() {
        let usage = extract_from_lines([r#"kube_pod_info{pod="x"}"#], QuerySource::Alert);
        let cardinality =
            LabelCardinality::from([("pod".to_string(), 300), ("uid".to_string(), 1200)]);
        let report = reconcile(
            &TopMetric::new("container_memory_rss", 900),
            &usage,
            &cardinality,
        );

        assert!(!report.in_use);
        assert_eq!(
            report.labels["pod"],
            LabelUsage {
                cardinality: 300,
                in_use: true
            }
        );
        assert_eq!(
            report.labels["uid"],
            LabelUsage {
                cardinality: 1200,
                in_use: false
            }
        );
    }
}

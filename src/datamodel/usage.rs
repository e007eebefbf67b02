use super::QuerySource;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// One query expression line together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRecord {
    pub text: String,
    pub source: QuerySource,
}

impl QueryRecord {
    pub fn new(text: impl Into<String>, source: QuerySource) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }
}

pub type MetricUsageIndex = HashMap<String, BTreeSet<QuerySource>>;
pub type LabelUsageSet = HashSet<String>;

/// Label key to label value for one series, as returned by the series endpoint.
pub type SeriesObservation = HashMap<String, String>;

/// Label key to number of distinct values, for one metric.
pub type LabelCardinality = BTreeMap<String, usize>;

/// Metrics and labels referenced by the known queries.
///
/// Built once per run, then only read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryUsage {
    metrics: MetricUsageIndex,
    labels: LabelUsageSet,
}

impl QueryUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_metric(&mut self, metric: &str, source: QuerySource) {
        match self.metrics.get_mut(metric) {
            Some(sources) => {
                sources.insert(source);
            }
            None => {
                self.metrics
                    .insert(metric.to_string(), BTreeSet::from([source]));
            }
        }
    }

    pub fn record_label(&mut self, label: &str) {
        if !self.labels.contains(label) {
            self.labels.insert(label.to_string());
        }
    }

    /// Fold another usage view into this one.
    pub fn merge(&mut self, other: QueryUsage) {
        for (metric, sources) in other.metrics {
            self.metrics.entry(metric).or_default().extend(sources);
        }
        self.labels.extend(other.labels);
    }

    pub fn is_metric_used(&self, metric: &str) -> bool {
        self.metrics.contains_key(metric)
    }

    /// Sources referencing the metric, in `QuerySource` order. Empty when unused.
    pub fn sources_for(&self, metric: &str) -> Vec<QuerySource> {
        self.metrics
            .get(metric)
            .map(|sources| sources.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_label_used(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn metrics(&self) -> &MetricUsageIndex {
        &self.metrics
    }

    pub fn labels(&self) -> &LabelUsageSet {
        &self.labels
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty() && self.labels.is_empty()
    }
}

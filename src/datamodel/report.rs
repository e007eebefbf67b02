use super::QuerySource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A metric ranked by the monitoring backend, with its number of series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopMetric {
    pub metric: String,
    pub series_count: u64,
}

impl TopMetric {
    pub fn new(metric: impl Into<String>, series_count: u64) -> Self {
        Self {
            metric: metric.into(),
            series_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelUsage {
    pub cardinality: usize,
    pub in_use: bool,
}

/// Usage verdict for one high-cardinality metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricReport {
    pub metric: String,
    pub series_count: u64,
    pub in_use: bool,
    pub used_in: Vec<QuerySource>,
    pub labels: BTreeMap<String, LabelUsage>,
}

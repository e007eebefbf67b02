use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a query expression was found.
///
/// The declaration order is the order sources are listed in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QuerySource {
    #[serde(rename = "grafana")]
    Dashboard,
    #[serde(rename = "alertmanager")]
    Alert,
    #[serde(rename = "specific")]
    Filtered,
}

pub const DASHBOARD_QUERIES_FILE: &str = "grafana_promql_queries.txt";
pub const FILTERED_QUERIES_FILE: &str = "grafana_specific_metric.txt";
pub const ALERT_EXPRESSIONS_FILE: &str = "alertmanager_promql_expressions.txt";

impl QuerySource {
    pub const ALL: [QuerySource; 3] = [
        QuerySource::Dashboard,
        QuerySource::Alert,
        QuerySource::Filtered,
    ];

    /// Name of the text file this source is persisted to inside the results directory.
    pub fn file_name(self) -> &'static str {
        match self {
            QuerySource::Dashboard => DASHBOARD_QUERIES_FILE,
            QuerySource::Alert => ALERT_EXPRESSIONS_FILE,
            QuerySource::Filtered => FILTERED_QUERIES_FILE,
        }
    }
}

impl fmt::Display for QuerySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QuerySource::Dashboard => "grafana",
            QuerySource::Alert => "alertmanager",
            QuerySource::Filtered => "specific",
        };
        write!(f, "{}", s)
    }
}

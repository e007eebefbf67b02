pub mod json;

pub use json::SummaryConverter;

use crate::datamodel::MetricReport;
use serde::{Deserialize, Serialize};

/// Metric reports ordered by descending series count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Summary {
    reports: Vec<MetricReport>,
}

impl Summary {
    /// Sort the reports by descending series count.
    ///
    /// The sort is stable: equal series counts keep their input order.
    pub fn from_reports(mut reports: Vec<MetricReport>) -> Self {
        reports.sort_by(|a, b| b.series_count.cmp(&a.series_count));
        Self { reports }
    }

    pub fn reports(&self) -> &[MetricReport] {
        &self.reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn used(&self) -> impl Iterator<Item = &MetricReport> {
        self.reports.iter().filter(|report| report.in_use)
    }

    pub fn unused(&self) -> impl Iterator<Item = &MetricReport> {
        self.reports.iter().filter(|report| !report.in_use)
    }

    /// One console line per metric, in summary order.
    pub fn digest_lines(&self) -> Vec<String> {
        self.reports.iter().map(console_line).collect()
    }
}

/// `<metric>: <series_count> series - <USED|UNUSED> (<sources or "not used">)`
pub fn console_line(report: &MetricReport) -> String {
    let status = if report.in_use { "USED" } else { "UNUSED" };
    let sources = if report.used_in.is_empty() {
        "not used".to_string()
    } else {
        report
            .used_in
            .iter()
            .map(|source| source.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "{}: {} series - {} ({})",
        report.metric, report.series_count, status, sources
    )
}

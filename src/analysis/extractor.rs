//! Lexical extraction of metric names and label keys from query text.
//!
//! Expressions are not parsed. Every token that looks like a metric name is taken as one,
//! which also picks up function names (`rate`, `sum`), keywords (`by`), label names, label
//! values and words of dashboard titles. These false positives only ever make a metric look
//! used, never unused, which is the safe side for a pruning decision.

use crate::datamodel::{QueryRecord, QuerySource, QueryUsage};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

static METRIC_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z_:][a-zA-Z0-9_:]*").expect("valid metric name pattern"));

static LABEL_KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-zA-Z_][a-zA-Z0-9_]*)\s*=").expect("valid label key pattern"));

/// Metric name candidates found in one line, in order of appearance.
pub fn metric_candidates(line: &str) -> impl Iterator<Item = &str> {
    METRIC_NAME_PATTERN.find_iter(line).map(|m| m.as_str())
}

/// Label keys found in one line, without the trailing `=`.
pub fn label_keys(line: &str) -> impl Iterator<Item = &str> {
    LABEL_KEY_PATTERN
        .captures_iter(line)
        .filter_map(|captures| captures.get(1))
        .map(|m| m.as_str())
}

/// Fold one line into the usage view.
fn fold_line(usage: &mut QueryUsage, line: &str, source: QuerySource) {
    for metric in metric_candidates(line) {
        usage.record_metric(metric, source);
    }
    for label in label_keys(line) {
        usage.record_label(label);
    }
}

/// Extract usage from lines that all come from the same source.
pub fn extract_from_lines<'a, I>(lines: I, source: QuerySource) -> QueryUsage
where
    I: IntoIterator<Item = &'a str>,
{
    let mut usage = QueryUsage::new();
    for line in lines {
        fold_line(&mut usage, line, source);
    }
    usage
}

/// Extract usage from records of mixed sources.
pub fn extract_from_records<'a, I>(records: I) -> QueryUsage
where
    I: IntoIterator<Item = &'a QueryRecord>,
{
    let mut usage = QueryUsage::new();
    for record in records {
        fold_line(&mut usage, &record.text, record.source);
    }
    usage
}

/// A query file and the source its lines are attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFile {
    pub path: PathBuf,
    pub source: QuerySource,
}

impl QueryFile {
    pub fn new(path: impl Into<PathBuf>, source: QuerySource) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }

    /// The three query files produced by the `collect` step.
    pub fn defaults_in(results_dir: &Path) -> Vec<QueryFile> {
        QuerySource::ALL
            .into_iter()
            .map(|source| QueryFile::new(results_dir.join(source.file_name()), source))
            .collect()
    }
}

/// Extract usage from every available query file.
///
/// Missing or unreadable files are logged and skipped.
pub async fn extract_from_files(files: &[QueryFile]) -> QueryUsage {
    let mut usage = QueryUsage::new();

    for file in files {
        if !tokio::fs::try_exists(&file.path).await.unwrap_or(false) {
            warn!(path = %file.path.display(), "Skipping missing query file");
            continue;
        }

        match tokio::fs::read(&file.path).await {
            Ok(bytes) => {
                // Invalid UTF-8 only spoils the tokens it touches
                let content = String::from_utf8_lossy(&bytes);
                let file_usage = extract_from_lines(content.lines(), file.source);
                info!(
                    path = %file.path.display(),
                    source = %file.source,
                    metrics = file_usage.metrics().len(),
                    labels = file_usage.labels().len(),
                    "Extracted query usage"
                );
                usage.merge(file_usage);
            }
            Err(err) => {
                error!(path = %file.path.display(), "Failed to read query file: {}", err);
            }
        }
    }

    usage
}

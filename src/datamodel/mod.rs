pub mod query_source;
pub mod report;
pub mod usage;

pub use query_source::QuerySource;
pub use report::{LabelUsage, MetricReport, TopMetric};
pub use usage::{
    LabelCardinality, LabelUsageSet, MetricUsageIndex, QueryRecord, QueryUsage, SeriesObservation,
};

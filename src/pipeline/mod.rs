pub mod analyze;
pub mod collect;

pub use analyze::{AnalyzeOptions, analyze_and_persist, analyze_metrics, run_analysis};
pub use collect::{CollectOptions, CollectOutcome, run_collect};

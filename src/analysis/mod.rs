pub mod cardinality;
pub mod extractor;
pub mod reconciler;

pub use cardinality::{CardinalityAnalyzer, analyze_labels};
pub use extractor::{QueryFile, extract_from_files, extract_from_lines, extract_from_records};
pub use reconciler::reconcile;

use crate::datamodel::{LabelCardinality, SeriesObservation};
use std::collections::{HashMap, HashSet};

/// Label carrying the metric name, never counted.
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Streaming distinct-value counter over the series of one metric.
///
/// Observations are folded one at a time and not retained.
#[derive(Debug, Default)]
pub struct CardinalityAnalyzer {
    values: HashMap<String, HashSet<String>>,
}

impl CardinalityAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe<'a, I>(&mut self, labels: I)
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (label, value) in labels {
            if label == METRIC_NAME_LABEL {
                continue;
            }
            if let Some(values) = self.values.get_mut(label.as_str()) {
                if !values.contains(value.as_str()) {
                    values.insert(value.clone());
                }
            } else {
                self.values
                    .insert(label.clone(), HashSet::from([value.clone()]));
            }
        }
    }

    pub fn finish(self) -> LabelCardinality {
        self.values
            .into_iter()
            .map(|(label, values)| (label, values.len()))
            .collect()
    }
}

/// Distinct value count per label across the given series.
pub fn analyze_labels<'a, I>(series: I) -> LabelCardinality
where
    I: IntoIterator<Item = &'a SeriesObservation>,
{
    let mut analyzer = CardinalityAnalyzer::new();
    for observation in series {
        analyzer.observe(observation);
    }
    analyzer.finish()
}

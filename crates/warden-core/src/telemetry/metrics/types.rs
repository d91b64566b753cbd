//! What a metric reads as, independent of how it is stored

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One metric's reading at a point in time
///
/// Serialised with a `kind` tag so exported readings describe themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricValue {
    Counter { total: u64 },
    /// Series keyed by label values joined with `/`
    Labeled { series: BTreeMap<String, u64> },
    Gauge { value: f64 },
    Histogram(HistogramData),
}

impl MetricValue {
    /// Single number for summaries: a count, a level, or a histogram mean
    pub fn scalar(&self) -> f64 {
        match self {
            Self::Counter { total } => *total as f64,
            Self::Labeled { series } => series.values().sum::<u64>() as f64,
            Self::Gauge { value } => *value,
            Self::Histogram(data) => data.mean(),
        }
    }
}

/// Point-in-time copy of a histogram
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramData {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    /// Most recent observation
    pub last: Option<f64>,
    /// Cumulative count per upper bound
    pub buckets: Vec<(f64, u64)>,
}

impl HistogramData {
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// A named metric the collector can enumerate, read and reset
pub trait Metric: Send + Sync {
    fn name(&self) -> &str;

    fn value(&self) -> MetricValue;

    fn reset(&self);
}

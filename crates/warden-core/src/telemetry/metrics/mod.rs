//! Metric primitives
//!
//! - Counters: monotonically increasing values
//! - Gauges: values that can increase or decrease
//! - Histograms: distributions over fixed buckets
//! - Labeled counters: one counter per label combination

mod counter;
mod gauge;
mod histogram;
mod types;


pub use counter::{Counter, LabeledCounter};
pub use gauge::Gauge;
pub use histogram::Histogram;
pub use types::{HistogramData, Metric, MetricValue};

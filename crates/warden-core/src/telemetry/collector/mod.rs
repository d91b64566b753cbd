//! Metrics collector for aggregating and exporting metrics

mod alerts;
mod collector;
mod types;

#[cfg(test)]
mod tests;

pub use alerts::{Alert, AlertThresholds};
pub use collector::MetricsCollector;
pub use types::MetricsSnapshot;

//! Level metrics

use std::sync::atomic::{AtomicU64, Ordering};

use super::types::{Metric, MetricValue};

/// Latest `f64` reading, kept as raw bits in one atomic
///
/// Session gauges are overwritten wholesale by each reaper pass. Spend
/// accumulates through [`Gauge::add`], so sub-cent token prices add up
/// without a fixed-point scale.
#[derive(Debug)]
pub struct Gauge {
    name: String,
    bits: AtomicU64,
    description: String,
}

impl Gauge {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bits: AtomicU64::new(0f64.to_bits()),
            description: description.into(),
        }
    }

    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Add `delta` atomically and return the new reading
    pub fn add(&self, delta: f64) -> f64 {
        let previous = self
            .bits
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + delta).to_bits())
            })
            .unwrap_or_else(|bits| bits);
        f64::from_bits(previous) + delta
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Metric for Gauge {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> MetricValue {
        MetricValue::Gauge { value: self.get() }
    }

    fn reset(&self) {
        self.set(0.0);
    }
}

//! Fixed-bucket distributions for token counts and execution latency

use parking_lot::Mutex;

use super::types::{HistogramData, Metric, MetricValue};

/// Upper bounds for execution latency in seconds, 10ms to 10s
const LATENCY_BOUNDS: [f64; 8] = [0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0];

#[derive(Debug, Default)]
struct Observations {
    count: u64,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
    last: Option<f64>,
    /// Hits per bucket, not cumulative; the final slot holds values above
    /// every bound
    hits: Vec<u64>,
}

/// Distribution over fixed upper bounds
///
/// Each observation lands in exactly one slot. Readings turn the slots into
/// the cumulative `le`-style counts exporters expect.
#[derive(Debug)]
pub struct Histogram {
    name: String,
    description: String,
    bounds: Vec<f64>,
    observations: Mutex<Observations>,
}

impl Histogram {
    /// Histogram over the latency bounds
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::with_buckets(name, description, LATENCY_BOUNDS.to_vec())
    }

    /// Histogram over `bounds`; they are sorted and deduplicated
    pub fn with_buckets(
        name: impl Into<String>,
        description: impl Into<String>,
        mut bounds: Vec<f64>,
    ) -> Self {
        bounds.retain(|b| !b.is_nan());
        bounds.sort_by(f64::total_cmp);
        bounds.dedup();
        let slots = bounds.len() + 1;

        Self {
            name: name.into(),
            description: description.into(),
            bounds,
            observations: Mutex::new(Observations {
                hits: vec![0; slots],
                ..Default::default()
            }),
        }
    }

    pub fn observe(&self, value: f64) {
        let slot = self.bounds.partition_point(|bound| *bound < value);
        let mut obs = self.observations.lock();
        obs.count += 1;
        obs.sum += value;
        obs.min = Some(obs.min.map_or(value, |m| m.min(value)));
        obs.max = Some(obs.max.map_or(value, |m| m.max(value)));
        obs.last = Some(value);
        obs.hits[slot] += 1;
    }

    /// Most recent observation
    pub fn last(&self) -> Option<f64> {
        self.observations.lock().last
    }

    pub fn get_data(&self) -> HistogramData {
        let obs = self.observations.lock();
        let buckets = self
            .bounds
            .iter()
            .zip(&obs.hits)
            .scan(0u64, |running, (bound, hits)| {
                *running += hits;
                Some((*bound, *running))
            })
            .collect();

        HistogramData {
            count: obs.count,
            sum: obs.sum,
            min: obs.min.unwrap_or(0.0),
            max: obs.max.unwrap_or(0.0),
            last: obs.last,
            buckets,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Metric for Histogram {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> MetricValue {
        MetricValue::Histogram(self.get_data())
    }

    fn reset(&self) {
        let mut obs = self.observations.lock();
        *obs = Observations {
            hits: vec![0; self.bounds.len() + 1],
            ..Default::default()
        };
    }
}

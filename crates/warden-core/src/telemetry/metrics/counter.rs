//! Counter metrics - monotonically increasing values

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::{Metric, MetricValue};

#[derive(Debug)]
pub struct Counter {
    name: String,
    value: AtomicU64,
    description: String,
}

impl Counter {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AtomicU64::new(0),
            description: description.into(),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Metric for Counter {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> MetricValue {
        MetricValue::Counter { total: self.get() }
    }

    fn reset(&self) {
        self.value.store(0, Ordering::Relaxed);
    }
}

/// Counter with one series per combination of `N` label values
#[derive(Debug)]
pub struct LabeledCounter<const N: usize> {
    name: String,
    description: String,
    label_names: [String; N],
    counters: RwLock<HashMap<[String; N], AtomicU64>>,
}

impl<const N: usize> LabeledCounter<N> {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        label_names: [impl Into<String>; N],
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            label_names: label_names.map(|s| s.into()),
            counters: RwLock::new(HashMap::new()),
        }
    }

    pub fn inc(&self, labels: [impl Into<String>; N]) {
        self.inc_by(labels, 1);
    }

    pub fn inc_by(&self, labels: [impl Into<String>; N], n: u64) {
        let labels: [String; N] = labels.map(|s| s.into());
        if let Some(counter) = self.counters.read().get(&labels) {
            counter.fetch_add(n, Ordering::Relaxed);
            return;
        }
        self.counters
            .write()
            .entry(labels)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(n, Ordering::Relaxed);
    }

    /// Value of one series, zero when it was never incremented
    pub fn get(&self, labels: [&str; N]) -> u64 {
        let labels: [String; N] = labels.map(str::to_string);
        self.counters
            .read()
            .get(&labels)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Sum across every series
    pub fn total(&self) -> u64 {
        self.counters
            .read()
            .values()
            .map(|c| c.load(Ordering::Relaxed))
            .sum()
    }

    pub fn get_all(&self) -> Vec<([String; N], u64)> {
        self.counters
            .read()
            .iter()
            .map(|(labels, counter)| (labels.clone(), counter.load(Ordering::Relaxed)))
            .collect()
    }

    /// Series keyed by their label values joined with `/`
    pub fn to_map(&self) -> BTreeMap<String, u64> {
        self.get_all()
            .into_iter()
            .map(|(labels, value)| (labels.join("/"), value))
            .collect()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn label_names(&self) -> &[String; N] {
        &self.label_names
    }
}

impl<const N: usize> Metric for LabeledCounter<N> {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> MetricValue {
        MetricValue::Labeled {
            series: self.to_map(),
        }
    }

    fn reset(&self) {
        self.counters.write().clear();
    }
}

//! Per-request token usage records and their distribution

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{WardenError, WardenResult};

/// `mode` of requests answered from a capability tool route
pub const TOOL_ROUTE_MODE: &str = "mcp";
/// `mode` of requests served by executing generated code
pub const CODE_EXECUTION_MODE: &str = "code_execution";

/// One request's token accounting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub timestamp: DateTime<Utc>,
    pub session_id: Option<String>,
    pub operation: String,
    pub mode: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub latency_ms: f64,
    pub success: bool,
    pub error: Option<String>,
}

impl TokenUsage {
    pub fn new(
        operation: impl Into<String>,
        mode: impl Into<String>,
        input_tokens: u64,
        output_tokens: u64,
        latency_ms: f64,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            session_id: None,
            operation: operation.into(),
            mode: mode.into(),
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            latency_ms,
            success: true,
            error: None,
        }
    }

    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }

    pub fn cost(&self, cost_per_token: f64) -> f64 {
        self.total_tokens as f64 * cost_per_token
    }
}

/// Order statistics of one series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub min: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub max: f64,
    pub mean: f64,
}

impl Distribution {
    /// Nearest-rank percentiles; p95 and p99 fall back to the maximum on
    /// samples too small to resolve them (up to 20 and 100 values)
    pub fn from_values(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.total_cmp(b));
        let n = values.len();
        let max = values[n - 1];

        Some(Self {
            min: values[0],
            p50: values[n / 2],
            p95: if n > 20 { values[n * 95 / 100] } else { max },
            p99: if n > 100 { values[n * 99 / 100] } else { max },
            max,
            mean: values.iter().sum::<f64>() / n as f64,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsagePercentiles {
    pub sample_size: usize,
    pub tokens: Option<Distribution>,
    pub latency_ms: Option<Distribution>,
}

impl UsagePercentiles {
    fn of<'a>(records: impl Iterator<Item = &'a TokenUsage> + Clone) -> Self {
        Self {
            sample_size: records.clone().count(),
            tokens: Distribution::from_values(records.clone().map(|u| u.total_tokens as f64).collect()),
            latency_ms: Distribution::from_values(records.map(|u| u.latency_ms).collect()),
        }
    }
}

/// Usage records kept in memory and optionally appended to a JSON-lines file
#[derive(Debug)]
pub struct UsageLog {
    path: Option<PathBuf>,
    records: Mutex<Vec<TokenUsage>>,
}

impl UsageLog {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(None)
    }

    /// Log appending to `path`, seeded with the records already in it
    ///
    /// A missing file is an empty log; a malformed line is an error.
    pub fn load(path: impl Into<PathBuf>) -> WardenResult<Self> {
        let path = path.into();
        let records = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| WardenError::io_with_path(e.to_string(), path.display().to_string()))?;
            content
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| serde_json::from_str(line).map_err(WardenError::from))
                .collect::<WardenResult<Vec<TokenUsage>>>()?
        } else {
            Vec::new()
        };

        Ok(Self {
            path: Some(path),
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one record; the line is written with a single `write_all`
    pub fn record(&self, usage: TokenUsage) -> WardenResult<()> {
        let mut records = self.records.lock();
        if let Some(path) = &self.path {
            let mut line = serde_json::to_vec(&usage)?;
            line.push(b'\n');

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    WardenError::io_with_path(e.to_string(), parent.display().to_string())
                })?;
            }
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .and_then(|mut file| file.write_all(&line))
                .map_err(|e| WardenError::io_with_path(e.to_string(), path.display().to_string()))?;
        }
        records.push(usage);
        Ok(())
    }

    pub fn records(&self) -> Vec<TokenUsage> {
        self.records.lock().clone()
    }

    pub fn percentiles(&self) -> UsagePercentiles {
        let records = self.records.lock();
        UsagePercentiles::of(records.iter())
    }

    pub fn percentiles_by_mode(&self) -> BTreeMap<String, UsagePercentiles> {
        let records = self.records.lock();
        let mut modes: Vec<&str> = records.iter().map(|u| u.mode.as_str()).collect();
        modes.sort_unstable();
        modes.dedup();

        modes
            .into_iter()
            .map(|mode| {
                let stats = UsagePercentiles::of(records.iter().filter(move |u| u.mode == mode));
                (mode.to_string(), stats)
            })
            .collect()
    }
}

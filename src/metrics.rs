use crate::cli::{Operation, Protocol};
use crate::error::{ErrorKind, OperationError};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Aggregation bucket key: one protocol exercising one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub protocol: Protocol,
    pub operation: Operation,
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.protocol, self.operation)
    }
}

/// Outcome of a single timed API call. Immutable once constructed.
///
/// The timer reading is recorded for failures as well as successes; whether a
/// sample contributes to the latency statistics is decided at aggregation
/// time, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestResult {
    pub protocol: Protocol,
    pub operation: Operation,
    pub response_time_ms: f64,
    pub payload_size_bytes: u64,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
}

impl RequestResult {
    pub fn success(
        protocol: Protocol,
        operation: Operation,
        response_time_ms: f64,
        payload_size_bytes: u64,
    ) -> Self {
        Self {
            protocol,
            operation,
            response_time_ms,
            payload_size_bytes,
            timestamp: Utc::now(),
            success: true,
            error_kind: None,
            error_message: None,
        }
    }

    pub fn failure(
        protocol: Protocol,
        operation: Operation,
        response_time_ms: f64,
        error: OperationError,
    ) -> Self {
        Self {
            protocol,
            operation,
            response_time_ms,
            payload_size_bytes: 0,
            timestamp: Utc::now(),
            success: false,
            error_kind: Some(error.kind),
            error_message: Some(error.message),
        }
    }

    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            protocol: self.protocol,
            operation: self.operation,
        }
    }
}

/// Summary statistics for one (protocol, operation) group.
///
/// Derived from the raw sample list; latency and payload fields are computed
/// over successful calls only and reported as absent when the group has none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub protocol: Protocol,
    pub operation: Operation,
    pub count: usize,
    pub successes: usize,
    pub failures: usize,
    pub success_rate: f64,
    pub avg_response_time_ms: Option<f64>,
    pub min_response_time_ms: Option<f64>,
    pub max_response_time_ms: Option<f64>,
    pub median_response_time_ms: Option<f64>,
    pub p95_response_time_ms: Option<f64>,
    pub p99_response_time_ms: Option<f64>,
    pub stddev_response_time_ms: Option<f64>,
    pub avg_payload_size_bytes: Option<f64>,
    pub total_bytes: u64,
    pub throughput_rps: f64,
    pub data_transfer_rate_bps: f64,
    pub network_efficiency_bytes_per_ms: Option<f64>,
    pub errors: BTreeMap<String, usize>,
    pub wall_clock_secs: f64,
}

impl AggregateStats {
    /// Derive statistics from a raw sample list.
    ///
    /// Pure and idempotent: the same samples and wall-clock duration always
    /// produce the same statistics. Percentiles use the nearest-rank method,
    /// `index = ceil(p/100 * n) - 1` clamped to `[0, n-1]`, over the sorted
    /// response times of successful calls.
    pub fn from_samples(key: GroupKey, samples: &[RequestResult], wall_clock: Duration) -> Self {
        let count = samples.len();
        let succeeded: Vec<&RequestResult> = samples.iter().filter(|r| r.success).collect();
        let successes = succeeded.len();
        let failures = count - successes;
        let success_rate = if count > 0 {
            successes as f64 / count as f64 * 100.0
        } else {
            0.0
        };

        let mut errors: BTreeMap<String, usize> = BTreeMap::new();
        for result in samples.iter().filter(|r| !r.success) {
            let kind = result.error_kind.unwrap_or(ErrorKind::Unknown);
            *errors.entry(kind.to_string()).or_insert(0) += 1;
        }

        let mut times: Vec<f64> = succeeded.iter().map(|r| r.response_time_ms).collect();
        times.sort_by(|a, b| a.total_cmp(b));

        let (avg, min, max, median, p95, p99, stddev) = if times.is_empty() {
            (None, None, None, None, None, None, None)
        } else {
            let avg = times.iter().sum::<f64>() / times.len() as f64;
            let stddev = if times.len() > 1 {
                let variance = times.iter().map(|t| (t - avg).powi(2)).sum::<f64>()
                    / (times.len() - 1) as f64;
                variance.sqrt()
            } else {
                0.0
            };
            (
                Some(avg),
                Some(times[0]),
                Some(times[times.len() - 1]),
                Some(nearest_rank(&times, 50.0)),
                Some(nearest_rank(&times, 95.0)),
                Some(nearest_rank(&times, 99.0)),
                Some(stddev),
            )
        };

        let total_bytes: u64 = succeeded.iter().map(|r| r.payload_size_bytes).sum();
        let avg_payload = if successes > 0 {
            Some(total_bytes as f64 / successes as f64)
        } else {
            None
        };

        let secs = wall_clock.as_secs_f64();
        let throughput_rps = if secs > 0.0 {
            successes as f64 / secs
        } else {
            0.0
        };
        let data_transfer_rate_bps = if secs > 0.0 {
            total_bytes as f64 / secs
        } else {
            0.0
        };
        let network_efficiency = match (avg_payload, avg) {
            (Some(payload), Some(avg_ms)) if avg_ms > 0.0 => Some(payload / avg_ms),
            _ => None,
        };

        Self {
            protocol: key.protocol,
            operation: key.operation,
            count,
            successes,
            failures,
            success_rate,
            avg_response_time_ms: avg,
            min_response_time_ms: min,
            max_response_time_ms: max,
            median_response_time_ms: median,
            p95_response_time_ms: p95,
            p99_response_time_ms: p99,
            stddev_response_time_ms: stddev,
            avg_payload_size_bytes: avg_payload,
            total_bytes,
            throughput_rps,
            data_transfer_rate_bps,
            network_efficiency_bytes_per_ms: network_efficiency,
            errors,
            wall_clock_secs: secs,
        }
    }
}

/// Nearest-rank percentile over a sorted, non-empty sample list.
fn nearest_rank(sorted: &[f64], percentile: f64) -> f64 {
    let n = sorted.len();
    let index = ((percentile / 100.0 * n as f64).ceil() as usize)
        .saturating_sub(1)
        .min(n - 1);
    sorted[index]
}

/// Per-group sample store for one benchmark run.
///
/// Appends are safe under concurrent writers; sample lists are bounded by the
/// configured request count, so nothing is ever evicted.
#[derive(Debug, Default)]
pub struct MetricRecorder {
    groups: Mutex<BTreeMap<GroupKey, Vec<RequestResult>>>,
}

impl MetricRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a result to its group, preserving arrival order.
    pub fn append(&self, result: RequestResult) {
        let key = result.group_key();
        self.groups.lock().entry(key).or_default().push(result);
    }

    /// All group keys with at least one sample, in stable order.
    pub fn group_keys(&self) -> Vec<GroupKey> {
        self.groups.lock().keys().copied().collect()
    }

    /// Snapshot of one group's samples in arrival order.
    pub fn samples(&self, key: &GroupKey) -> Vec<RequestResult> {
        self.groups.lock().get(key).cloned().unwrap_or_default()
    }

    /// Total number of samples across all groups.
    pub fn total_samples(&self) -> usize {
        self.groups.lock().values().map(Vec::len).sum()
    }

    /// Drop all samples.
    pub fn clear(&self) {
        self.groups.lock().clear();
    }

    /// Compute summary statistics for one group; `None` for unknown groups.
    pub fn compute_stats(&self, key: &GroupKey, wall_clock: Duration) -> Option<AggregateStats> {
        let groups = self.groups.lock();
        let samples = groups.get(key)?;
        Some(AggregateStats::from_samples(*key, samples, wall_clock))
    }
}

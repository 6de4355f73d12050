use crate::cli::Operation;
use crate::metrics::AggregateStats;
use serde::{Deserialize, Serialize};

/// Whether a smaller or a larger value wins a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    LowerIsBetter,
    HigherIsBetter,
}

/// The closed set of metrics the comparison engine ranks groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    AvgResponseTime,
    MedianResponseTime,
    P95ResponseTime,
    P99ResponseTime,
    AvgPayloadSize,
    SuccessRate,
    Throughput,
    NetworkEfficiency,
}

impl MetricKind {
    pub const ALL: [MetricKind; 8] = [
        MetricKind::AvgResponseTime,
        MetricKind::MedianResponseTime,
        MetricKind::P95ResponseTime,
        MetricKind::P99ResponseTime,
        MetricKind::AvgPayloadSize,
        MetricKind::SuccessRate,
        MetricKind::Throughput,
        MetricKind::NetworkEfficiency,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::AvgResponseTime => "Avg Response Time",
            MetricKind::MedianResponseTime => "Median Response Time",
            MetricKind::P95ResponseTime => "P95 Response Time",
            MetricKind::P99ResponseTime => "P99 Response Time",
            MetricKind::AvgPayloadSize => "Avg Payload Size",
            MetricKind::SuccessRate => "Success Rate",
            MetricKind::Throughput => "Throughput",
            MetricKind::NetworkEfficiency => "Network Efficiency",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            MetricKind::AvgResponseTime
            | MetricKind::MedianResponseTime
            | MetricKind::P95ResponseTime
            | MetricKind::P99ResponseTime => "ms",
            MetricKind::AvgPayloadSize => "bytes",
            MetricKind::SuccessRate => "%",
            MetricKind::Throughput => "req/s",
            MetricKind::NetworkEfficiency => "bytes/ms",
        }
    }

    /// Latency-type metrics and payload size are minimized; rates are
    /// maximized.
    pub fn direction(&self) -> Direction {
        match self {
            MetricKind::AvgResponseTime
            | MetricKind::MedianResponseTime
            | MetricKind::P95ResponseTime
            | MetricKind::P99ResponseTime
            | MetricKind::AvgPayloadSize => Direction::LowerIsBetter,
            MetricKind::SuccessRate | MetricKind::Throughput | MetricKind::NetworkEfficiency => {
                Direction::HigherIsBetter
            }
        }
    }

    pub fn extract(&self, stats: &AggregateStats) -> Option<f64> {
        match self {
            MetricKind::AvgResponseTime => stats.avg_response_time_ms,
            MetricKind::MedianResponseTime => stats.median_response_time_ms,
            MetricKind::P95ResponseTime => stats.p95_response_time_ms,
            MetricKind::P99ResponseTime => stats.p99_response_time_ms,
            MetricKind::AvgPayloadSize => stats.avg_payload_size_bytes,
            MetricKind::SuccessRate => Some(stats.success_rate),
            MetricKind::Throughput => Some(stats.throughput_rps),
            MetricKind::NetworkEfficiency => stats.network_efficiency_bytes_per_ms,
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One comparison row: a metric, a baseline value, and one contender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricComparison {
    pub metric: MetricKind,
    pub baseline: String,
    pub baseline_value: Option<f64>,
    pub contender: String,
    pub contender_value: Option<f64>,
    pub winner: String,
    pub diff_pct: Option<f64>,
}

/// All comparison rows for groups sharing one operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationComparison {
    pub operation: Operation,
    pub baseline: String,
    pub rows: Vec<MetricComparison>,
}

/// Derives relative differences and winners from aggregate statistics.
/// Purely computational; it mutates nothing.
pub struct ComparisonEngine;

impl ComparisonEngine {
    /// Compare two or more groups sharing an operation.
    ///
    /// The first group is the baseline; `diff_pct = (other - baseline) /
    /// baseline * 100` and is absent when the baseline value is zero or
    /// either side has no value. Exact ties go to the baseline group.
    /// Returns `None` when fewer than two groups are given.
    pub fn compare(operation: Operation, groups: &[&AggregateStats]) -> Option<OperationComparison> {
        let (baseline, contenders) = groups.split_first()?;
        if contenders.is_empty() {
            return None;
        }

        let mut rows = Vec::with_capacity(contenders.len() * MetricKind::ALL.len());
        for contender in contenders {
            for metric in MetricKind::ALL {
                rows.push(Self::compare_metric(metric, baseline, contender));
            }
        }

        Some(OperationComparison {
            operation,
            baseline: baseline.protocol.to_string(),
            rows,
        })
    }

    /// Bucket stats by operation (preserving first-seen order) and compare
    /// every bucket with at least two groups.
    pub fn compare_all(groups: &[AggregateStats]) -> Vec<OperationComparison> {
        let mut by_operation: Vec<(Operation, Vec<&AggregateStats>)> = Vec::new();
        for stats in groups {
            match by_operation
                .iter_mut()
                .find(|(operation, _)| *operation == stats.operation)
            {
                Some((_, bucket)) => bucket.push(stats),
                None => by_operation.push((stats.operation, vec![stats])),
            }
        }

        by_operation
            .into_iter()
            .filter_map(|(operation, bucket)| Self::compare(operation, &bucket))
            .collect()
    }

    fn compare_metric(
        metric: MetricKind,
        baseline: &AggregateStats,
        contender: &AggregateStats,
    ) -> MetricComparison {
        let baseline_value = metric.extract(baseline);
        let contender_value = metric.extract(contender);

        let diff_pct = match (baseline_value, contender_value) {
            (Some(b), Some(c)) if b != 0.0 => Some((c - b) / b * 100.0),
            _ => None,
        };

        // A group with no value for a metric cannot win it
        let winner = match (baseline_value, contender_value) {
            (Some(b), Some(c)) => {
                let contender_wins = match metric.direction() {
                    Direction::LowerIsBetter => c < b,
                    Direction::HigherIsBetter => c > b,
                };
                if contender_wins {
                    contender.protocol.to_string()
                } else {
                    baseline.protocol.to_string()
                }
            }
            (Some(_), None) => baseline.protocol.to_string(),
            (None, Some(_)) => contender.protocol.to_string(),
            (None, None) => baseline.protocol.to_string(),
        };

        MetricComparison {
            metric,
            baseline: baseline.protocol.to_string(),
            baseline_value,
            contender: contender.protocol.to_string(),
            contender_value,
            winner,
            diff_pct,
        }
    }
}

use crate::benchmark::{BenchmarkRun, RunStatus};
use crate::cli::OutputFormat;
use crate::comparison::{ComparisonEngine, OperationComparison};
use crate::metrics::AggregateStats;
use anyhow::Result;
use colored::Colorize;
use serde::{Deserialize, Serialize};

const RULE: &str =
    "================================================================================";

/// Fixed CSV column order for the per-group records.
const GROUP_FIELDS: [&str; 19] = [
    "protocol",
    "operation",
    "count",
    "successes",
    "failures",
    "success_rate",
    "avg_response_time_ms",
    "min_response_time_ms",
    "max_response_time_ms",
    "median_response_time_ms",
    "p95_response_time_ms",
    "p99_response_time_ms",
    "stddev_response_time_ms",
    "avg_payload_size_bytes",
    "total_bytes",
    "throughput_rps",
    "data_transfer_rate_bps",
    "network_efficiency_bytes_per_ms",
    "wall_clock_secs",
];

/// Host information captured for reproducibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub architecture: String,
    pub cpu_cores: usize,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            cpu_cores: num_cpus::get(),
        }
    }
}

/// Run-level metadata carried alongside the statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub suite_version: String,
    pub run_id: uuid::Uuid,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub status: RunStatus,
    pub requests_per_pair: usize,
    pub user_id_range: String,
    pub concurrency_mode: String,
    pub wall_clock_secs: f64,
    pub system_info: SystemInfo,
}

/// Complete benchmark report: metadata, per-group statistics in stable
/// order, and the cross-protocol comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub metadata: ReportMetadata,
    pub groups: Vec<AggregateStats>,
    pub comparison: Vec<OperationComparison>,
}

impl BenchmarkReport {
    /// Assemble a report from a finished (or cancelled) run.
    pub fn from_run(run: &BenchmarkRun) -> Self {
        let wall_clock = run.wall_clock().unwrap_or_default();
        let recorder = run.recorder();

        let groups: Vec<AggregateStats> = recorder
            .group_keys()
            .iter()
            .filter_map(|key| recorder.compute_stats(key, wall_clock))
            .collect();
        let comparison = ComparisonEngine::compare_all(&groups);

        Self {
            metadata: ReportMetadata {
                suite_version: crate::VERSION.to_string(),
                run_id: run.id(),
                timestamp: run.started_at().unwrap_or_else(chrono::Utc::now),
                status: run.status(),
                requests_per_pair: run.config().requests,
                user_id_range: run.config().user_id_range.to_string(),
                concurrency_mode: run.config().mode.to_string(),
                wall_clock_secs: wall_clock.as_secs_f64(),
                system_info: SystemInfo::default(),
            },
            groups,
            comparison,
        }
    }

    /// Render the report in the requested format.
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Console => Ok(self.render_console()),
            OutputFormat::Json => self.render_json(),
            OutputFormat::Csv => Ok(self.render_csv()),
        }
    }

    pub fn render_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn render_console(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!("{}\n", RULE));
        out.push_str(&format!("{}\n", "API BENCHMARK RESULTS".bold()));
        out.push_str(&format!("{}\n", RULE));
        out.push_str(&format!("Run ID:               {}\n", self.metadata.run_id));
        out.push_str(&format!("Status:               {}\n", self.metadata.status));
        out.push_str(&format!(
            "Requests per Pair:    {}\n",
            self.metadata.requests_per_pair
        ));
        out.push_str(&format!(
            "User ID Range:        {}\n",
            self.metadata.user_id_range
        ));
        out.push_str(&format!(
            "Concurrency:          {}\n",
            self.metadata.concurrency_mode
        ));
        out.push_str(&format!(
            "Wall Clock:           {:.2}s\n",
            self.metadata.wall_clock_secs
        ));
        out.push('\n');

        for group in &self.groups {
            self.render_group(&mut out, group);
        }

        for comparison in &self.comparison {
            self.render_comparison(&mut out, comparison);
        }

        out
    }

    fn render_group(&self, out: &mut String, group: &AggregateStats) {
        out.push_str(&format!("{}\n", RULE));
        out.push_str(&format!(
            "{}\n",
            format!("{} / {}", group.protocol, group.operation).bold()
        ));
        out.push_str(&format!("{}\n", RULE));
        out.push_str(&format!(
            "Success Rate:         {:.1}% ({}/{} requests)\n",
            group.success_rate, group.successes, group.count
        ));
        out.push_str(&format!(
            "Average Response:     {} ms\n",
            fmt_opt(group.avg_response_time_ms, 2)
        ));
        out.push_str(&format!(
            "Median Response:      {} ms\n",
            fmt_opt(group.median_response_time_ms, 2)
        ));
        out.push_str(&format!(
            "P95 Response:         {} ms\n",
            fmt_opt(group.p95_response_time_ms, 2)
        ));
        out.push_str(&format!(
            "P99 Response:         {} ms\n",
            fmt_opt(group.p99_response_time_ms, 2)
        ));
        out.push_str(&format!(
            "Min Response:         {} ms\n",
            fmt_opt(group.min_response_time_ms, 2)
        ));
        out.push_str(&format!(
            "Max Response:         {} ms\n",
            fmt_opt(group.max_response_time_ms, 2)
        ));
        out.push_str(&format!(
            "Std Deviation:        {} ms\n",
            fmt_opt(group.stddev_response_time_ms, 2)
        ));
        out.push_str(&format!(
            "Avg Payload Size:     {} bytes\n",
            fmt_opt(group.avg_payload_size_bytes, 0)
        ));
        out.push_str(&format!(
            "Total Transferred:    {} bytes\n",
            group.total_bytes
        ));
        out.push_str(&format!(
            "Throughput:           {:.1} req/s\n",
            group.throughput_rps
        ));
        out.push_str(&format!(
            "Transfer Rate:        {:.1} bytes/s\n",
            group.data_transfer_rate_bps
        ));
        out.push_str(&format!(
            "Network Efficiency:   {} bytes/ms\n",
            fmt_opt(group.network_efficiency_bytes_per_ms, 2)
        ));

        if group.failures > 0 {
            out.push_str(&format!("Failed Requests:      {}\n", group.failures));
            out.push_str("Errors:\n");
            for (kind, count) in &group.errors {
                out.push_str(&format!("  - {}: {}\n", kind, count));
            }
        }
        out.push('\n');
    }

    fn render_comparison(&self, out: &mut String, comparison: &OperationComparison) {
        out.push_str(&format!("{}\n", RULE));
        out.push_str(&format!(
            "{}\n",
            format!(
                "COMPARISON - {} (baseline: {})",
                comparison.operation, comparison.baseline
            )
            .bold()
        ));
        out.push_str(&format!("{}\n", RULE));
        out.push_str(&format!(
            "{:<30} {:>14} {:>14} {:<10} {:>10}\n",
            "Metric", "Baseline", "Contender", "Winner", "Diff"
        ));
        out.push_str(&format!("{}\n", "-".repeat(80)));

        let mut current_contender: Option<&str> = None;
        for row in &comparison.rows {
            if current_contender != Some(row.contender.as_str()) {
                if current_contender.is_some() {
                    out.push('\n');
                }
                out.push_str(&format!(
                    "{} vs {}\n",
                    comparison.baseline, row.contender
                ));
                current_contender = Some(row.contender.as_str());
            }

            let label = format!("{} ({})", row.metric.label(), row.metric.unit());
            let diff = row
                .diff_pct
                .map(|d| format!("{:+.1}%", d))
                .unwrap_or_else(|| "-".to_string());
            out.push_str(&format!(
                "{:<30} {:>14} {:>14} {:<10} {:>10}\n",
                label,
                fmt_opt(row.baseline_value, 2),
                fmt_opt(row.contender_value, 2),
                row.winner.green(),
                diff
            ));
        }
        out.push('\n');
    }

    pub fn render_csv(&self) -> String {
        let mut out = String::new();

        out.push_str(&GROUP_FIELDS.join(","));
        out.push('\n');

        for group in &self.groups {
            let fields = [
                group.protocol.to_string(),
                group.operation.to_string(),
                group.count.to_string(),
                group.successes.to_string(),
                group.failures.to_string(),
                format!("{:.2}", group.success_rate),
                csv_opt(group.avg_response_time_ms),
                csv_opt(group.min_response_time_ms),
                csv_opt(group.max_response_time_ms),
                csv_opt(group.median_response_time_ms),
                csv_opt(group.p95_response_time_ms),
                csv_opt(group.p99_response_time_ms),
                csv_opt(group.stddev_response_time_ms),
                csv_opt(group.avg_payload_size_bytes),
                group.total_bytes.to_string(),
                format!("{:.2}", group.throughput_rps),
                format!("{:.2}", group.data_transfer_rate_bps),
                csv_opt(group.network_efficiency_bytes_per_ms),
                format!("{:.3}", group.wall_clock_secs),
            ];
            out.push_str(&fields.join(","));
            out.push('\n');
        }

        out.push('\n');
        out.push_str(
            "operation,metric,baseline,baseline_value,contender,contender_value,winner,diff_pct\n",
        );
        for comparison in &self.comparison {
            for row in &comparison.rows {
                let fields = [
                    comparison.operation.to_string(),
                    row.metric.label().to_string(),
                    row.baseline.clone(),
                    csv_opt(row.baseline_value),
                    row.contender.clone(),
                    csv_opt(row.contender_value),
                    row.winner.clone(),
                    row.diff_pct
                        .map(|d| format!("{:.2}", d))
                        .unwrap_or_default(),
                ];
                out.push_str(&fields.join(","));
                out.push('\n');
            }
        }

        out
    }
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "-".to_string(),
    }
}

fn csv_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_default()
}

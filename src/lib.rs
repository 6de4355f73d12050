//! # API Benchmark Suite Library
//!
//! A benchmark suite comparing REST, gRPC, and GraphQL implementations of
//! the same CRUD operation set. The library times repeated calls against
//! pluggable protocol adapters, tolerates per-call failure without aborting
//! a run, and aggregates the samples into comparable statistics.
//!
//! ## Supported Protocols
//!
//! - **REST**: JSON over HTTP against the `/api/users` routes
//! - **gRPC**: unary calls against the `UserService` contract
//! - **GraphQL**: query/mutation documents POSTed to a single endpoint
//!
//! Every protocol implements the same six operations: getUser, listUsers,
//! createUser, getUserOrders, searchUsers, and bulkCreateUsers.
//!
//! ## Architecture Overview
//!
//! - `benchmark`: run lifecycle, sequential/worker-pool dispatch, timing
//! - `cli`: command-line surface and protocol/operation/format enums
//! - `protocol`: the `ProtocolAdapter` trait and its implementations
//! - `metrics`: per-group sample store and derived statistics
//! - `comparison`: per-metric relative differences and winners
//! - `results`: report assembly and console/JSON/CSV rendering
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use api_benchmark::benchmark::{
//!     BenchmarkConfig, BenchmarkRun, BenchmarkRunner, ConcurrencyMode,
//! };
//! use api_benchmark::cli::{Operation, Protocol, UserIdRange};
//! use api_benchmark::protocol::{AdapterRegistry, MockAdapter};
//! use api_benchmark::results::BenchmarkReport;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BenchmarkConfig {
//!         protocols: vec![Protocol::Rest],
//!         operations: vec![Operation::GetUser],
//!         requests: 100,
//!         mode: ConcurrencyMode::Parallel { workers: 10 },
//!         call_timeout: Some(Duration::from_secs(30)),
//!         user_id_range: UserIdRange { min: 1, max: 10_000 },
//!     };
//!
//!     let mut registry = AdapterRegistry::new();
//!     registry.register(Arc::new(
//!         MockAdapter::new(Protocol::Rest).with_latency(Duration::from_millis(5)),
//!     ));
//!
//!     let mut run = BenchmarkRun::new(config)?;
//!     BenchmarkRunner::new(registry).execute(&mut run).await?;
//!
//!     let report = BenchmarkReport::from_run(&run);
//!     println!("{}", report.render_console());
//!     Ok(())
//! }
//! ```

/// Core benchmarking engine
///
/// Contains `BenchmarkRunner`, `BenchmarkRun`, and `BenchmarkConfig`. The
/// runner drives the complete lifecycle: task construction, sequential or
/// worker-pool dispatch, per-call timing, cancellation, and final status.
pub mod benchmark;

/// Command-line interface and configuration
///
/// Argument parsing with clap, the `Protocol`/`Operation`/`OutputFormat`
/// enumerations with `all` expansion, and input parsers for user-id ranges
/// and human-readable timeouts.
pub mod cli;

/// Cross-protocol comparison
///
/// Computes per-metric relative differences against a baseline group and
/// picks a winner per metric.
pub mod comparison;

/// Typed error taxonomy
///
/// `OperationError` classifies individual call failures; `BenchmarkError`
/// covers configuration, connectivity, and run-state problems.
pub mod error;

/// Logging setup for the CLI binary
pub mod logging;

/// Sample collection and statistical aggregation
///
/// `MetricRecorder` retains raw per-group samples; `AggregateStats` derives
/// averages, nearest-rank percentiles, success rates, and throughput.
pub mod metrics;

/// Protocol adapter abstractions and implementations
///
/// The `ProtocolAdapter` trait plus REST, gRPC, GraphQL, and mock adapters
/// behind an `AdapterRegistry` lookup table.
pub mod protocol;

/// Report assembly and output formatting
pub mod results;

// Re-export key types for convenient library usage

/// Main benchmark execution engine
pub use benchmark::{BenchmarkConfig, BenchmarkRun, BenchmarkRunner, RunStatus};

/// Command-line interface types
pub use cli::{Args, Operation, OutputFormat, Protocol};

/// Comparison engine
pub use comparison::ComparisonEngine;

/// Error taxonomy
pub use error::{BenchmarkError, ErrorKind, OperationError};

/// Aggregation types
pub use metrics::{AggregateStats, GroupKey, MetricRecorder, RequestResult};

/// Adapter abstractions
pub use protocol::{AdapterRegistry, ProtocolAdapter};

/// Report type
pub use results::BenchmarkReport;

/// The current version of the benchmark suite
///
/// Populated from Cargo.toml and embedded in report metadata for
/// reproducibility.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    /// Default user ID sampling range
    pub const USER_ID_RANGE: &str = "1-10000";

    /// Default worker count for parallel dispatch
    ///
    /// Matches the thread-pool width commonly used for API load generation;
    /// high enough to keep request pipelines full against local targets.
    pub const WORKERS: usize = 100;

    /// Default REST server base URL
    pub const REST_URL: &str = "http://localhost:8080";

    /// Default gRPC server address
    pub const GRPC_URL: &str = "http://localhost:9090";

    /// Default GraphQL endpoint URL
    pub const GRAPHQL_URL: &str = "http://localhost:8081/graphql";
}

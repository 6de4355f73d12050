//! # API Benchmark Suite - Main Entry Point
//!
//! Orchestrates a complete benchmark session:
//!
//! 1. **Initialize logging**: structured logging with tracing, to stderr
//! 2. **Parse arguments**: command-line configuration via clap
//! 3. **Build adapters**: one adapter per requested protocol, selected once
//! 4. **Pre-flight check**: every target must answer before any call is
//!    dispatched
//! 5. **Run the benchmark**: sequential or worker-pool dispatch with
//!    per-call failure isolation
//! 6. **Render the report**: console, JSON, or CSV on stdout
//!
//! Per-call failures never fail the process; the exit status is non-zero
//! only for configuration errors, unreachable targets, or a failed run.

use anyhow::{Context, Result};
use api_benchmark::{
    benchmark::{BenchmarkConfig, BenchmarkRun, BenchmarkRunner},
    cli::Args,
    error::BenchmarkError,
    logging,
    protocol::{AdapterRegistry, TargetConfig},
    results::BenchmarkReport,
};
use clap::Parser;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Log level can always be overridden via RUST_LOG
    let _log_guard = logging::init_logging(args.verbose, args.quiet, args.log_file.as_deref())?;

    info!("Starting API Benchmark Suite");

    let config = BenchmarkConfig::from_args(&args).context("invalid benchmark configuration")?;

    let targets = TargetConfig {
        rest_url: args.rest_url.clone(),
        grpc_url: args.grpc_url.clone(),
        graphql_url: args.graphql_url.clone(),
    };
    let registry = AdapterRegistry::for_targets(&config.protocols, &targets)?;

    preflight(&registry).await?;

    let mut run = BenchmarkRun::new(config)?;

    // Ctrl-C stops new dispatch; in-flight calls finish and the partial
    // report is still rendered
    let cancel = run.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Cancellation requested; letting in-flight calls finish");
            cancel.cancel();
        }
    });

    let runner = BenchmarkRunner::new(registry);
    runner.execute(&mut run).await?;

    let report = BenchmarkReport::from_run(&run);
    println!("{}", report.render(args.output)?);

    info!("API Benchmark Suite completed");
    Ok(())
}

/// Probe every configured target before dispatching benchmark traffic.
///
/// All adapters are probed even after the first failure so the operator
/// sees the full picture in one pass.
async fn preflight(registry: &AdapterRegistry) -> Result<()> {
    info!("Checking target connectivity...");

    let mut unreachable = Vec::new();
    for adapter in registry.adapters() {
        match adapter.check_ready().await {
            Ok(()) => info!("{} target: OK", adapter.protocol()),
            Err(err) => {
                error!("{} target: FAILED - {}", adapter.protocol(), err);
                unreachable.push(format!("{}: {}", adapter.protocol(), err));
            }
        }
    }

    if unreachable.is_empty() {
        Ok(())
    } else {
        Err(BenchmarkError::Connectivity(unreachable.join("; ")).into())
    }
}

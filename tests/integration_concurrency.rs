use anyhow::Result;
use api_benchmark::benchmark::{
    BenchmarkConfig, BenchmarkRun, BenchmarkRunner, ConcurrencyMode, RunStatus,
};
use api_benchmark::cli::{Operation, Protocol, UserIdRange};
use api_benchmark::metrics::GroupKey;
use api_benchmark::protocol::{AdapterRegistry, MockAdapter};
use std::sync::Arc;
use std::time::Duration;

const TASKS: usize = 1000;

async fn run_with_workers(workers: usize) -> Result<BenchmarkRun> {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(
        MockAdapter::new(Protocol::Rest).with_latency(Duration::from_millis(5)),
    ));

    let config = BenchmarkConfig {
        protocols: vec![Protocol::Rest],
        operations: vec![Operation::GetUser],
        requests: TASKS,
        mode: ConcurrencyMode::Parallel { workers },
        call_timeout: None,
        user_id_range: UserIdRange { min: 1, max: 10_000 },
    };

    let mut run = BenchmarkRun::new(config)?;
    BenchmarkRunner::new(registry).execute(&mut run).await?;
    Ok(run)
}

fn assert_exact_task_count(run: &BenchmarkRun) {
    assert_eq!(run.status(), RunStatus::Completed);

    let key = GroupKey {
        protocol: Protocol::Rest,
        operation: Operation::GetUser,
    };
    let samples = run.recorder().samples(&key);
    assert_eq!(samples.len(), TASKS, "no duplicated or lost tasks");
    assert!(samples.iter().all(|s| s.success));
}

/// Every submitted task produces exactly one result, for a single worker...
#[tokio::test]
async fn worker_pool_of_one_produces_exact_results() -> Result<()> {
    let run = run_with_workers(1).await?;
    assert_exact_task_count(&run);
    Ok(())
}

/// ...for a small pool...
#[tokio::test]
async fn worker_pool_of_ten_produces_exact_results() -> Result<()> {
    let run = run_with_workers(10).await?;
    assert_exact_task_count(&run);
    Ok(())
}

/// ...and for a pool wider than most schedulers will run at once.
#[tokio::test]
async fn worker_pool_of_hundred_produces_exact_results() -> Result<()> {
    let run = run_with_workers(100).await?;
    assert_exact_task_count(&run);
    Ok(())
}

/// Wider pools must not take longer than narrow ones for the same task
/// count; this guards against accidental serialization in the queue.
#[tokio::test]
async fn wider_pool_is_not_slower() -> Result<()> {
    let narrow = run_with_workers(10).await?;
    let wide = run_with_workers(100).await?;

    let narrow_secs = narrow.wall_clock().unwrap().as_secs_f64();
    let wide_secs = wide.wall_clock().unwrap().as_secs_f64();

    // Generous factor: scheduling noise must not flake this on CI
    assert!(
        wide_secs < narrow_secs * 3.0,
        "100 workers took {wide_secs}s vs {narrow_secs}s with 10"
    );
    Ok(())
}

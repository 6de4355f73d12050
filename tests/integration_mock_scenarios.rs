use anyhow::Result;
use api_benchmark::benchmark::{
    BenchmarkConfig, BenchmarkRun, BenchmarkRunner, ConcurrencyMode, RunStatus,
};
use api_benchmark::cli::{Operation, Protocol, UserIdRange};
use api_benchmark::error::ErrorKind;
use api_benchmark::metrics::GroupKey;
use api_benchmark::protocol::{AdapterRegistry, MockAdapter};
use std::sync::Arc;
use std::time::Duration;

fn config(requests: usize, mode: ConcurrencyMode) -> BenchmarkConfig {
    BenchmarkConfig {
        protocols: vec![Protocol::Rest],
        operations: vec![Operation::GetUser],
        requests,
        mode,
        call_timeout: None,
        user_id_range: UserIdRange { min: 1, max: 10_000 },
    }
}

fn registry_with(adapter: MockAdapter) -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(adapter));
    registry
}

/// Ten calls against a 5ms/100-byte mock: every call succeeds, the average
/// sits near 5ms, and the payload average is exact.
#[tokio::test]
async fn fixed_latency_mock_produces_expected_stats() -> Result<()> {
    let registry = registry_with(
        MockAdapter::new(Protocol::Rest)
            .with_latency(Duration::from_millis(5))
            .with_payload_size(100),
    );

    let mut run = BenchmarkRun::new(config(10, ConcurrencyMode::Sequential))?;
    BenchmarkRunner::new(registry).execute(&mut run).await?;

    assert_eq!(run.status(), RunStatus::Completed);

    let key = GroupKey {
        protocol: Protocol::Rest,
        operation: Operation::GetUser,
    };
    let stats = run
        .recorder()
        .compute_stats(&key, run.wall_clock().unwrap())
        .expect("group stats");

    assert_eq!(stats.count, 10);
    assert_eq!(stats.successes, 10);
    assert!((stats.success_rate - 100.0).abs() < 1e-9);
    assert_eq!(stats.avg_payload_size_bytes, Some(100.0));

    // Timer readings include scheduling jitter on top of the scripted 5ms
    let avg = stats.avg_response_time_ms.unwrap();
    assert!(avg >= 5.0, "average {avg}ms below scripted latency");
    assert!(avg < 50.0, "average {avg}ms implausibly high");

    let min = stats.min_response_time_ms.unwrap();
    let max = stats.max_response_time_ms.unwrap();
    assert!(min <= avg && avg <= max);
    Ok(())
}

/// Two scripted Transport failures out of ten calls: the run completes,
/// success rate is exactly 80, and the error breakdown counts both.
#[tokio::test]
async fn scripted_failures_do_not_abort_the_run() -> Result<()> {
    let registry = registry_with(
        MockAdapter::new(Protocol::Rest).failing_on([3, 7], ErrorKind::Transport),
    );

    let mut run = BenchmarkRun::new(config(10, ConcurrencyMode::Sequential))?;
    BenchmarkRunner::new(registry).execute(&mut run).await?;

    assert_eq!(run.status(), RunStatus::Completed);

    let key = GroupKey {
        protocol: Protocol::Rest,
        operation: Operation::GetUser,
    };
    let stats = run
        .recorder()
        .compute_stats(&key, run.wall_clock().unwrap())
        .expect("group stats");

    assert_eq!(stats.count, 10);
    assert_eq!(stats.successes, 8);
    assert_eq!(stats.failures, 2);
    assert!((stats.success_rate - 80.0).abs() < 1e-9);
    assert_eq!(stats.errors.get("Transport"), Some(&2));
    Ok(())
}

/// A per-call timeout converts slow calls into Timeout failures without
/// touching the rest of the run.
#[tokio::test]
async fn slow_calls_become_timeout_failures() -> Result<()> {
    let registry = registry_with(
        MockAdapter::new(Protocol::Rest).with_latency(Duration::from_millis(50)),
    );

    let mut cfg = config(3, ConcurrencyMode::Sequential);
    cfg.call_timeout = Some(Duration::from_millis(5));

    let mut run = BenchmarkRun::new(cfg)?;
    BenchmarkRunner::new(registry).execute(&mut run).await?;

    assert_eq!(run.status(), RunStatus::Completed);

    let key = GroupKey {
        protocol: Protocol::Rest,
        operation: Operation::GetUser,
    };
    let stats = run
        .recorder()
        .compute_stats(&key, run.wall_clock().unwrap())
        .expect("group stats");

    assert_eq!(stats.count, 3);
    assert_eq!(stats.successes, 0);
    assert_eq!(stats.errors.get("Timeout"), Some(&3));
    // Latency fields are absent, not garbage
    assert_eq!(stats.avg_response_time_ms, None);
    Ok(())
}

/// Sequential mode produces results in request order.
#[tokio::test]
async fn sequential_mode_preserves_request_order() -> Result<()> {
    let registry = registry_with(MockAdapter::new(Protocol::Rest));

    let mut run = BenchmarkRun::new(config(50, ConcurrencyMode::Sequential))?;
    BenchmarkRunner::new(registry).execute(&mut run).await?;

    let key = GroupKey {
        protocol: Protocol::Rest,
        operation: Operation::GetUser,
    };
    let samples = run.recorder().samples(&key);
    assert_eq!(samples.len(), 50);
    for pair in samples.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
    Ok(())
}

/// Multiple protocols and operations land in their own groups with no
/// cross-talk.
#[tokio::test]
async fn every_result_lands_in_exactly_one_group() -> Result<()> {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(MockAdapter::new(Protocol::Rest).with_payload_size(64)));
    registry.register(Arc::new(MockAdapter::new(Protocol::Grpc).with_payload_size(32)));

    let cfg = BenchmarkConfig {
        protocols: vec![Protocol::Rest, Protocol::Grpc],
        operations: vec![Operation::GetUser, Operation::ListUsers],
        requests: 5,
        mode: ConcurrencyMode::Parallel { workers: 4 },
        call_timeout: None,
        user_id_range: UserIdRange { min: 1, max: 100 },
    };

    let mut run = BenchmarkRun::new(cfg)?;
    BenchmarkRunner::new(registry).execute(&mut run).await?;

    let keys = run.recorder().group_keys();
    assert_eq!(keys.len(), 4);
    for key in keys {
        assert_eq!(run.recorder().samples(&key).len(), 5);
    }
    assert_eq!(run.recorder().total_samples(), 20);
    Ok(())
}

//! # Benchmark Engine Module
//!
//! Core benchmarking engine that orchestrates API performance testing. It
//! owns the complete run lifecycle: configuration validation, task list
//! construction, sequential or worker-pool dispatch, per-call timing, and
//! final status accounting.
//!
//! ## Execution Model
//!
//! For each (protocol, operation) pair, the runner dispatches the configured
//! number of calls. Sequential mode awaits calls strictly one at a time, in
//! task order. Parallel mode spawns a fixed pool of workers that drain one
//! shared task queue; every submitted task produces exactly one
//! `RequestResult`, with no ordering guarantee between tasks.
//!
//! ## Failure Isolation
//!
//! A failing call never aborts the run. The timed call wrapper converts
//! adapter errors and timeouts into failed `RequestResult`s at the call
//! site, so per-call errors cannot cross the aggregation boundary.
//!
//! ## Cancellation
//!
//! Cancellation is cooperative: once the run's `CancelToken` fires, no new
//! tasks are pulled from the queue, in-flight calls are allowed to finish,
//! and the run finalizes as CANCELLED with whatever results were collected.

use crate::{
    cli::{Args, Operation, Protocol, UserIdRange},
    error::{BenchmarkError, ErrorKind, OperationError},
    metrics::{MetricRecorder, RequestResult},
    protocol::{AdapterRegistry, OperationParams, ProtocolAdapter},
};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// How calls are scheduled within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyMode {
    /// One call at a time, in task order; results arrive in request order
    Sequential,
    /// A fixed pool of workers drains a shared task queue; results arrive in
    /// completion order
    Parallel { workers: usize },
}

impl std::fmt::Display for ConcurrencyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConcurrencyMode::Sequential => write!(f, "sequential"),
            ConcurrencyMode::Parallel { workers } => write!(f, "parallel ({} workers)", workers),
        }
    }
}

/// Lifecycle state of a benchmark run
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RunStatus {
    NotStarted,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Cancelled | RunStatus::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::NotStarted => "NotStarted",
            RunStatus::Running => "Running",
            RunStatus::Completed => "Completed",
            RunStatus::Cancelled => "Cancelled",
            RunStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cooperative cancellation handle shared between the caller and the workers.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop dispatching new tasks; in-flight calls finish normally.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Configuration for benchmark execution
#[derive(Clone, Debug)]
pub struct BenchmarkConfig {
    /// Protocols to exercise, already expanded (never contains `All`)
    pub protocols: Vec<Protocol>,

    /// Operations to exercise against every protocol, already expanded
    pub operations: Vec<Operation>,

    /// Calls per (protocol, operation) pair
    pub requests: usize,

    /// Sequential or fixed-pool parallel dispatch
    pub mode: ConcurrencyMode,

    /// Optional uniform per-call deadline
    pub call_timeout: Option<Duration>,

    /// Range user IDs are sampled from when building call parameters
    pub user_id_range: UserIdRange,
}

impl BenchmarkConfig {
    /// Create benchmark configuration from CLI arguments.
    ///
    /// Expands `all` selections, converts the zero timeout into "no
    /// deadline", and validates the result.
    pub fn from_args(args: &Args) -> Result<Self, BenchmarkError> {
        let config = Self {
            protocols: Protocol::expand_all(args.protocols.clone()),
            operations: Operation::expand_all(args.operations.clone()),
            requests: args.requests as usize,
            mode: if args.sequential {
                ConcurrencyMode::Sequential
            } else {
                ConcurrencyMode::Parallel {
                    workers: args.workers,
                }
            },
            call_timeout: if args.timeout.is_zero() {
                None
            } else {
                Some(args.timeout)
            },
            user_id_range: args.user_id_range,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BenchmarkError> {
        if self.requests < 1 || self.requests > 10_000 {
            return Err(BenchmarkError::Configuration(format!(
                "requests must be within 1..=10000, got {}",
                self.requests
            )));
        }
        if self.protocols.is_empty() {
            return Err(BenchmarkError::Configuration(
                "at least one protocol is required".to_string(),
            ));
        }
        if self.protocols.contains(&Protocol::All) {
            return Err(BenchmarkError::Configuration(
                "protocol list must be expanded before execution".to_string(),
            ));
        }
        if self.operations.is_empty() {
            return Err(BenchmarkError::Configuration(
                "at least one operation is required".to_string(),
            ));
        }
        if self.operations.contains(&Operation::All) {
            return Err(BenchmarkError::Configuration(
                "operation list must be expanded before execution".to_string(),
            ));
        }
        if let ConcurrencyMode::Parallel { workers } = self.mode {
            if workers < 1 {
                return Err(BenchmarkError::Configuration(
                    "worker count must be at least 1".to_string(),
                ));
            }
        }
        if self.user_id_range.min < 1 || self.user_id_range.max < self.user_id_range.min {
            return Err(BenchmarkError::Configuration(format!(
                "invalid user ID range {}",
                self.user_id_range
            )));
        }
        Ok(())
    }

    /// Total number of calls this configuration will dispatch.
    pub fn total_tasks(&self) -> usize {
        self.protocols.len() * self.operations.len() * self.requests
    }
}

/// A benchmark run: configuration, lifecycle state, and collected samples.
///
/// Owned exclusively by the caller that created it and mutated only by the
/// `BenchmarkRunner` while Running. `clear()` resets a finished run for
/// reuse instead of mutating any global state.
pub struct BenchmarkRun {
    id: Uuid,
    config: BenchmarkConfig,
    status: RunStatus,
    recorder: MetricRecorder,
    started_at: Option<DateTime<Utc>>,
    wall_clock: Option<Duration>,
    cancel: CancelToken,
}

impl BenchmarkRun {
    /// Create a run from a validated configuration.
    pub fn new(config: BenchmarkConfig) -> Result<Self, BenchmarkError> {
        config.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            config,
            status: RunStatus::NotStarted,
            recorder: MetricRecorder::new(),
            started_at: None,
            wall_clock: None,
            cancel: CancelToken::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn recorder(&self) -> &MetricRecorder {
        &self.recorder
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Wall-clock duration of the dispatch phase, once the run has finished.
    pub fn wall_clock(&self) -> Option<Duration> {
        self.wall_clock
    }

    /// Handle for requesting cooperative cancellation.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Reset a finished run back to NOT_STARTED with an empty sample set.
    ///
    /// Only valid from a terminal state; a running benchmark cannot be
    /// cleared out from under its runner.
    pub fn clear(&mut self) -> Result<(), BenchmarkError> {
        if !self.status.is_terminal() {
            return Err(BenchmarkError::InvalidState {
                expected: "a terminal state",
                actual: self.status.as_str(),
            });
        }
        self.status = RunStatus::NotStarted;
        self.recorder.clear();
        self.started_at = None;
        self.wall_clock = None;
        self.cancel = CancelToken::new();
        Ok(())
    }
}

/// One unit of work: a single call of one operation through one adapter.
struct CallTask {
    adapter: Arc<dyn ProtocolAdapter>,
    operation: Operation,
    params: OperationParams,
}

/// Benchmark runner that drives a run against a set of protocol adapters.
///
/// The runner owns no scheduling state of its own; everything mutable lives
/// on the `BenchmarkRun` it is handed.
pub struct BenchmarkRunner {
    adapters: AdapterRegistry,
}

impl BenchmarkRunner {
    pub fn new(adapters: AdapterRegistry) -> Self {
        Self { adapters }
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    /// Execute the run to completion (or cancellation).
    ///
    /// The run must be in NOT_STARTED; terminal runs are re-armed with
    /// `clear()` first. Configuration problems (e.g. a protocol without a
    /// registered adapter) surface before the run enters RUNNING.
    pub async fn execute(&self, run: &mut BenchmarkRun) -> Result<(), BenchmarkError> {
        if run.status != RunStatus::NotStarted {
            return Err(BenchmarkError::InvalidState {
                expected: "NotStarted",
                actual: run.status.as_str(),
            });
        }

        let tasks = self.build_tasks(&run.config)?;
        let total = tasks.len();

        run.status = RunStatus::Running;
        run.started_at = Some(Utc::now());
        info!(
            "Starting benchmark run {}: {} tasks, {} mode",
            run.id, total, run.config.mode
        );

        let cancel = run.cancel.clone();
        let call_timeout = run.config.call_timeout;
        let started = Instant::now();

        let outcome = match run.config.mode {
            ConcurrencyMode::Sequential => {
                run_sequential(tasks, &run.recorder, &cancel, call_timeout).await
            }
            ConcurrencyMode::Parallel { workers } => {
                run_parallel(tasks, workers, &run.recorder, &cancel, call_timeout).await
            }
        };

        run.wall_clock = Some(started.elapsed());

        match outcome {
            Ok(()) => {
                run.status = if cancel.is_cancelled() {
                    RunStatus::Cancelled
                } else {
                    RunStatus::Completed
                };
                info!(
                    "Benchmark run {} finished as {} with {}/{} results in {:.2?}",
                    run.id,
                    run.status,
                    run.recorder.total_samples(),
                    total,
                    run.wall_clock.unwrap_or_default()
                );
                Ok(())
            }
            Err(err) => {
                run.status = RunStatus::Failed;
                Err(err)
            }
        }
    }

    /// Build the full task list in configuration order.
    ///
    /// Adapter selection happens here, once, via the registry lookup table;
    /// the dispatch loops below never inspect protocol identity.
    fn build_tasks(&self, config: &BenchmarkConfig) -> Result<Vec<CallTask>, BenchmarkError> {
        let mut rng = rand::thread_rng();
        let mut tasks = Vec::with_capacity(config.total_tasks());

        for protocol in &config.protocols {
            let adapter = self.adapters.get(*protocol).ok_or_else(|| {
                BenchmarkError::Configuration(format!("no adapter registered for {}", protocol))
            })?;
            for operation in &config.operations {
                for _ in 0..config.requests {
                    tasks.push(CallTask {
                        adapter: Arc::clone(&adapter),
                        operation: *operation,
                        params: sample_params(&config.user_id_range, &mut rng),
                    });
                }
            }
        }
        Ok(tasks)
    }
}

/// Sample call parameters from the configured user-id range.
fn sample_params<R: Rng>(range: &UserIdRange, rng: &mut R) -> OperationParams {
    OperationParams {
        user_id: rng.gen_range(range.min..=range.max),
        ..OperationParams::default()
    }
}

/// Execute one call under the monotonic timer.
///
/// The timer starts immediately before the adapter is invoked and is read
/// immediately on return, success or failure. Errors and timeouts are folded
/// into the returned `RequestResult`; this function never fails.
async fn timed_call(task: &CallTask, call_timeout: Option<Duration>) -> RequestResult {
    let protocol = task.adapter.protocol();
    let started = Instant::now();

    let outcome = match call_timeout {
        Some(limit) => {
            match tokio::time::timeout(
                limit,
                task.adapter.execute_operation(task.operation, &task.params),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(OperationError::new(
                    ErrorKind::Timeout,
                    format!("call exceeded {:?} deadline", limit),
                )),
            }
        }
        None => {
            task.adapter
                .execute_operation(task.operation, &task.params)
                .await
        }
    };

    let response_time_ms = started.elapsed().as_secs_f64() * 1_000.0;

    match outcome {
        Ok(response) => {
            let payload = task.adapter.compute_payload_size(&response);
            RequestResult::success(protocol, task.operation, response_time_ms, payload)
        }
        Err(error) => {
            debug!(
                "{}/{} call failed: {}",
                protocol, task.operation, error
            );
            RequestResult::failure(protocol, task.operation, response_time_ms, error)
        }
    }
}

async fn run_sequential(
    tasks: Vec<CallTask>,
    recorder: &MetricRecorder,
    cancel: &CancelToken,
    call_timeout: Option<Duration>,
) -> Result<(), BenchmarkError> {
    let total = tasks.len();
    for (completed, task) in tasks.iter().enumerate() {
        if cancel.is_cancelled() {
            debug!("cancelled after {} of {} calls", completed, total);
            break;
        }
        recorder.append(timed_call(task, call_timeout).await);
        if (completed + 1) % 100 == 0 {
            debug!("{}/{} calls completed", completed + 1, total);
        }
    }
    Ok(())
}

async fn run_parallel(
    tasks: Vec<CallTask>,
    workers: usize,
    recorder: &MetricRecorder,
    cancel: &CancelToken,
    call_timeout: Option<Duration>,
) -> Result<(), BenchmarkError> {
    let total = tasks.len();
    let queue = Arc::new(parking_lot::Mutex::new(VecDeque::from(tasks)));
    let (tx, mut rx) = mpsc::unbounded_channel::<RequestResult>();

    let mut handles = Vec::with_capacity(workers);
    for worker in 0..workers {
        let queue = Arc::clone(&queue);
        let tx = tx.clone();
        let cancel = cancel.clone();

        handles.push(tokio::spawn(async move {
            loop {
                if cancel.is_cancelled() {
                    break;
                }
                let task = queue.lock().pop_front();
                let Some(task) = task else { break };

                let result = timed_call(&task, call_timeout).await;
                if tx.send(result).is_err() {
                    break;
                }
            }
            debug!("worker {} drained", worker);
        }));
    }
    drop(tx);

    // Single consumer: the recorder sees results in completion order
    let mut completed = 0usize;
    while let Some(result) = rx.recv().await {
        recorder.append(result);
        completed += 1;
        if completed % 100 == 0 {
            debug!("{}/{} calls completed", completed, total);
        }
    }

    for handle in handles {
        handle
            .await
            .map_err(|e| BenchmarkError::Worker(e.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BenchmarkConfig {
        BenchmarkConfig {
            protocols: vec![Protocol::Rest],
            operations: vec![Operation::GetUser],
            requests: 10,
            mode: ConcurrencyMode::Sequential,
            call_timeout: None,
            user_id_range: UserIdRange { min: 1, max: 100 },
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(config().validate().is_ok());

        let mut bad = config();
        bad.requests = 0;
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.requests = 10_001;
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.protocols = vec![];
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.protocols = vec![Protocol::All];
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.mode = ConcurrencyMode::Parallel { workers: 0 };
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.user_id_range = UserIdRange { min: 9, max: 3 };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_total_tasks() {
        let mut c = config();
        c.protocols = vec![Protocol::Rest, Protocol::Grpc];
        c.operations = vec![Operation::GetUser, Operation::ListUsers, Operation::SearchUsers];
        c.requests = 7;
        assert_eq!(c.total_tasks(), 42);
    }

    #[test]
    fn test_clear_requires_terminal_state() {
        let mut run = BenchmarkRun::new(config()).unwrap();
        assert_eq!(run.status(), RunStatus::NotStarted);
        assert!(run.clear().is_err());
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_sample_params_within_range() {
        let range = UserIdRange { min: 10, max: 20 };
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let params = sample_params(&range, &mut rng);
            assert!((10..=20).contains(&params.user_id));
        }
    }
}

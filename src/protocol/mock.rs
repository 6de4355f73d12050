use super::{OperationParams, OperationResponse, ProtocolAdapter};
use crate::cli::{Operation, Protocol};
use crate::error::{ErrorKind, OperationError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Deterministic adapter for exercising the harness without live servers.
///
/// Latency, payload size, and failures are all scripted. Failures are keyed
/// by the adapter-wide call index (0-based, in dispatch order for sequential
/// runs).
pub struct MockAdapter {
    protocol: Protocol,
    latency: Duration,
    payload_size: usize,
    fail_on: HashSet<usize>,
    failure_kind: ErrorKind,
    calls: AtomicUsize,
}

impl MockAdapter {
    pub fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            latency: Duration::ZERO,
            payload_size: 100,
            fail_on: HashSet::new(),
            failure_kind: ErrorKind::Transport,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_payload_size(mut self, payload_size: usize) -> Self {
        self.payload_size = payload_size;
        self
    }

    /// Script failures for the given 0-based call indexes.
    pub fn failing_on<I>(mut self, calls: I, kind: ErrorKind) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        self.fail_on = calls.into_iter().collect();
        self.failure_kind = kind;
        self
    }

    /// Number of calls executed so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProtocolAdapter for MockAdapter {
    fn protocol(&self) -> Protocol {
        self.protocol
    }

    async fn check_ready(&self) -> Result<(), OperationError> {
        Ok(())
    }

    async fn execute_operation(
        &self,
        _operation: Operation,
        _params: &OperationParams,
    ) -> Result<OperationResponse, OperationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.fail_on.contains(&call) {
            return Err(OperationError::new(
                self.failure_kind,
                format!("scripted failure on call {}", call),
            ));
        }

        Ok(OperationResponse::new(vec![0u8; self.payload_size]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_failures() {
        let adapter = MockAdapter::new(Protocol::Rest).failing_on([1], ErrorKind::Timeout);
        let params = OperationParams::default();

        assert!(adapter
            .execute_operation(Operation::GetUser, &params)
            .await
            .is_ok());
        let err = adapter
            .execute_operation(Operation::GetUser, &params)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(adapter
            .execute_operation(Operation::GetUser, &params)
            .await
            .is_ok());
        assert_eq!(adapter.call_count(), 3);
    }

    #[tokio::test]
    async fn test_payload_size_is_scripted() {
        let adapter = MockAdapter::new(Protocol::GraphQl).with_payload_size(42);
        let response = adapter
            .execute_operation(Operation::ListUsers, &OperationParams::default())
            .await
            .unwrap();
        assert_eq!(response.body.len(), 42);
    }
}

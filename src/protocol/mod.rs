use crate::cli::{Operation, Protocol};
use crate::error::{BenchmarkError, OperationError};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

pub mod graphql;
pub mod grpc;
pub mod mock;
pub mod rest;

pub use graphql::GraphQlAdapter;
pub use grpc::GrpcAdapter;
pub use mock::MockAdapter;
pub use rest::RestAdapter;

/// Parameters for one API call.
///
/// The benchmark runner samples these before dispatch; adapters translate
/// them into whatever their transport expects.
#[derive(Debug, Clone, Serialize)]
pub struct OperationParams {
    pub user_id: u64,
    pub page: u32,
    pub page_size: u32,
    pub query: String,
    pub bulk_count: usize,
}

impl Default for OperationParams {
    fn default() -> Self {
        Self {
            user_id: 1,
            page: 0,
            page_size: 20,
            query: "user".to_string(),
            bulk_count: 10,
        }
    }
}

/// Raw response returned by an adapter.
///
/// Holds the payload bytes as they came off the wire (for gRPC, the protobuf
/// encoding of the decoded reply), so the default payload-size computation
/// applies uniformly.
#[derive(Debug, Clone)]
pub struct OperationResponse {
    pub body: Vec<u8>,
}

impl OperationResponse {
    pub fn new(body: Vec<u8>) -> Self {
        Self { body }
    }
}

/// Uniform capability wrapping one transport.
///
/// Implementations are interchangeable behind this interface; the harness
/// never branches on protocol identity except to pick which adapter instance
/// to call. Adapters own their connection reuse and must tolerate concurrent
/// invocation when the runner uses more than one worker.
#[async_trait]
pub trait ProtocolAdapter: Send + Sync {
    /// The protocol this adapter speaks
    fn protocol(&self) -> Protocol;

    /// Cheap pre-flight probe; failure aborts the run before any call is
    /// dispatched
    async fn check_ready(&self) -> Result<(), OperationError>;

    /// Execute one logical operation against the target
    async fn execute_operation(
        &self,
        operation: Operation,
        params: &OperationParams,
    ) -> Result<OperationResponse, OperationError>;

    /// Size of the response payload in bytes
    fn compute_payload_size(&self, response: &OperationResponse) -> u64 {
        response.body.len() as u64
    }
}

/// Connection targets for the live adapters.
#[derive(Debug, Clone)]
pub struct TargetConfig {
    pub rest_url: String,
    pub grpc_url: String,
    pub graphql_url: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            rest_url: crate::defaults::REST_URL.to_string(),
            grpc_url: crate::defaults::GRPC_URL.to_string(),
            graphql_url: crate::defaults::GRAPHQL_URL.to_string(),
        }
    }
}

/// Lookup table mapping each benchmarked protocol to its adapter instance.
///
/// Built once before the run starts; the dispatch loop only ever does a map
/// lookup, never a string comparison on protocol names.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<Protocol, Arc<dyn ProtocolAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under the protocol it reports.
    pub fn register(&mut self, adapter: Arc<dyn ProtocolAdapter>) {
        self.adapters.insert(adapter.protocol(), adapter);
    }

    pub fn get(&self, protocol: Protocol) -> Option<Arc<dyn ProtocolAdapter>> {
        self.adapters.get(&protocol).cloned()
    }

    pub fn adapters(&self) -> impl Iterator<Item = &Arc<dyn ProtocolAdapter>> {
        self.adapters.values()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Build live adapters for the requested protocols.
    pub fn for_targets(
        protocols: &[Protocol],
        targets: &TargetConfig,
    ) -> Result<Self, BenchmarkError> {
        let mut registry = Self::new();
        for protocol in protocols {
            let adapter: Arc<dyn ProtocolAdapter> = match protocol {
                Protocol::Rest => Arc::new(RestAdapter::new(&targets.rest_url)?),
                Protocol::Grpc => Arc::new(GrpcAdapter::new(&targets.grpc_url)?),
                Protocol::GraphQl => Arc::new(GraphQlAdapter::new(&targets.graphql_url)?),
                Protocol::All => {
                    return Err(BenchmarkError::Configuration(
                        "'all' must be expanded before adapter construction".to_string(),
                    ))
                }
            };
            registry.register(adapter);
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_registry_lookup() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(
            MockAdapter::new(Protocol::Rest).with_latency(Duration::ZERO),
        ));

        assert_eq!(registry.len(), 1);
        assert!(registry.get(Protocol::Rest).is_some());
        assert!(registry.get(Protocol::Grpc).is_none());
    }

    #[test]
    fn test_for_targets_rejects_unexpanded_all() {
        let err = AdapterRegistry::for_targets(&[Protocol::All], &TargetConfig::default())
            .err()
            .map(|e| e.to_string())
            .unwrap_or_default();
        assert!(err.contains("expanded"));
    }

    #[tokio::test]
    async fn test_default_payload_size_is_body_length() {
        let adapter = MockAdapter::new(Protocol::Rest).with_payload_size(256);
        let response = adapter
            .execute_operation(Operation::GetUser, &OperationParams::default())
            .await
            .unwrap();
        assert_eq!(adapter.compute_payload_size(&response), 256);
    }
}

use super::{OperationParams, OperationResponse, ProtocolAdapter};
use crate::cli::{Operation, Protocol};
use crate::error::{BenchmarkError, ErrorKind, OperationError};
use async_trait::async_trait;
use prost::Message;
use std::time::Duration;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};

const READY_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const GET_USER: &str = "/apitest.UserService/GetUser";
const LIST_USERS: &str = "/apitest.UserService/ListUsers";
const CREATE_USER: &str = "/apitest.UserService/CreateUser";
const GET_USER_ORDERS: &str = "/apitest.UserService/GetUserOrders";
const SEARCH_USERS: &str = "/apitest.UserService/SearchUsers";
const BULK_CREATE_USERS: &str = "/apitest.UserService/BulkCreateUsers";

/// Message types for the `apitest.UserService` contract.
///
/// Declared by hand with prost derives; `created_at` is carried as epoch
/// milliseconds rather than a well-known Timestamp message.
pub mod pb {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct User {
        #[prost(int64, tag = "1")]
        pub id: i64,
        #[prost(string, tag = "2")]
        pub username: String,
        #[prost(string, tag = "3")]
        pub email: String,
        #[prost(string, tag = "4")]
        pub first_name: String,
        #[prost(string, tag = "5")]
        pub last_name: String,
        #[prost(int64, tag = "6")]
        pub created_at: i64,
        #[prost(bool, tag = "7")]
        pub is_active: bool,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct OrderItem {
        #[prost(string, tag = "1")]
        pub product_name: String,
        #[prost(int32, tag = "2")]
        pub quantity: i32,
        #[prost(double, tag = "3")]
        pub price: f64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Order {
        #[prost(int64, tag = "1")]
        pub id: i64,
        #[prost(int64, tag = "2")]
        pub user_id: i64,
        #[prost(double, tag = "3")]
        pub total_amount: f64,
        #[prost(string, tag = "4")]
        pub status: String,
        #[prost(int64, tag = "5")]
        pub created_at: i64,
        #[prost(message, repeated, tag = "6")]
        pub items: Vec<OrderItem>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GetUserRequest {
        #[prost(int64, tag = "1")]
        pub user_id: i64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GetUserResponse {
        #[prost(message, optional, tag = "1")]
        pub user: Option<User>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ListUsersRequest {
        #[prost(int32, tag = "1")]
        pub page: i32,
        #[prost(int32, tag = "2")]
        pub size: i32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ListUsersResponse {
        #[prost(message, repeated, tag = "1")]
        pub users: Vec<User>,
        #[prost(int64, tag = "2")]
        pub total_elements: i64,
        #[prost(int32, tag = "3")]
        pub total_pages: i32,
        #[prost(int32, tag = "4")]
        pub current_page: i32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CreateUserRequest {
        #[prost(string, tag = "1")]
        pub username: String,
        #[prost(string, tag = "2")]
        pub email: String,
        #[prost(string, tag = "3")]
        pub first_name: String,
        #[prost(string, tag = "4")]
        pub last_name: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CreateUserResponse {
        #[prost(message, optional, tag = "1")]
        pub user: Option<User>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GetUserOrdersRequest {
        #[prost(int64, tag = "1")]
        pub user_id: i64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GetUserOrdersResponse {
        #[prost(message, repeated, tag = "1")]
        pub orders: Vec<Order>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SearchUsersRequest {
        #[prost(string, tag = "1")]
        pub query: String,
        #[prost(int32, tag = "2")]
        pub limit: i32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SearchUsersResponse {
        #[prost(message, repeated, tag = "1")]
        pub users: Vec<User>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BulkCreateUsersRequest {
        #[prost(message, repeated, tag = "1")]
        pub users: Vec<CreateUserRequest>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BulkCreateUsersResponse {
        #[prost(message, repeated, tag = "1")]
        pub users: Vec<User>,
    }
}

/// gRPC adapter performing unary calls over a lazily connected channel.
///
/// The payload size reported for a reply is its protobuf encoding length,
/// which matches the on-wire message size.
pub struct GrpcAdapter {
    channel: Channel,
}

impl GrpcAdapter {
    pub fn new(target: &str) -> Result<Self, BenchmarkError> {
        let endpoint = Endpoint::from_shared(normalize_target(target))
            .map_err(|e| BenchmarkError::Configuration(format!("invalid gRPC target: {}", e)))?;
        Ok(Self {
            channel: endpoint.connect_lazy(),
        })
    }

    async fn unary<Req, Resp>(&self, path: &'static str, request: Req) -> Result<Resp, OperationError>
    where
        Req: Message + Send + Sync + 'static,
        Resp: Message + Default + Send + Sync + 'static,
    {
        let mut grpc = tonic::client::Grpc::new(self.channel.clone());
        grpc.ready().await.map_err(|e| {
            OperationError::new(ErrorKind::Transport, format!("channel not ready: {}", e))
        })?;

        let codec: tonic::codec::ProstCodec<Req, Resp> = tonic::codec::ProstCodec::default();
        let path = PathAndQuery::from_static(path);
        let response = grpc
            .unary(tonic::Request::new(request), path, codec)
            .await
            .map_err(map_status)?;

        Ok(response.into_inner())
    }

    fn create_user_request(user_id: u64) -> pb::CreateUserRequest {
        pb::CreateUserRequest {
            username: format!("bench_user_{}", user_id),
            email: format!("bench_user_{}@example.com", user_id),
            first_name: "Bench".to_string(),
            last_name: "User".to_string(),
        }
    }
}

fn normalize_target(target: &str) -> String {
    if target.starts_with("http://") || target.starts_with("https://") {
        target.to_string()
    } else {
        format!("http://{}", target)
    }
}

fn map_status(status: tonic::Status) -> OperationError {
    use tonic::Code;

    let kind = match status.code() {
        Code::NotFound => ErrorKind::NotFound,
        Code::Unauthenticated | Code::PermissionDenied => ErrorKind::Unauthorized,
        Code::DeadlineExceeded => ErrorKind::Timeout,
        Code::Unavailable => ErrorKind::Transport,
        _ => ErrorKind::Unknown,
    };
    OperationError::new(kind, status.message())
}

#[async_trait]
impl ProtocolAdapter for GrpcAdapter {
    fn protocol(&self) -> Protocol {
        Protocol::Grpc
    }

    async fn check_ready(&self) -> Result<(), OperationError> {
        let probe = self.unary::<pb::GetUserRequest, pb::GetUserResponse>(
            GET_USER,
            pb::GetUserRequest { user_id: 1 },
        );

        // NotFound proves the service answers even if the probe user is absent
        match tokio::time::timeout(READY_PROBE_TIMEOUT, probe).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) if err.kind == ErrorKind::NotFound => Ok(()),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(OperationError::new(
                ErrorKind::Timeout,
                "gRPC readiness probe timed out",
            )),
        }
    }

    async fn execute_operation(
        &self,
        operation: Operation,
        params: &OperationParams,
    ) -> Result<OperationResponse, OperationError> {
        let body = match operation {
            Operation::GetUser => {
                let reply: pb::GetUserResponse = self
                    .unary(
                        GET_USER,
                        pb::GetUserRequest {
                            user_id: params.user_id as i64,
                        },
                    )
                    .await?;
                reply.encode_to_vec()
            }
            Operation::ListUsers => {
                let reply: pb::ListUsersResponse = self
                    .unary(
                        LIST_USERS,
                        pb::ListUsersRequest {
                            page: params.page as i32,
                            size: params.page_size as i32,
                        },
                    )
                    .await?;
                reply.encode_to_vec()
            }
            Operation::CreateUser => {
                let reply: pb::CreateUserResponse = self
                    .unary(CREATE_USER, Self::create_user_request(params.user_id))
                    .await?;
                reply.encode_to_vec()
            }
            Operation::GetUserOrders => {
                let reply: pb::GetUserOrdersResponse = self
                    .unary(
                        GET_USER_ORDERS,
                        pb::GetUserOrdersRequest {
                            user_id: params.user_id as i64,
                        },
                    )
                    .await?;
                reply.encode_to_vec()
            }
            Operation::SearchUsers => {
                let reply: pb::SearchUsersResponse = self
                    .unary(
                        SEARCH_USERS,
                        pb::SearchUsersRequest {
                            query: params.query.clone(),
                            limit: params.page_size as i32,
                        },
                    )
                    .await?;
                reply.encode_to_vec()
            }
            Operation::BulkCreateUsers => {
                let users = (0..params.bulk_count)
                    .map(|i| Self::create_user_request(params.user_id + i as u64))
                    .collect();
                let reply: pb::BulkCreateUsersResponse = self
                    .unary(BULK_CREATE_USERS, pb::BulkCreateUsersRequest { users })
                    .await?;
                reply.encode_to_vec()
            }
            Operation::All => {
                return Err(OperationError::new(
                    ErrorKind::Unknown,
                    "'all' must be expanded before dispatch",
                ))
            }
        };

        Ok(OperationResponse::new(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_target() {
        assert_eq!(normalize_target("localhost:9090"), "http://localhost:9090");
        assert_eq!(
            normalize_target("http://localhost:9090"),
            "http://localhost:9090"
        );
        assert_eq!(normalize_target("https://api:443"), "https://api:443");
    }

    #[test]
    fn test_status_mapping() {
        use tonic::{Code, Status};

        let cases = [
            (Code::NotFound, ErrorKind::NotFound),
            (Code::Unauthenticated, ErrorKind::Unauthorized),
            (Code::PermissionDenied, ErrorKind::Unauthorized),
            (Code::DeadlineExceeded, ErrorKind::Timeout),
            (Code::Unavailable, ErrorKind::Transport),
            (Code::Internal, ErrorKind::Unknown),
        ];
        for (code, expected) in cases {
            let mapped = map_status(Status::new(code, "test"));
            assert_eq!(mapped.kind, expected);
        }
    }

    #[test]
    fn test_encoded_len_matches_payload_size() {
        let reply = pb::GetUserResponse {
            user: Some(pb::User {
                id: 7,
                username: "bench_user_7".to_string(),
                email: "bench_user_7@example.com".to_string(),
                first_name: "Bench".to_string(),
                last_name: "User".to_string(),
                created_at: 1_700_000_000_000,
                is_active: true,
            }),
        };

        let encoded = reply.encode_to_vec();
        assert_eq!(encoded.len(), reply.encoded_len());
        assert!(!encoded.is_empty());
    }
}

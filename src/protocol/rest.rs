use super::{OperationParams, OperationResponse, ProtocolAdapter};
use crate::cli::{Operation, Protocol};
use crate::error::{BenchmarkError, ErrorKind, OperationError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;

const READY_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// REST adapter speaking to the `/api/users` routes.
///
/// The reqwest client keeps a persistent connection pool internally, so the
/// adapter is safe to invoke from any number of concurrent workers.
pub struct RestAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl RestAdapter {
    pub fn new(base_url: &str) -> Result<Self, BenchmarkError> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            BenchmarkError::Configuration(format!("failed to build HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn create_user_body(user_id: u64) -> serde_json::Value {
        json!({
            "username": format!("bench_user_{}", user_id),
            "email": format!("bench_user_{}@example.com", user_id),
            "firstName": "Bench",
            "lastName": "User",
        })
    }

    async fn read_body(response: reqwest::Response) -> Result<OperationResponse, OperationError> {
        let status = response.status();
        if let Some(kind) = kind_for_status(status) {
            return Err(OperationError::new(kind, format!("HTTP {}", status)));
        }

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        Ok(OperationResponse::new(body.to_vec()))
    }
}

/// Classify a non-success HTTP status; `None` means the call succeeded.
fn kind_for_status(status: StatusCode) -> Option<ErrorKind> {
    if status.is_success() {
        return None;
    }
    Some(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorKind::Unauthorized,
        StatusCode::NOT_FOUND => ErrorKind::NotFound,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ErrorKind::Timeout,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => ErrorKind::Transport,
        _ => ErrorKind::Unknown,
    })
}

pub(super) fn map_reqwest_error(err: reqwest::Error) -> OperationError {
    let kind = if err.is_timeout() {
        ErrorKind::Timeout
    } else if err.is_connect() {
        ErrorKind::Transport
    } else {
        ErrorKind::Unknown
    };
    OperationError::new(kind, err.to_string())
}

#[async_trait]
impl ProtocolAdapter for RestAdapter {
    fn protocol(&self) -> Protocol {
        Protocol::Rest
    }

    async fn check_ready(&self) -> Result<(), OperationError> {
        let url = format!("{}/api/users/1", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(READY_PROBE_TIMEOUT)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        // 404 still proves the server answers; the probe user may not exist
        match response.status() {
            s if s.is_success() || s == StatusCode::NOT_FOUND => Ok(()),
            s => Err(OperationError::new(
                ErrorKind::Transport,
                format!("unexpected probe status HTTP {}", s),
            )),
        }
    }

    async fn execute_operation(
        &self,
        operation: Operation,
        params: &OperationParams,
    ) -> Result<OperationResponse, OperationError> {
        let request = match operation {
            Operation::GetUser => self
                .client
                .get(format!("{}/api/users/{}", self.base_url, params.user_id)),
            Operation::ListUsers => self
                .client
                .get(format!("{}/api/users", self.base_url))
                .query(&[("page", params.page), ("size", params.page_size)]),
            Operation::CreateUser => self
                .client
                .post(format!("{}/api/users", self.base_url))
                .json(&Self::create_user_body(params.user_id)),
            Operation::GetUserOrders => self.client.get(format!(
                "{}/api/users/{}/orders",
                self.base_url, params.user_id
            )),
            Operation::SearchUsers => {
                let limit = params.page_size.to_string();
                self.client
                    .get(format!("{}/api/users/search", self.base_url))
                    .query(&[("query", params.query.as_str()), ("limit", limit.as_str())])
            }
            Operation::BulkCreateUsers => {
                let users: Vec<serde_json::Value> = (0..params.bulk_count)
                    .map(|i| Self::create_user_body(params.user_id + i as u64))
                    .collect();
                self.client
                    .post(format!("{}/api/users/bulk", self.base_url))
                    .json(&users)
            }
            Operation::All => {
                return Err(OperationError::new(
                    ErrorKind::Unknown,
                    "'all' must be expanded before dispatch",
                ))
            }
        };

        let response = request.send().await.map_err(map_reqwest_error)?;
        Self::read_body(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(kind_for_status(StatusCode::OK), None);
        assert_eq!(kind_for_status(StatusCode::CREATED), None);
        assert_eq!(
            kind_for_status(StatusCode::UNAUTHORIZED),
            Some(ErrorKind::Unauthorized)
        );
        assert_eq!(
            kind_for_status(StatusCode::FORBIDDEN),
            Some(ErrorKind::Unauthorized)
        );
        assert_eq!(
            kind_for_status(StatusCode::NOT_FOUND),
            Some(ErrorKind::NotFound)
        );
        assert_eq!(
            kind_for_status(StatusCode::GATEWAY_TIMEOUT),
            Some(ErrorKind::Timeout)
        );
        assert_eq!(
            kind_for_status(StatusCode::SERVICE_UNAVAILABLE),
            Some(ErrorKind::Transport)
        );
        assert_eq!(
            kind_for_status(StatusCode::INTERNAL_SERVER_ERROR),
            Some(ErrorKind::Unknown)
        );
    }

    #[test]
    fn test_create_user_body_fields() {
        let body = RestAdapter::create_user_body(42);
        assert_eq!(body["username"], "bench_user_42");
        assert_eq!(body["email"], "bench_user_42@example.com");
        assert!(body.get("firstName").is_some());
        assert!(body.get("lastName").is_some());
    }

    #[test]
    fn test_base_url_is_normalized() {
        let adapter = RestAdapter::new("http://localhost:8080/").unwrap();
        assert_eq!(adapter.base_url, "http://localhost:8080");
    }
}

use super::rest::map_reqwest_error;
use super::{OperationParams, OperationResponse, ProtocolAdapter};
use crate::cli::{Operation, Protocol};
use crate::error::{BenchmarkError, ErrorKind, OperationError};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

const READY_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const GET_USER_QUERY: &str = "query GetUser($id: ID!) { user(id: $id) { \
     id username email firstName lastName createdAt isActive } }";

const LIST_USERS_QUERY: &str = "query ListUsers($page: Int, $size: Int) { \
     listUsers(page: $page, size: $size) { \
     users { id username email firstName lastName } \
     totalElements totalPages currentPage } }";

const USER_ORDERS_QUERY: &str = "query UserOrders($userId: ID!) { \
     userOrders(userId: $userId) { id totalAmount status createdAt \
     items { productName quantity price } } }";

const SEARCH_USERS_QUERY: &str = "query SearchUsers($query: String!, $limit: Int) { \
     searchUsers(query: $query, limit: $limit) { id username email } }";

const CREATE_USER_MUTATION: &str = "mutation CreateUser($input: CreateUserInput!) { \
     createUser(input: $input) { id username email } }";

const BULK_CREATE_MUTATION: &str = "mutation BulkCreateUsers($inputs: [CreateUserInput!]!) { \
     bulkCreateUsers(inputs: $inputs) { id username } }";

/// GraphQL adapter POSTing query/mutation documents to a single endpoint.
///
/// GraphQL reports application errors inside a 200 response, so the response
/// body is inspected for an `errors` array in addition to the HTTP status.
pub struct GraphQlAdapter {
    client: reqwest::Client,
    endpoint: String,
}

impl GraphQlAdapter {
    pub fn new(endpoint: &str) -> Result<Self, BenchmarkError> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            BenchmarkError::Configuration(format!("failed to build HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    fn create_user_input(user_id: u64) -> serde_json::Value {
        json!({
            "username": format!("bench_user_{}", user_id),
            "email": format!("bench_user_{}@example.com", user_id),
            "firstName": "Bench",
            "lastName": "User",
        })
    }

    /// Select the document and variables for one operation.
    fn document_for(
        operation: Operation,
        params: &OperationParams,
    ) -> Result<(&'static str, serde_json::Value), OperationError> {
        let (document, variables) = match operation {
            Operation::GetUser => (GET_USER_QUERY, json!({ "id": params.user_id })),
            Operation::ListUsers => (
                LIST_USERS_QUERY,
                json!({ "page": params.page, "size": params.page_size }),
            ),
            Operation::CreateUser => (
                CREATE_USER_MUTATION,
                json!({ "input": Self::create_user_input(params.user_id) }),
            ),
            Operation::GetUserOrders => (USER_ORDERS_QUERY, json!({ "userId": params.user_id })),
            Operation::SearchUsers => (
                SEARCH_USERS_QUERY,
                json!({ "query": params.query, "limit": params.page_size }),
            ),
            Operation::BulkCreateUsers => {
                let inputs: Vec<serde_json::Value> = (0..params.bulk_count)
                    .map(|i| Self::create_user_input(params.user_id + i as u64))
                    .collect();
                (BULK_CREATE_MUTATION, json!({ "inputs": inputs }))
            }
            Operation::All => {
                return Err(OperationError::new(
                    ErrorKind::Unknown,
                    "'all' must be expanded before dispatch",
                ))
            }
        };
        Ok((document, variables))
    }

    async fn post_document(
        &self,
        document: &str,
        variables: serde_json::Value,
    ) -> Result<OperationResponse, OperationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "query": document, "variables": variables }))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let kind = match status.as_u16() {
                401 | 403 => ErrorKind::Unauthorized,
                502 | 503 => ErrorKind::Transport,
                _ => ErrorKind::Unknown,
            };
            return Err(OperationError::new(kind, format!("HTTP {}", status)));
        }

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        if let Some(error) = first_graphql_error(&body) {
            return Err(error);
        }

        Ok(OperationResponse::new(body.to_vec()))
    }
}

/// Extract the first entry of a GraphQL `errors` array, if any.
fn first_graphql_error(body: &[u8]) -> Option<OperationError> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let errors = value.get("errors")?.as_array()?;
    let message = errors
        .first()?
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("unspecified GraphQL error");
    Some(OperationError::new(classify_message(message), message))
}

fn classify_message(message: &str) -> ErrorKind {
    let lower = message.to_lowercase();
    if lower.contains("not found") {
        ErrorKind::NotFound
    } else if lower.contains("unauthorized") || lower.contains("denied") {
        ErrorKind::Unauthorized
    } else {
        ErrorKind::Unknown
    }
}

#[async_trait]
impl ProtocolAdapter for GraphQlAdapter {
    fn protocol(&self) -> Protocol {
        Protocol::GraphQl
    }

    async fn check_ready(&self) -> Result<(), OperationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(READY_PROBE_TIMEOUT)
            .json(&json!({ "query": "{ __typename }" }))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(OperationError::new(
                ErrorKind::Transport,
                format!("unexpected probe status HTTP {}", response.status()),
            ))
        }
    }

    async fn execute_operation(
        &self,
        operation: Operation,
        params: &OperationParams,
    ) -> Result<OperationResponse, OperationError> {
        let (document, variables) = Self::document_for(operation, params)?;
        self.post_document(document, variables).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_operation_has_a_document() {
        let params = OperationParams::default();
        for operation in Operation::expand_all(vec![Operation::All]) {
            let (document, variables) = GraphQlAdapter::document_for(operation, &params).unwrap();
            assert!(!document.is_empty());
            assert!(variables.is_object());
        }
    }

    #[test]
    fn test_bulk_inputs_match_count() {
        let params = OperationParams {
            bulk_count: 5,
            ..OperationParams::default()
        };
        let (_, variables) =
            GraphQlAdapter::document_for(Operation::BulkCreateUsers, &params).unwrap();
        assert_eq!(variables["inputs"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn test_graphql_error_extraction() {
        let body = br#"{"data":null,"errors":[{"message":"User not found: 7"}]}"#;
        let error = first_graphql_error(body).unwrap();
        assert_eq!(error.kind, ErrorKind::NotFound);

        let clean = br#"{"data":{"user":{"id":"1"}}}"#;
        assert!(first_graphql_error(clean).is_none());

        let empty = br#"{"data":null,"errors":[]}"#;
        assert!(first_graphql_error(empty).is_none());
    }

    #[test]
    fn test_message_classification() {
        assert_eq!(classify_message("User not found: 3"), ErrorKind::NotFound);
        assert_eq!(classify_message("access denied"), ErrorKind::Unauthorized);
        assert_eq!(classify_message("boom"), ErrorKind::Unknown);
    }
}

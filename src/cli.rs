use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// API Benchmark Suite - compares REST, gRPC, and GraphQL performance for the
/// same CRUD operation set
#[derive(Parser, Debug, Clone)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Number of requests to execute per (protocol, operation) pair
    #[clap(short = 'r', long, value_parser = clap::value_parser!(u64).range(1..=10_000))]
    pub requests: u64,

    /// Protocols to benchmark (space-separated: rest, grpc, graphql, or all)
    #[clap(short = 'p', long = "protocols", value_enum, default_values_t = vec![Protocol::All], num_args = 1..)]
    pub protocols: Vec<Protocol>,

    /// Operations to exercise against every protocol (space-separated, or all)
    #[clap(long = "operations", value_enum, default_values_t = vec![Operation::GetUser], num_args = 1..)]
    pub operations: Vec<Operation>,

    /// Range of user IDs to sample request parameters from (format: min-max)
    #[clap(long, default_value = crate::defaults::USER_ID_RANGE, value_parser = parse_user_id_range)]
    pub user_id_range: UserIdRange,

    /// Output format for the final report
    #[clap(short = 'o', long, value_enum, default_value_t = OutputFormat::Console)]
    pub output: OutputFormat,

    /// Base URL of the REST server
    #[clap(long, default_value = crate::defaults::REST_URL)]
    pub rest_url: String,

    /// Address of the gRPC server
    #[clap(long, default_value = crate::defaults::GRPC_URL)]
    pub grpc_url: String,

    /// Endpoint URL of the GraphQL server
    #[clap(long, default_value = crate::defaults::GRAPHQL_URL)]
    pub graphql_url: String,

    /// Number of concurrent workers draining the task queue
    #[clap(short = 'w', long, default_value_t = crate::defaults::WORKERS)]
    pub workers: usize,

    /// Execute calls strictly one at a time, in request order
    #[clap(long, default_value_t = false)]
    pub sequential: bool,

    /// Per-call timeout (e.g. "30s", "500ms"); 0 disables the deadline
    #[clap(long, value_parser = parse_timeout, default_value = "30s")]
    pub timeout: Duration,

    /// Verbose output
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,

    /// Suppress progress logging; print only the report
    #[clap(short = 'q', long, default_value_t = false)]
    pub quiet: bool,

    /// Mirror log output into a file
    #[clap(long)]
    pub log_file: Option<PathBuf>,
}

/// Protocols available for benchmarking
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Serialize, Deserialize)]
pub enum Protocol {
    /// REST over HTTP/JSON
    #[clap(name = "rest")]
    #[serde(rename = "REST")]
    Rest,

    /// gRPC over HTTP/2 with protobuf payloads
    #[clap(name = "grpc")]
    #[serde(rename = "gRPC")]
    Grpc,

    /// GraphQL over HTTP/JSON
    #[clap(name = "graphql")]
    #[serde(rename = "GraphQL")]
    GraphQl,

    /// All available protocols
    #[clap(name = "all")]
    #[serde(rename = "all")]
    All,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Rest => write!(f, "REST"),
            Protocol::Grpc => write!(f, "gRPC"),
            Protocol::GraphQl => write!(f, "GraphQL"),
            Protocol::All => write!(f, "All Protocols"),
        }
    }
}

impl Protocol {
    /// Expand the "All" variant to the full protocol list
    pub fn expand_all(protocols: Vec<Protocol>) -> Vec<Protocol> {
        if protocols.contains(&Protocol::All) {
            vec![Protocol::Rest, Protocol::Grpc, Protocol::GraphQl]
        } else {
            protocols
        }
    }
}

/// Logical CRUD operations implemented identically by every protocol
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Serialize, Deserialize)]
pub enum Operation {
    /// Fetch a single user by ID
    #[clap(name = "get-user")]
    #[serde(rename = "getUser")]
    GetUser,

    /// Fetch a page of users
    #[clap(name = "list-users")]
    #[serde(rename = "listUsers")]
    ListUsers,

    /// Create a single user
    #[clap(name = "create-user")]
    #[serde(rename = "createUser")]
    CreateUser,

    /// Fetch all orders belonging to a user
    #[clap(name = "get-user-orders")]
    #[serde(rename = "getUserOrders")]
    GetUserOrders,

    /// Search users by a free-text query
    #[clap(name = "search-users")]
    #[serde(rename = "searchUsers")]
    SearchUsers,

    /// Create a batch of users in one call
    #[clap(name = "bulk-create-users")]
    #[serde(rename = "bulkCreateUsers")]
    BulkCreateUsers,

    /// All available operations
    #[clap(name = "all")]
    #[serde(rename = "all")]
    All,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::GetUser => "getUser",
            Operation::ListUsers => "listUsers",
            Operation::CreateUser => "createUser",
            Operation::GetUserOrders => "getUserOrders",
            Operation::SearchUsers => "searchUsers",
            Operation::BulkCreateUsers => "bulkCreateUsers",
            Operation::All => "all",
        };
        write!(f, "{}", name)
    }
}

impl Operation {
    /// Expand the "All" variant to the full operation list
    pub fn expand_all(operations: Vec<Operation>) -> Vec<Operation> {
        if operations.contains(&Operation::All) {
            vec![
                Operation::GetUser,
                Operation::ListUsers,
                Operation::CreateUser,
                Operation::GetUserOrders,
                Operation::SearchUsers,
                Operation::BulkCreateUsers,
            ]
        } else {
            operations
        }
    }
}

/// Output format for the final report
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable sectioned report
    Console,
    /// Machine-readable JSON document
    Json,
    /// CSV records plus a comparison section
    Csv,
}

/// Inclusive range of user IDs request parameters are sampled from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdRange {
    pub min: u64,
    pub max: u64,
}

impl std::fmt::Display for UserIdRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Parse a user ID range from "min-max" notation (e.g. "1-10000")
fn parse_user_id_range(s: &str) -> Result<UserIdRange, String> {
    let s = s.trim();
    let (min_str, max_str) = s
        .split_once('-')
        .ok_or_else(|| format!("invalid range '{}': expected min-max", s))?;

    let min: u64 = min_str
        .trim()
        .parse()
        .map_err(|_| format!("invalid range minimum: {}", min_str))?;
    let max: u64 = max_str
        .trim()
        .parse()
        .map_err(|_| format!("invalid range maximum: {}", max_str))?;

    if min < 1 {
        return Err("range minimum must be at least 1".to_string());
    }
    if max < min {
        return Err(format!("invalid range '{}': maximum below minimum", s));
    }

    Ok(UserIdRange { min, max })
}

/// Parse a timeout from string (e.g. "30s", "500ms", "2m"); bare numbers are
/// seconds and "0" disables the deadline
fn parse_timeout(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("timeout cannot be empty".to_string());
    }

    let (num_str, unit) = if let Some(stripped) = s.strip_suffix("ms") {
        (stripped, "ms")
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, "s")
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, "m")
    } else {
        (s, "s")
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("invalid number in timeout: {}", num_str))?;
    if num < 0.0 {
        return Err("timeout cannot be negative".to_string());
    }

    let duration = match unit {
        "ms" => Duration::from_millis(num as u64),
        "s" => Duration::from_secs_f64(num),
        "m" => Duration::from_secs_f64(num * 60.0),
        _ => return Err(format!("invalid timeout unit: {}", unit)),
    };

    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_id_range() {
        assert_eq!(
            parse_user_id_range("1-10000").unwrap(),
            UserIdRange { min: 1, max: 10000 }
        );
        assert_eq!(
            parse_user_id_range(" 5-7 ").unwrap(),
            UserIdRange { min: 5, max: 7 }
        );
        assert_eq!(
            parse_user_id_range("3-3").unwrap(),
            UserIdRange { min: 3, max: 3 }
        );

        assert!(parse_user_id_range("10000").is_err());
        assert!(parse_user_id_range("10-1").is_err());
        assert!(parse_user_id_range("0-5").is_err());
        assert!(parse_user_id_range("a-b").is_err());
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_timeout("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_timeout("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_timeout("10").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_timeout("0").unwrap(), Duration::ZERO);

        assert!(parse_timeout("").is_err());
        assert!(parse_timeout("fast").is_err());
    }

    #[test]
    fn test_protocol_display() {
        assert_eq!(Protocol::Rest.to_string(), "REST");
        assert_eq!(Protocol::Grpc.to_string(), "gRPC");
        assert_eq!(Protocol::GraphQl.to_string(), "GraphQL");
    }

    #[test]
    fn test_protocol_expand_all() {
        let all = vec![Protocol::Rest, Protocol::Grpc, Protocol::GraphQl];
        assert_eq!(Protocol::expand_all(vec![Protocol::All]), all);
        assert_eq!(
            Protocol::expand_all(vec![Protocol::Grpc]),
            vec![Protocol::Grpc]
        );
        assert_eq!(
            Protocol::expand_all(vec![Protocol::Rest, Protocol::All]),
            all
        );
    }

    #[test]
    fn test_operation_expand_all() {
        assert_eq!(Operation::expand_all(vec![Operation::All]).len(), 6);
        assert_eq!(
            Operation::expand_all(vec![Operation::SearchUsers]),
            vec![Operation::SearchUsers]
        );
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_string(&Operation::GetUserOrders).unwrap(),
            "\"getUserOrders\""
        );
        assert_eq!(serde_json::to_string(&Protocol::Grpc).unwrap(), "\"gRPC\"");
    }
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a single failed API call.
///
/// Every adapter maps its transport-native failures onto this closed set so
/// the aggregation layer can break failures down uniformly, regardless of
/// which protocol produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The target rejected the call for authentication/authorization reasons
    Unauthorized,
    /// The requested entity does not exist on the target
    NotFound,
    /// The call exceeded its deadline
    Timeout,
    /// The target could not be reached or the connection broke mid-call
    Transport,
    /// Anything that does not fit the other categories
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Transport => "Transport",
            ErrorKind::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failed adapter call.
///
/// Returned by `ProtocolAdapter::execute_operation`; the benchmark runner
/// converts it into a failed `RequestResult` at the call site, so this error
/// never crosses the aggregation boundary.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct OperationError {
    pub kind: ErrorKind,
    pub message: String,
}

impl OperationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Errors raised by the harness itself, as opposed to individual calls.
///
/// `Configuration` and `Connectivity` surface before any benchmark call is
/// dispatched and prevent the run from entering the RUNNING state.
#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("target unreachable: {0}")]
    Connectivity(String),

    #[error("benchmark run is {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("worker failure: {0}")]
    Worker(String),
}

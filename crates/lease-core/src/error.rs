//! Lease and store error types.

use serde::Serialize;
use thiserror::Error;

/// Errors raised by a [`LeaseStore`](crate::LeaseStore) backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open or reach the store.
    #[error("Failed to connect to store: {0}")]
    Connection(String),

    /// A store command was rejected or failed mid-flight.
    #[error("Store command failed: {0}")]
    Command(String),

    /// A stored value could not be decoded or encoded.
    #[error("Corrupt lease value: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[cfg(feature = "redis-store")]
impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Command(err.to_string())
        }
    }
}

/// Errors surfaced by [`LeaseManager`](crate::LeaseManager) operations.
#[derive(Error, Debug)]
pub enum LeaseError {
    /// The page is held by a different session.
    #[error("Page '{page_name}' is held by another session, try again later")]
    Conflict { page_name: String },

    /// The caller tried to release a lease it does not hold.
    #[error("Session does not hold the lease on page '{page_name}'")]
    Forbidden { page_name: String },

    /// No live lease exists for the page.
    #[error("No lease found for page '{page_name}'")]
    NotFound { page_name: String },

    /// The backing store is unreachable or failing.
    #[error("Lease store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

/// Closed classification of [`LeaseError`] for callers that branch on kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Conflict,
    Forbidden,
    NotFound,
    StoreUnavailable,
}

impl ErrorKind {
    /// Whether the same call may succeed if repeated later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Conflict | ErrorKind::StoreUnavailable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Conflict => "conflict",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::StoreUnavailable => "store_unavailable",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LeaseError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LeaseError::Conflict { .. } => ErrorKind::Conflict,
            LeaseError::Forbidden { .. } => ErrorKind::Forbidden,
            LeaseError::NotFound { .. } => ErrorKind::NotFound,
            LeaseError::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
        }
    }

    pub(crate) fn conflict(page_name: &str) -> Self {
        LeaseError::Conflict {
            page_name: page_name.to_string(),
        }
    }

    pub(crate) fn forbidden(page_name: &str) -> Self {
        LeaseError::Forbidden {
            page_name: page_name.to_string(),
        }
    }

    pub fn not_found(page_name: &str) -> Self {
        LeaseError::NotFound {
            page_name: page_name.to_string(),
        }
    }
}

/// Result alias for lease operations.
pub type LeaseResult<T> = Result<T, LeaseError>;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(LeaseError::conflict("p").kind(), ErrorKind::Conflict);
        assert_eq!(LeaseError::forbidden("p").kind(), ErrorKind::Forbidden);
        assert_eq!(LeaseError::not_found("p").kind(), ErrorKind::NotFound);
        let err: LeaseError = StoreError::Connection("refused".into()).into();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ErrorKind::Conflict.is_retryable());
        assert!(ErrorKind::StoreUnavailable.is_retryable());
        assert!(!ErrorKind::Forbidden.is_retryable());
        assert!(!ErrorKind::NotFound.is_retryable());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::StoreUnavailable).unwrap();
        assert_eq!(json, r#""store_unavailable""#);
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
    }

    #[test]
    fn test_corrupt_value_converts() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: StoreError = parse_err.into();
        assert!(matches!(err, StoreError::Corrupt(_)));
        assert!(err.to_string().starts_with("Corrupt lease value"));
    }
}

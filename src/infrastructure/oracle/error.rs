//! Transient/hard classification of transport and API failures.

use reqwest::StatusCode;

use crate::domain::ports::OracleError;

/// Substrings in transport error chains that identify retryable failures.
const TRANSIENT_SIGNATURES: &[&str] = &[
    "connection reset",
    "premature close",
    "incomplete message",
    "timed out",
    "timeout",
    "connection closed",
    "broken pipe",
];

/// Classifies a transport-level failure. Timeouts and connect failures are
/// retryable; anything else (TLS setup, request building) is hard.
pub fn classify_transport(err: &reqwest::Error) -> OracleError {
    let text = format!("{err:#}").to_lowercase();
    if err.is_timeout()
        || err.is_connect()
        || TRANSIENT_SIGNATURES.iter().any(|sig| text.contains(sig))
    {
        OracleError::Transient(err.to_string())
    } else {
        OracleError::Hard(err.to_string())
    }
}

/// Classifies a non-success HTTP status. Throttling and server errors are
/// retryable; client errors (bad key, malformed request) are hard.
pub fn classify_status(status: StatusCode, body: &str) -> OracleError {
    let detail = format!("API returned {status}: {body}");
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        OracleError::Transient(detail)
    } else {
        OracleError::Hard(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            OracleError::Transient(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, ""),
            OracleError::Transient(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, "bad key"),
            OracleError::Hard(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, "missing model"),
            OracleError::Hard(_)
        ));
    }
}

//! Classification of remote-store failures.
//!
//! **Transient (retry with backoff):**
//! - timeouts and connection resets
//! - 5xx responses, 429 Too Many Requests, 408 Request Timeout
//! - local I/O hiccups
//!
//! **Permanent (dead-letter):**
//! - authorization failures
//! - not-found and other 4xx responses
//! - malformed requests
//!
//! Anything unrecognised is treated as transient; the bounded attempt count in
//! the retry path escalates it to the DLQ eventually.

use serde::{Deserialize, Serialize};

use crate::object_store::StoreError;

/// How a failed remote operation should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Retry with exponential backoff.
    Transient,
    /// Move to the dead-letter queue without retrying.
    Permanent,
}

/// Classify a typed store failure.
pub fn classify(error: &StoreError) -> ErrorClass {
    match error {
        StoreError::Timeout(_) | StoreError::ConnectionReset(_) | StoreError::Io(_) => {
            ErrorClass::Transient
        }
        StoreError::Http { status, .. } => classify_status(*status),
        StoreError::Unauthorized(_) | StoreError::NotFound(_) | StoreError::InvalidRequest(_) => {
            ErrorClass::Permanent
        }
        StoreError::Other(message) => classify_message(message),
    }
}

/// Classify an HTTP status code.
pub fn classify_status(status: u16) -> ErrorClass {
    match status {
        408 | 429 => ErrorClass::Transient,
        400..=499 => ErrorClass::Permanent,
        _ => ErrorClass::Transient,
    }
}

/// Classify a free-form error message from a client that did not return a typed error.
///
/// A standalone three-digit status code decides; otherwise known phrases do.
pub fn classify_message(message: &str) -> ErrorClass {
    if let Some(status) = status_code(message) {
        return classify_status(status);
    }

    let message = message.to_ascii_lowercase();

    const TRANSIENT_MARKERS: &[&str] = &[
        "timeout",
        "timed out",
        "connection reset",
        "connection refused",
        "broken pipe",
        "slow down",
        "throttl",
        "too many requests",
        "service unavailable",
        "internal error",
    ];
    const PERMANENT_MARKERS: &[&str] = &[
        "access denied",
        "forbidden",
        "unauthorized",
        "not found",
        "no such bucket",
        "no such key",
        "invalid",
        "malformed",
    ];

    if TRANSIENT_MARKERS.iter().any(|m| message.contains(m)) {
        return ErrorClass::Transient;
    }
    if PERMANENT_MARKERS.iter().any(|m| message.contains(m)) {
        return ErrorClass::Permanent;
    }

    ErrorClass::Transient
}

/// First token of exactly three digits in the HTTP status range.
fn status_code(message: &str) -> Option<u16> {
    message
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| token.len() == 3 && token.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|token| token.parse::<u16>().ok())
        .find(|status| (100..=599).contains(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_failures_are_transient() {
        assert_eq!(
            classify(&StoreError::Timeout("read".into())),
            ErrorClass::Transient
        );
        assert_eq!(
            classify(&StoreError::ConnectionReset("peer".into())),
            ErrorClass::Transient
        );
    }

    #[test]
    fn status_codes() {
        for status in [500, 502, 503, 504, 429, 408] {
            assert_eq!(
                classify(&StoreError::http(status, "x")),
                ErrorClass::Transient,
                "status {status}"
            );
        }
        for status in [400, 401, 403, 404, 409, 413] {
            assert_eq!(
                classify(&StoreError::http(status, "x")),
                ErrorClass::Permanent,
                "status {status}"
            );
        }
    }

    #[test]
    fn auth_and_validation_failures_are_permanent() {
        assert_eq!(
            classify(&StoreError::Unauthorized("bad key".into())),
            ErrorClass::Permanent
        );
        assert_eq!(
            classify(&StoreError::NotFound("bucket".into())),
            ErrorClass::Permanent
        );
        assert_eq!(
            classify(&StoreError::InvalidRequest("empty key".into())),
            ErrorClass::Permanent
        );
    }

    #[test]
    fn untyped_messages_use_heuristics() {
        assert_eq!(
            classify(&StoreError::Other("503 Slow Down".into())),
            ErrorClass::Transient
        );
        assert_eq!(
            classify(&StoreError::Other("AccessDenied: Access Denied".into())),
            ErrorClass::Permanent
        );
    }

    #[test]
    fn status_codes_inside_longer_numbers_are_ignored() {
        assert_eq!(
            classify_message("403 Forbidden: object exceeds 5000 bytes"),
            ErrorClass::Permanent
        );
        assert_eq!(
            classify_message("Not Found: key segments/15003.bin"),
            ErrorClass::Permanent
        );
        assert_eq!(
            classify_message("upstream returned 502 after 4290ms"),
            ErrorClass::Transient
        );
        assert_eq!(classify_message("HTTP/1.1 404"), ErrorClass::Permanent);
    }

    #[test]
    fn unknown_errors_default_to_transient() {
        assert_eq!(
            classify(&StoreError::Other("something odd happened".into())),
            ErrorClass::Transient
        );
        assert_eq!(classify_message(""), ErrorClass::Transient);
    }
}
